use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::panic::Location;
use std::rc::Rc;

use crate::composite::{Composite, Dependency};
use crate::lifetime::{ObjectId, Owned};
use crate::{Reactive, Timeline, Timestamp};

/// A memoized computation over cells and other formulas.
///
/// Formulas are lazy: nothing runs until the first read. Each read checks
/// whether any leaf recorded during the previous evaluation was stamped after
/// that evaluation and only then runs the computation again, re-deriving the
/// dependency set from scratch.
pub struct Formula<T> {
	body: Rc<FormulaBody<T>>,
}

impl<T> Clone for Formula<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct FormulaBody<T> {
	timeline: Timeline,
	description: Cow<'static, str>,
	object: ObjectId,
	func: Box<dyn Fn() -> T>,
	cache: RefCell<Option<Cached<T>>>,
	computing: Cell<bool>,
}

impl<T> Drop for FormulaBody<T> {
	fn drop(&mut self) {
		self.timeline.lifetime().forget(self.object);
	}
}

struct Cached<T> {
	value: Rc<T>,
	dependencies: Composite,
	computed_at: Timestamp,
}

impl<T> Formula<T>
where
	T: 'static,
{
	#[track_caller]
	pub fn new(timeline: &Timeline, func: impl Fn() -> T + 'static) -> Self {
		Self::new_with_name(timeline, format!("formula at {}", Location::caller()), func)
	}

	pub fn new_with_name(
		timeline: &Timeline,
		name: impl Into<Cow<'static, str>>,
		func: impl Fn() -> T + 'static,
	) -> Self {
		Formula {
			body: Rc::new(FormulaBody {
				timeline: timeline.clone(),
				description: name.into(),
				object: timeline.lifetime().allocate(),
				func: Box::new(func),
				cache: RefCell::new(None),
				computing: Cell::new(false),
			}),
		}
	}

	#[inline]
	pub fn read(&self) -> T
	where
		T: Clone,
	{
		self.with(T::clone)
	}

	/// Reads the (possibly recomputed) value through a borrow. The formula's
	/// dependency set is recorded into the enclosing frame as one composite.
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		let (value, dependencies) = self.body.validate();
		self.body
			.timeline
			.consume(Dependency::Composite(dependencies));
		func(&value)
	}

	/// Dependencies observed during the last evaluation, if there was one.
	pub fn dependencies(&self) -> Option<Composite> {
		self.body
			.cache
			.borrow()
			.as_ref()
			.map(|cached| cached.dependencies.clone())
	}

	pub fn computed_at(&self) -> Option<Timestamp> {
		self.body
			.cache
			.borrow()
			.as_ref()
			.map(|cached| cached.computed_at)
	}

	/// True once the formula was evaluated and none of its leaves can change.
	pub fn is_constant(&self) -> bool {
		self.dependencies().map_or(false, |deps| deps.is_constant())
	}

	pub fn description(&self) -> &str {
		&self.body.description
	}

	pub fn timeline(&self) -> &Timeline {
		&self.body.timeline
	}
}

impl<T> FormulaBody<T>
where
	T: 'static,
{
	fn validate(&self) -> (Rc<T>, Composite) {
		if let Some(cached) = &*self.cache.borrow() {
			if !cached.dependencies.is_updated_since(cached.computed_at) {
				return (cached.value.clone(), cached.dependencies.clone());
			}
		}

		self.recompute()
	}

	fn recompute(&self) -> (Rc<T>, Composite) {
		if self.computing.replace(true) {
			panic!("cycle detected: formula `{}` read itself", self.description);
		}
		let _computing = Computing(&self.computing);

		// Taken before the body runs: a write the body commits itself must
		// still invalidate the result.
		let computed_at = self.timeline.now();
		let (value, dependencies) = self
			.timeline
			.evaluate(self.description.clone(), || (self.func)());

		tracing::debug!(formula = %self.description, %computed_at, "recomputed");

		let value = Rc::new(value);
		*self.cache.borrow_mut() = Some(Cached {
			value: value.clone(),
			dependencies: dependencies.clone(),
			computed_at,
		});

		(value, dependencies)
	}
}

struct Computing<'a>(&'a Cell<bool>);

impl Drop for Computing<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl<T> Owned for Formula<T> {
	fn object_id(&self) -> ObjectId {
		self.body.object
	}
}

impl<T> Reactive<T> for Formula<T>
where
	T: Clone + 'static,
{
	fn current(&self) -> T {
		self.read()
	}

	fn dependencies(&self) -> Composite {
		self.body.validate().1
	}

	fn description(&self) -> Cow<'_, str> {
		Cow::Borrowed(&self.body.description)
	}
}

impl<T> Debug for Formula<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cache = self.body.cache.borrow();
		f.debug_struct("Formula")
			.field("description", &self.body.description)
			.field("value", &cache.as_ref().map(|cached| &cached.value))
			.field("computed_at", &cache.as_ref().map(|cached| cached.computed_at))
			.finish()
	}
}
