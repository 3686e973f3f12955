use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::panic::Location;
use std::rc::Rc;

use crate::composite::{Composite, Dependency};
use crate::error::FrozenMutationError;
use crate::lifetime::{ObjectId, Owned};
use crate::{Formula, Leaf, NodeId, Reactive, Timeline, Timestamp};

/// A mutable reactive leaf.
///
/// Reading a cell inside a [`Formula`] (or any [`Timeline::evaluate`] call)
/// records it as a dependency. Every successful write is its own clock step
/// unless it is staged through an explicit [`Transaction`](crate::Transaction).
pub struct Cell<T> {
	pub(crate) body: Rc<CellBody<T>>,
}

pub(crate) struct CellBody<T> {
	timeline: Timeline,
	leaf: Rc<Leaf>,
	object: ObjectId,
	pub(crate) value: RefCell<T>,
}

impl<T> Drop for CellBody<T> {
	fn drop(&mut self) {
		self.timeline.lifetime().forget(self.object);
	}
}

impl<T> Clone for Cell<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub trait Toggle {
	fn toggle(&self) -> Self;
}

impl Toggle for bool {
	fn toggle(&self) -> Self {
		!*self
	}
}

impl<T> Cell<T>
where
	T: 'static,
{
	#[track_caller]
	pub fn new(timeline: &Timeline, value: T) -> Self {
		Self::new_with_name(timeline, format!("cell at {}", Location::caller()), value)
	}

	pub fn new_with_name(timeline: &Timeline, name: impl Into<Cow<'static, str>>, value: T) -> Self {
		Cell {
			body: Rc::new(CellBody {
				timeline: timeline.clone(),
				leaf: timeline.leaf(name.into()),
				object: timeline.lifetime().allocate(),
				value: RefCell::new(value),
			}),
		}
	}

	#[track_caller]
	pub fn map<F, R>(&self, func: F) -> Formula<R>
	where
		F: Fn(&T) -> R + 'static,
		R: 'static,
	{
		let this = self.clone();
		Formula::new(&self.body.timeline, move || this.with(|value| func(value)))
	}

	/// Tracked read that clones the value out.
	#[inline]
	pub fn read(&self) -> T
	where
		T: Clone,
	{
		self.with(T::clone)
	}

	/// Tracked read through a borrow.
	///
	/// The value stays borrowed while `func` runs, so `func` must not write
	/// this cell: [`set`](Cell::set) and [`update`](Cell::update) panic if it
	/// does, and so does committing a transaction that writes it.
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.body
			.timeline
			.consume(Dependency::Leaf(self.body.leaf.clone()));
		func(&*self.body.value.borrow())
	}

	pub fn read_untracked(&self) -> T
	where
		T: Clone,
	{
		self.body.value.borrow().clone()
	}

	pub fn set(&self, value: T) -> Result<Timestamp, FrozenMutationError> {
		if self.body.value.try_borrow_mut().is_err() {
			panic!("{}", self.body.borrowed_while_writing());
		}

		let mut tx = self
			.body
			.timeline
			.begin(format!("updating {}", self.description()));
		tx.set(self, value)?;
		Ok(tx.commit())
	}

	pub fn update(&self, func: impl FnOnce(&T) -> T) -> Result<Timestamp, FrozenMutationError> {
		let next = func(&*self.body.value.borrow());
		self.set(next)
	}

	#[inline]
	pub fn toggle(&self) -> Result<Timestamp, FrozenMutationError>
	where
		T: Toggle,
	{
		self.update(T::toggle)
	}

	/// Makes the cell permanently immutable. Formulas that only depend on
	/// frozen leaves become constant.
	pub fn freeze(&self) {
		self.body.leaf.freeze();
	}

	pub fn is_frozen(&self) -> bool {
		self.body.leaf.is_frozen()
	}

	pub fn last_updated(&self) -> Timestamp {
		self.body.leaf.last_updated()
	}

	pub fn description(&self) -> &str {
		self.body.leaf.description()
	}

	pub fn id(&self) -> NodeId {
		self.body.leaf.id()
	}

	pub fn timeline(&self) -> &Timeline {
		&self.body.timeline
	}

	pub(crate) fn leaf(&self) -> &Rc<Leaf> {
		&self.body.leaf
	}
}

impl<T> CellBody<T> {
	pub(crate) fn borrowed_while_writing(&self) -> String {
		format!(
			"cannot write `{}` while it is borrowed by `Cell::with`",
			self.leaf.description()
		)
	}
}

impl<T> Owned for Cell<T> {
	fn object_id(&self) -> ObjectId {
		self.body.object
	}
}

impl<T> Reactive<T> for Cell<T>
where
	T: Clone + 'static,
{
	fn current(&self) -> T {
		self.read()
	}

	fn dependencies(&self) -> Composite {
		Composite::new(
			self.description().to_owned(),
			vec![Dependency::Leaf(self.body.leaf.clone())],
		)
	}

	fn description(&self) -> Cow<'_, str> {
		Cow::Borrowed(Cell::description(self))
	}
}

impl<T> Debug for Cell<T>
where
	T: 'static + Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cell")
			.field("description", &self.description())
			.field("value", &*self.body.value.borrow())
			.field("last_updated", &self.last_updated())
			.field("frozen", &self.is_frozen())
			.finish()
	}
}
