use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::composite::Composite;
use crate::{Cell, Const, Formula};

/// Anything a consumer can read and subscribe to.
pub trait Reactive<T>: 'static {
	/// Tracked read of the current value. May recompute.
	fn current(&self) -> T;

	/// The dependency set behind the current value. Formulas are brought up
	/// to date first.
	fn dependencies(&self) -> Composite;

	fn description(&self) -> Cow<'_, str>;
}

/// A type-erased, clonable handle over any [`Reactive`].
pub struct Value<T> {
	value: Rc<dyn Reactive<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			value: self.value.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: 'static,
{
	pub fn new(value: impl Reactive<T>) -> Self {
		Value {
			value: Rc::new(value),
		}
	}

	#[inline]
	pub fn current(&self) -> T {
		self.value.current()
	}

	#[inline]
	pub fn dependencies(&self) -> Composite {
		self.value.dependencies()
	}

	pub fn description(&self) -> Cow<'_, str> {
		self.value.description()
	}
}

impl<T> Reactive<T> for Value<T>
where
	T: 'static,
{
	fn current(&self) -> T {
		self.value.current()
	}

	fn dependencies(&self) -> Composite {
		self.value.dependencies()
	}

	fn description(&self) -> Cow<'_, str> {
		self.value.description()
	}
}

impl<T> From<Cell<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(cell: Cell<T>) -> Self {
		Value::new(cell)
	}
}

impl<T> From<Formula<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(formula: Formula<T>) -> Self {
		Value::new(formula)
	}
}

impl<T> From<Const<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(constant: Const<T>) -> Self {
		Value::new(constant)
	}
}

impl<T> Debug for Value<T>
where
	T: 'static,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Value").field(&self.description()).finish()
	}
}
