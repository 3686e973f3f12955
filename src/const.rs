use std::borrow::Cow;
use std::fmt::Debug;
use std::rc::Rc;

use crate::composite::Composite;
use crate::Reactive;

/// A reactive value that never changes and has no dependencies.
pub struct Const<T> {
	body: Rc<ConstBody<T>>,
}

impl<T> Clone for Const<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct ConstBody<T> {
	value: T,
}

impl<T> Const<T> {
	pub fn new(value: T) -> Self {
		Const {
			body: Rc::new(ConstBody { value }),
		}
	}

	pub fn get(&self) -> &T {
		&self.body.value
	}
}

impl<T> Reactive<T> for Const<T>
where
	T: Clone + 'static,
{
	fn current(&self) -> T {
		self.body.value.clone()
	}

	fn dependencies(&self) -> Composite {
		Composite::empty("constant")
	}

	fn description(&self) -> Cow<'_, str> {
		Cow::Borrowed("constant")
	}
}

impl<T> Debug for Const<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get().fmt(f)
	}
}
