use std::borrow::Cow;
use std::rc::Rc;

use crate::error::FrozenMutationError;
use crate::{Cell, Leaf, Marker, Timeline, Timestamp};

struct Write {
	leaf: Rc<Leaf>,
	apply: Option<Box<dyn FnOnce()>>,
}

/// A group of writes that lands on the timeline as a single clock step.
///
/// Writes are staged and stay invisible until [`commit`](Transaction::commit):
/// reads made while a transaction is open see the state before it. Dropping a
/// transaction without committing discards every staged write.
#[must_use = "staged writes are discarded unless the transaction is committed"]
pub struct Transaction<'a> {
	timeline: &'a Timeline,
	description: Cow<'static, str>,
	writes: Vec<Write>,
	committed: bool,
}

impl Timeline {
	pub fn begin(&self, description: impl Into<Cow<'static, str>>) -> Transaction<'_> {
		let description = description.into();
		if self.is_tracking() {
			tracing::warn!(%description, "transaction started while a computation is being evaluated");
		}

		Transaction {
			timeline: self,
			description,
			writes: Vec::new(),
			committed: false,
		}
	}
}

impl<'a> Transaction<'a> {
	pub fn description(&self) -> &str {
		&self.description
	}

	pub fn is_empty(&self) -> bool {
		self.writes.is_empty()
	}

	/// Stages a new value for `cell`.
	pub fn set<T: 'static>(&mut self, cell: &Cell<T>, value: T) -> Result<(), FrozenMutationError> {
		debug_assert!(cell.timeline().ptr_eq(self.timeline), "cell belongs to another timeline");
		let body = cell.body.clone();
		self.stage(
			cell.leaf(),
			Some(Box::new(move || match body.value.try_borrow_mut() {
				Ok(mut slot) => *slot = value,
				Err(_) => panic!("{}", body.borrowed_while_writing()),
			})),
		)
	}

	/// Stages an invalidation of `marker`.
	pub fn touch(&mut self, marker: &Marker) -> Result<(), FrozenMutationError> {
		debug_assert!(marker.timeline().ptr_eq(self.timeline), "marker belongs to another timeline");
		self.stage(marker.leaf(), None)
	}

	fn stage(&mut self, leaf: &Rc<Leaf>, apply: Option<Box<dyn FnOnce()>>) -> Result<(), FrozenMutationError> {
		if leaf.is_frozen() {
			return Err(FrozenMutationError {
				description: leaf.description().to_owned(),
			});
		}

		// One entry per leaf: the last staged value wins and the leaf is
		// stamped and notified once.
		match self.writes.iter_mut().find(|write| write.leaf.id() == leaf.id()) {
			Some(write) => {
				if apply.is_some() {
					write.apply = apply;
				}
			}
			None => self.writes.push(Write {
				leaf: leaf.clone(),
				apply,
			}),
		}
		Ok(())
	}

	/// Advances the clock by one step, applies the staged writes, stamps every
	/// written leaf with the new time and notifies their listeners.
	pub fn commit(mut self) -> Timestamp {
		self.committed = true;
		let now = self.timeline.advance();

		for write in std::mem::take(&mut self.writes) {
			if write.leaf.is_frozen() {
				tracing::warn!(
					transaction = %self.description,
					leaf = write.leaf.description(),
					"skipping write to a leaf frozen after it was staged"
				);
				continue;
			}

			if let Some(apply) = write.apply {
				apply();
			}
			write.leaf.stamp(now);
			self.timeline.enqueue(write.leaf.id());
		}

		tracing::trace!(transaction = %self.description, %now, "commit");
		self.timeline.flush();
		now
	}
}

impl Drop for Transaction<'_> {
	fn drop(&mut self) {
		if !self.committed && !self.writes.is_empty() {
			tracing::warn!(
				transaction = %self.description,
				writes = self.writes.len(),
				"transaction dropped without commit; discarding writes"
			);
		}
	}
}
