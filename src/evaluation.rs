use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use fxhash::FxHashSet;

use crate::composite::{Composite, Dependency};
use crate::error::UnbalancedFrameError;
use crate::NodeId;

/// Reads recorded while one computation is being evaluated.
pub(crate) struct Frame {
	id: u64,
	description: Cow<'static, str>,
	children: Vec<Dependency>,
	seen_leaves: FxHashSet<NodeId>,
	seen_composites: FxHashSet<*const ()>,
}

impl Frame {
	fn record(&mut self, dependency: Dependency) {
		let fresh = match &dependency {
			Dependency::Leaf(leaf) => self.seen_leaves.insert(leaf.id()),
			Dependency::Composite(composite) => self.seen_composites.insert(composite.addr()),
		};

		if fresh {
			self.children.push(dependency);
		}
	}

	fn into_composite(self) -> Composite {
		Composite::new(self.description, self.children)
	}
}

/// The stack of active evaluations.
///
/// The only way to push is [`Evaluation::enter`], and the only way to pop is
/// finishing or dropping that guard, so the stack stays balanced on every exit
/// path including unwinding.
#[derive(Default)]
pub(crate) struct FrameStack {
	frames: RefCell<Vec<Frame>>,
	next_id: Cell<u64>,
}

impl FrameStack {
	fn push(&self, description: Cow<'static, str>) -> u64 {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		tracing::trace!(frame = id, %description, "push frame");
		self.frames.borrow_mut().push(Frame {
			id,
			description,
			children: Vec::new(),
			seen_leaves: FxHashSet::default(),
			seen_composites: FxHashSet::default(),
		});
		id
	}

	fn pop(&self, expected: u64) -> Result<Frame, UnbalancedFrameError> {
		let mut frames = self.frames.borrow_mut();
		match frames.last() {
			None => Err(UnbalancedFrameError::Empty { expected }),
			Some(top) if top.id != expected => Err(UnbalancedFrameError::Mismatch {
				expected,
				found: top.id,
			}),
			Some(_) => {
				tracing::trace!(frame = expected, "pop frame");
				frames.pop().ok_or(UnbalancedFrameError::Empty { expected })
			}
		}
	}

	/// Records a read into the innermost frame. Reads outside of any
	/// evaluation are not tracked.
	pub(crate) fn consume(&self, dependency: Dependency) {
		if let Some(frame) = self.frames.borrow_mut().last_mut() {
			frame.record(dependency);
		}
	}

	pub(crate) fn depth(&self) -> usize {
		self.frames.borrow().len()
	}
}

/// Scoped guard for one evaluation frame.
pub(crate) struct Evaluation<'a> {
	stack: &'a FrameStack,
	id: u64,
	finished: bool,
}

impl<'a> Evaluation<'a> {
	pub(crate) fn enter(stack: &'a FrameStack, description: Cow<'static, str>) -> Self {
		let id = stack.push(description);
		Evaluation {
			stack,
			id,
			finished: false,
		}
	}

	/// Pops the frame and returns everything it recorded.
	pub(crate) fn finish(mut self) -> Composite {
		self.finished = true;
		match self.stack.pop(self.id) {
			Ok(frame) => frame.into_composite(),
			Err(err) => panic!("{err}"),
		}
	}
}

impl Drop for Evaluation<'_> {
	fn drop(&mut self) {
		if self.finished {
			return;
		}

		if let Err(err) = self.stack.pop(self.id) {
			// A second panic while unwinding aborts the process.
			if std::thread::panicking() {
				tracing::error!(%err, "frame stack corrupted while unwinding");
			} else {
				panic!("{err}");
			}
		}
	}
}
