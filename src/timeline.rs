use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::composite::{Composite, Dependency};
use crate::evaluation::{Evaluation, FrameStack};
use crate::{Leaf, Lifetime, NodeId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListenerId(u64);

struct Listener {
	id: ListenerId,
	notify: Rc<dyn Fn()>,
}

/// The context every reactive node lives in.
///
/// A timeline owns the logical clock, the dependency-tracking frame stack, the
/// table of low-level update listeners and the ownership tree. Handles are
/// cheap to clone; independent timelines share nothing.
#[derive(Clone)]
pub struct Timeline {
	inner: Rc<TimelineInner>,
}

pub(crate) struct TimelineInner {
	now: Cell<Timestamp>,
	next_id: Cell<u64>,
	frames: FrameStack,
	listeners: RefCell<FxHashMap<NodeId, SmallVec<[Listener; 2]>>>,
	pending: RefCell<Vec<NodeId>>,
	flushing: Cell<bool>,
	lifetime: Lifetime,
}

impl Default for Timeline {
	fn default() -> Self {
		Timeline::new()
	}
}

impl Timeline {
	pub fn new() -> Self {
		Timeline {
			inner: Rc::new(TimelineInner {
				now: Cell::new(Timestamp::initial()),
				next_id: Cell::new(0),
				frames: FrameStack::default(),
				listeners: RefCell::new(FxHashMap::default()),
				pending: RefCell::new(Vec::new()),
				flushing: Cell::new(false),
				lifetime: Lifetime::new(),
			}),
		}
	}

	#[inline]
	pub fn now(&self) -> Timestamp {
		self.inner.now.get()
	}

	pub fn lifetime(&self) -> &Lifetime {
		&self.inner.lifetime
	}

	pub fn ptr_eq(&self, other: &Timeline) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	pub(crate) fn next_node_id(&self) -> NodeId {
		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);
		NodeId(id)
	}

	pub(crate) fn leaf(&self, description: Cow<'static, str>) -> Rc<Leaf> {
		Leaf::new(self.next_node_id(), description, self.now())
	}

	/// Only [`Transaction::commit`](crate::Transaction::commit) moves time.
	pub(crate) fn advance(&self) -> Timestamp {
		let next = self.now().next();
		self.inner.now.set(next);
		next
	}

	/// Runs `func` inside a fresh tracking frame and returns its result along
	/// with every leaf and composite it read.
	pub fn evaluate<T>(
		&self,
		description: impl Into<Cow<'static, str>>,
		func: impl FnOnce() -> T,
	) -> (T, Composite) {
		let evaluation = Evaluation::enter(&self.inner.frames, description.into());
		let value = func();
		(value, evaluation.finish())
	}

	/// Runs `func` without leaking any of its reads into the enclosing frame.
	pub fn untracked<T>(&self, func: impl FnOnce() -> T) -> T {
		self.evaluate("untracked", func).0
	}

	pub fn is_tracking(&self) -> bool {
		self.inner.frames.depth() > 0
	}

	pub(crate) fn consume(&self, dependency: Dependency) {
		self.inner.frames.consume(dependency);
	}

	/// Registers `notify` to run synchronously whenever `leaf` is stamped by a
	/// commit. The listener lives as long as the returned [`Teardown`].
	pub fn on_update(&self, leaf: &Leaf, notify: Rc<dyn Fn()>) -> Teardown {
		let id = ListenerId(self.next_node_id().0);
		self.inner
			.listeners
			.borrow_mut()
			.entry(leaf.id())
			.or_default()
			.push(Listener { id, notify });

		Teardown {
			timeline: Rc::downgrade(&self.inner),
			leaf: leaf.id(),
			id,
		}
	}

	pub fn listener_count(&self, leaf: NodeId) -> usize {
		self.inner
			.listeners
			.borrow()
			.get(&leaf)
			.map_or(0, |listeners| listeners.len())
	}

	pub(crate) fn enqueue(&self, leaf: NodeId) {
		self.inner.pending.borrow_mut().push(leaf);
	}

	/// Delivers queued notifications until the queue is empty.
	///
	/// Listeners may commit further transactions; those only enqueue while a
	/// flush is running and are picked up by the loop below.
	pub(crate) fn flush(&self) {
		if self.inner.flushing.replace(true) {
			return;
		}
		let _flushing = FlushGuard(&self.inner.flushing);

		loop {
			let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
			if pending.is_empty() {
				break;
			}

			for leaf in pending {
				let ids: SmallVec<[ListenerId; 4]> = match self.inner.listeners.borrow().get(&leaf) {
					Some(listeners) => listeners.iter().map(|l| l.id).collect(),
					None => continue,
				};

				for id in ids {
					// An earlier listener may have torn this one down.
					if let Some(notify) = self.inner.listener(leaf, id) {
						notify();
					}
				}
			}
		}
	}
}

impl TimelineInner {
	fn listener(&self, leaf: NodeId, id: ListenerId) -> Option<Rc<dyn Fn()>> {
		self.listeners
			.borrow()
			.get(&leaf)?
			.iter()
			.find(|l| l.id == id)
			.map(|l| l.notify.clone())
	}

	fn remove_listener(&self, leaf: NodeId, id: ListenerId) {
		let mut listeners = self.listeners.borrow_mut();
		if let Some(list) = listeners.get_mut(&leaf) {
			list.retain(|l| l.id != id);
			if list.is_empty() {
				listeners.remove(&leaf);
			}
		}
	}
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl Debug for Timeline {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Timeline")
			.field("now", &self.now())
			.field("frames", &self.inner.frames.depth())
			.field("watched", &self.inner.listeners.borrow().len())
			.finish()
	}
}

/// Owns one update listener; dropping it removes the listener.
#[must_use = "the listener is removed as soon as the teardown handle is dropped"]
pub struct Teardown {
	timeline: Weak<TimelineInner>,
	leaf: NodeId,
	id: ListenerId,
}

impl Teardown {
	pub fn leaf(&self) -> NodeId {
		self.leaf
	}
}

impl Drop for Teardown {
	fn drop(&mut self) {
		if let Some(timeline) = self.timeline.upgrade() {
			timeline.remove_listener(self.leaf, self.id);
		}
	}
}

impl Debug for Teardown {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Teardown").field("leaf", &self.leaf).finish()
	}
}
