use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Identity of a long-lived object in a [`Lifetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "object#{}", self.0)
	}
}

/// Implemented by everything that can take part in an ownership tree.
pub trait Owned {
	fn object_id(&self) -> ObjectId;
}

impl Owned for ObjectId {
	fn object_id(&self) -> ObjectId {
		*self
	}
}

impl<T: Owned + ?Sized> Owned for &T {
	fn object_id(&self) -> ObjectId {
		(**self).object_id()
	}
}

/// A described teardown callback.
pub struct Finalizer {
	description: Cow<'static, str>,
	callback: Box<dyn FnOnce()>,
}

impl Finalizer {
	pub fn new(description: impl Into<Cow<'static, str>>, callback: impl FnOnce() + 'static) -> Self {
		Finalizer {
			description: description.into(),
			callback: Box::new(callback),
		}
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	fn run(self) {
		tracing::trace!(finalizer = %self.description, "run finalizer");
		(self.callback)()
	}
}

impl Debug for Finalizer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Finalizer").field(&self.description).finish()
	}
}

#[derive(Default)]
struct Node {
	description: Option<Cow<'static, str>>,
	children: SmallVec<[ObjectId; 4]>,
	owners: SmallVec<[ObjectId; 2]>,
	finalizers: SmallVec<[Finalizer; 1]>,
}

/// Ownership tree of long-lived objects.
///
/// `link(owner, child)` makes `child` finalize together with `owner`. A child
/// may have several owners and the link graph may contain cycles: every object
/// is finalized at most once, the first time any path reaches it.
///
/// Nodes are only materialized for objects that were linked or given a
/// finalizer, and are dropped from the arena once finalized. The tombstone of
/// a finalized object stays until the object is [forgotten](Lifetime::forget),
/// which handles do when their last clone is dropped.
#[derive(Default)]
pub struct Lifetime {
	next_id: Cell<u64>,
	inner: RefCell<LifetimeInner>,
}

#[derive(Default)]
struct LifetimeInner {
	nodes: FxHashMap<ObjectId, Node>,
	finalized: FxHashSet<ObjectId>,
}

impl Lifetime {
	pub fn new() -> Self {
		Lifetime::default()
	}

	pub(crate) fn allocate(&self) -> ObjectId {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		ObjectId(id)
	}

	/// Mints a bare object, useful as an owner scope.
	pub fn object(&self, description: impl Into<Cow<'static, str>>) -> ObjectId {
		let id = self.allocate();
		self.inner.borrow_mut().nodes.insert(
			id,
			Node {
				description: Some(description.into()),
				..Node::default()
			},
		);
		id
	}

	pub fn link(&self, owner: impl Owned, child: impl Owned) {
		let (owner, child) = (owner.object_id(), child.object_id());

		let owner_finalized = {
			let mut inner = self.inner.borrow_mut();
			if inner.finalized.contains(&owner) {
				true
			} else if inner.finalized.contains(&child) {
				false
			} else {
				let node = inner.nodes.entry(owner).or_default();
				if !node.children.contains(&child) {
					node.children.push(child);
				}
				let node = inner.nodes.entry(child).or_default();
				if !node.owners.contains(&owner) {
					node.owners.push(owner);
				}
				false
			}
		};

		if owner_finalized {
			tracing::trace!(%owner, %child, "linked under a finalized owner");
			self.finalize(child);
		}
	}

	pub fn on_finalize(&self, object: impl Owned, callback: impl FnOnce() + 'static) {
		self.add_finalizer(object, Finalizer::new("<unnamed>", callback));
	}

	/// Registers `finalizer` on `object`. Finalizers run once, in
	/// registration order; an object that is already finalized runs the new
	/// finalizer immediately.
	pub fn add_finalizer(&self, object: impl Owned, finalizer: Finalizer) {
		let object = object.object_id();

		let finalizer = {
			let mut inner = self.inner.borrow_mut();
			if inner.finalized.contains(&object) {
				Some(finalizer)
			} else {
				inner.nodes.entry(object).or_default().finalizers.push(finalizer);
				None
			}
		};

		if let Some(finalizer) = finalizer {
			finalizer.run();
		}
	}

	/// Finalizes `object` and, depth-first, everything it owns.
	///
	/// An object's own finalizers run before its children are visited.
	/// Finalizers run with no internal borrow held, so they may link, register
	/// or finalize other objects.
	pub fn finalize(&self, object: impl Owned) {
		let mut stack = vec![object.object_id()];

		while let Some(id) = stack.pop() {
			let node = {
				let mut inner = self.inner.borrow_mut();
				if !inner.finalized.insert(id) {
					continue;
				}
				let node = inner.nodes.remove(&id);
				if let Some(node) = &node {
					inner.unlink_from_owners(id, &node.owners);
				}
				node
			};

			let Some(node) = node else {
				continue;
			};

			tracing::trace!(
				object = %id,
				description = node.description.as_deref().unwrap_or("<unnamed>"),
				children = node.children.len(),
				"finalize"
			);

			for finalizer in node.finalizers {
				finalizer.run();
			}

			stack.extend(node.children.into_iter().rev());
		}
	}

	/// Drops every trace of `object`: its node, its links and its tombstone.
	/// Pending finalizers are discarded without running.
	///
	/// Afterwards the id is unknown to the lifetime, so it must not be used
	/// again.
	pub fn forget(&self, object: impl Owned) {
		let id = object.object_id();
		let node = {
			let mut inner = self.inner.borrow_mut();
			inner.finalized.remove(&id);
			let node = inner.nodes.remove(&id);
			if let Some(node) = &node {
				inner.unlink_from_owners(id, &node.owners);
				for child in &node.children {
					if let Some(child) = inner.nodes.get_mut(child) {
						child.owners.retain(|owner| *owner != id);
					}
				}
			}
			node
		};

		// Finalizers may own handles whose drop reenters the lifetime.
		drop(node);
	}

	pub fn is_finalized(&self, object: impl Owned) -> bool {
		self.inner.borrow().finalized.contains(&object.object_id())
	}

	pub fn children(&self, object: impl Owned) -> Vec<ObjectId> {
		self.inner
			.borrow()
			.nodes
			.get(&object.object_id())
			.map_or_else(Vec::new, |node| node.children.to_vec())
	}
}

impl Lifetime {
	/// Objects that currently have a node in the arena.
	pub fn live_count(&self) -> usize {
		self.inner.borrow().nodes.len()
	}

	/// Finalized objects that have not been forgotten yet.
	pub fn finalized_count(&self) -> usize {
		self.inner.borrow().finalized.len()
	}
}

impl LifetimeInner {
	fn unlink_from_owners(&mut self, id: ObjectId, owners: &[ObjectId]) {
		for owner in owners {
			if let Some(owner) = self.nodes.get_mut(owner) {
				owner.children.retain(|child| *child != id);
			}
		}
	}
}

impl Debug for Lifetime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.borrow();
		f.debug_struct("Lifetime")
			.field("live", &inner.nodes.len())
			.field("finalized", &inner.finalized.len())
			.finish()
	}
}
