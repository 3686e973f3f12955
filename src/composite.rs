use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::rc::Rc;

use fxhash::FxHashSet;

use crate::{Leaf, NodeId, Timestamp};

/// One edge of a dependency set: either a leaf that was read directly, or the
/// whole dependency set of a nested computation.
#[derive(Clone)]
pub enum Dependency {
	Leaf(Rc<Leaf>),
	Composite(Composite),
}

impl Dependency {
	pub fn is_updated_since(&self, timestamp: Timestamp) -> bool {
		match self {
			Dependency::Leaf(leaf) => leaf.is_updated_since(timestamp),
			Dependency::Composite(composite) => composite.is_updated_since(timestamp),
		}
	}
}

impl Debug for Dependency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Dependency::Leaf(leaf) => leaf.fmt(f),
			Dependency::Composite(composite) => composite.fmt(f),
		}
	}
}

/// The dependencies observed while evaluating a computation.
///
/// Composites nest: a formula that reads another formula gets that formula's
/// composite as a single child instead of a flattened copy of its leaves, so
/// the structure mirrors the shape of the computation. Composites are shared
/// (cloning is cheap) and immutable once built.
#[derive(Clone)]
pub struct Composite {
	inner: Rc<CompositeInner>,
}

struct CompositeInner {
	description: Cow<'static, str>,
	children: Vec<Dependency>,
}

impl Composite {
	pub fn new(description: impl Into<Cow<'static, str>>, children: Vec<Dependency>) -> Self {
		Composite {
			inner: Rc::new(CompositeInner {
				description: description.into(),
				children,
			}),
		}
	}

	pub fn empty(description: impl Into<Cow<'static, str>>) -> Self {
		Composite::new(description, Vec::new())
	}

	pub fn description(&self) -> &str {
		&self.inner.description
	}

	pub fn children(&self) -> &[Dependency] {
		&self.inner.children
	}

	pub fn ptr_eq(&self, other: &Composite) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	pub(crate) fn addr(&self) -> *const () {
		Rc::as_ptr(&self.inner) as *const ()
	}

	/// True when any reachable leaf was stamped after `timestamp`.
	///
	/// Nothing is cached: the answer is recomputed from the leaves on every
	/// call.
	pub fn is_updated_since(&self, timestamp: Timestamp) -> bool {
		self.inner
			.children
			.iter()
			.any(|child| child.is_updated_since(timestamp))
	}

	/// Every reachable leaf, de-duplicated, in first-read order.
	pub fn leaves(&self) -> Vec<Rc<Leaf>> {
		let mut leaves = Vec::new();
		let mut seen_leaves = FxHashSet::<NodeId>::default();
		let mut seen_composites = FxHashSet::<*const ()>::default();
		self.collect(&mut leaves, &mut seen_leaves, &mut seen_composites);
		leaves
	}

	/// Reachable leaves that can still change.
	pub fn mutable_leaves(&self) -> Vec<Rc<Leaf>> {
		let mut leaves = self.leaves();
		leaves.retain(|leaf| !leaf.is_frozen());
		leaves
	}

	/// A composite is constant when no reachable leaf can ever change again.
	pub fn is_constant(&self) -> bool {
		self.leaves().iter().all(|leaf| leaf.is_frozen())
	}

	/// Latest stamp among the reachable leaves.
	pub fn last_updated(&self) -> Option<Timestamp> {
		self.leaves().iter().map(|leaf| leaf.last_updated()).max()
	}

	fn collect(
		&self,
		leaves: &mut Vec<Rc<Leaf>>,
		seen_leaves: &mut FxHashSet<NodeId>,
		seen_composites: &mut FxHashSet<*const ()>,
	) {
		if !seen_composites.insert(self.addr()) {
			return;
		}

		for child in &self.inner.children {
			match child {
				Dependency::Leaf(leaf) => {
					if seen_leaves.insert(leaf.id()) {
						leaves.push(leaf.clone());
					}
				}
				Dependency::Composite(composite) => {
					composite.collect(leaves, seen_leaves, seen_composites)
				}
			}
		}
	}
}

impl Debug for Composite {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Composite")
			.field("description", &self.inner.description)
			.field("children", &self.inner.children)
			.finish()
	}
}
