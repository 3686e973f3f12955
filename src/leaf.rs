use std::borrow::Cow;
use std::cell::Cell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::Timestamp;

/// Stable identity of a leaf node inside one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "node#{}", self.0)
	}
}

/// The untyped bookkeeping half of a mutable leaf.
///
/// [`Cell`](crate::Cell) and [`Marker`](crate::Marker) both wrap one of these;
/// dependency sets and listeners only ever deal with `Leaf`, so they don't
/// need to know the type of the value.
pub struct Leaf {
	id: NodeId,
	description: Cow<'static, str>,
	last_updated: Cell<Timestamp>,
	frozen: Cell<bool>,
}

impl Leaf {
	pub(crate) fn new(id: NodeId, description: Cow<'static, str>, now: Timestamp) -> Rc<Self> {
		Rc::new(Leaf {
			id,
			description,
			last_updated: Cell::new(now),
			frozen: Cell::new(false),
		})
	}

	#[inline]
	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	#[inline]
	pub fn last_updated(&self) -> Timestamp {
		self.last_updated.get()
	}

	#[inline]
	pub fn is_frozen(&self) -> bool {
		self.frozen.get()
	}

	#[inline]
	pub fn is_updated_since(&self, timestamp: Timestamp) -> bool {
		self.last_updated.get() > timestamp
	}

	pub(crate) fn freeze(&self) {
		self.frozen.set(true);
	}

	pub(crate) fn stamp(&self, timestamp: Timestamp) {
		debug_assert!(timestamp >= self.last_updated.get());
		self.last_updated.set(timestamp);
	}
}

impl Debug for Leaf {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Leaf")
			.field("id", &self.id)
			.field("description", &self.description)
			.field("last_updated", &self.last_updated.get())
			.field("frozen", &self.frozen.get())
			.finish()
	}
}
