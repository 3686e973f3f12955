use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::panic::Location;
use std::rc::Rc;

use crate::composite::Dependency;
use crate::error::FrozenMutationError;
use crate::lifetime::{ObjectId, Owned};
use crate::{Leaf, NodeId, Timeline, Timestamp};

/// A leaf without a value.
///
/// Markers make state that lives outside the timeline reactive: read paths
/// call [`consume`](Marker::consume), write paths call
/// [`update`](Marker::update) after changing the external state.
#[derive(Clone)]
pub struct Marker {
	body: Rc<MarkerBody>,
}

struct MarkerBody {
	timeline: Timeline,
	leaf: Rc<Leaf>,
	object: ObjectId,
}

impl Drop for MarkerBody {
	fn drop(&mut self) {
		self.timeline.lifetime().forget(self.object);
	}
}

impl Marker {
	#[track_caller]
	pub fn new(timeline: &Timeline) -> Self {
		Self::new_with_name(timeline, format!("marker at {}", Location::caller()))
	}

	pub fn new_with_name(timeline: &Timeline, name: impl Into<Cow<'static, str>>) -> Self {
		Marker {
			body: Rc::new(MarkerBody {
				timeline: timeline.clone(),
				leaf: timeline.leaf(name.into()),
				object: timeline.lifetime().allocate(),
			}),
		}
	}

	pub fn consume(&self) {
		self.body.timeline.consume(Dependency::Leaf(self.body.leaf.clone()));
	}

	pub fn update(&self) -> Result<Timestamp, FrozenMutationError> {
		let mut tx = self
			.body
			.timeline
			.begin(format!("updating {}", self.body.leaf.description()));
		tx.touch(self)?;
		Ok(tx.commit())
	}

	pub fn freeze(&self) {
		self.body.leaf.freeze();
	}

	pub fn is_frozen(&self) -> bool {
		self.body.leaf.is_frozen()
	}

	pub fn last_updated(&self) -> Timestamp {
		self.body.leaf.last_updated()
	}

	pub fn id(&self) -> NodeId {
		self.body.leaf.id()
	}

	pub fn description(&self) -> &str {
		self.body.leaf.description()
	}

	pub fn timeline(&self) -> &Timeline {
		&self.body.timeline
	}

	pub(crate) fn leaf(&self) -> &Rc<Leaf> {
		&self.body.leaf
	}
}

impl Owned for Marker {
	fn object_id(&self) -> ObjectId {
		self.body.object
	}
}

impl Debug for Marker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.body.leaf.fmt(f)
	}
}
