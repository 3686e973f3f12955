use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::panic::Location;
use std::rc::{Rc, Weak};

use fxhash::FxHashSet;

use crate::lifetime::{Finalizer, ObjectId, Owned};
use crate::timeline::Teardown;
use crate::{Leaf, NodeId, Timeline, Value};

/// Outcome of [`Subscription::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
	InitialValue(T),
	UnchangedValue(T),
	ChangedValue { value: T, last: T },
}

impl<T> PollResult<T> {
	pub fn value(&self) -> &T {
		match self {
			PollResult::InitialValue(value)
			| PollResult::UnchangedValue(value)
			| PollResult::ChangedValue { value, .. } => value,
		}
	}

	pub fn into_value(self) -> T {
		match self {
			PollResult::InitialValue(value)
			| PollResult::UnchangedValue(value)
			| PollResult::ChangedValue { value, .. } => value,
		}
	}

	pub fn is_changed(&self) -> bool {
		matches!(self, PollResult::ChangedValue { .. })
	}
}

/// A push-style view of a reactive value.
///
/// The subscription keeps one low-level listener per mutable leaf the target
/// currently depends on. When any of them is updated the `ready` callback runs
/// synchronously; it does not recompute anything, it only signals that a
/// [`poll`](Subscription::poll) is worth doing. Several readiness signals can
/// therefore be coalesced into one poll.
pub struct Subscription<T> {
	body: Rc<SubscriptionBody<T>>,
}

impl<T> Clone for Subscription<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

struct SubscriptionBody<T> {
	timeline: Timeline,
	description: Cow<'static, str>,
	object: ObjectId,
	kind: Kind<T>,
}

impl<T> Drop for SubscriptionBody<T> {
	fn drop(&mut self) {
		self.timeline.lifetime().forget(self.object);
	}
}

enum Kind<T> {
	Constant(T),
	Reactive(Watch<T>),
}

struct Watch<T> {
	target: Value<T>,
	last: RefCell<Option<T>>,
	storages: RefCell<BTreeMap<NodeId, Teardown>>,
	ready: Box<dyn Fn(&Subscription<T>)>,
	unsubscribed: Cell<bool>,
	this: Weak<SubscriptionBody<T>>,
}

/// A freshly created subscription that still has to be attached to an owner.
#[must_use = "call `owned_by` or `detached` to get the subscription"]
pub struct Linkable<T> {
	value: T,
	timeline: Timeline,
}

impl<T> Linkable<T>
where
	T: Owned,
{
	/// Links the value under `owner`: finalizing the owner finalizes it too.
	pub fn owned_by(self, owner: impl Owned) -> T {
		self.timeline.lifetime().link(owner, &self.value);
		self.value
	}

	pub fn detached(self) -> T {
		self.value
	}
}

/// Subscribes `ready` to changes of `target`.
///
/// The initial poll runs before this returns, establishing the baseline
/// listener set. A target with no mutable dependencies yields a constant
/// subscription that never notifies.
#[track_caller]
pub fn subscribe<T, R, F>(timeline: &Timeline, target: R, ready: F) -> Linkable<Subscription<T>>
where
	T: Clone + PartialEq + 'static,
	R: Into<Value<T>>,
	F: Fn(&Subscription<T>) + 'static,
{
	let target = target.into();
	let description = format!(
		"subscriber (to {}) <- {}",
		target.description(),
		Location::caller()
	);
	subscribe_with_name(timeline, description, target, ready)
}

pub fn subscribe_with_name<T, R, F>(
	timeline: &Timeline,
	name: impl Into<Cow<'static, str>>,
	target: R,
	ready: F,
) -> Linkable<Subscription<T>>
where
	T: Clone + PartialEq + 'static,
	R: Into<Value<T>>,
	F: Fn(&Subscription<T>) + 'static,
{
	let target = target.into();
	let description = name.into();
	let object = timeline.lifetime().allocate();

	let dependencies = timeline.untracked(|| target.dependencies());
	let body = if dependencies.is_constant() {
		tracing::trace!(subscription = %description, "constant subscription");
		let value = timeline.untracked(|| target.current());
		Rc::new(SubscriptionBody {
			timeline: timeline.clone(),
			description,
			object,
			kind: Kind::Constant(value),
		})
	} else {
		Rc::new_cyclic(|this| SubscriptionBody {
			timeline: timeline.clone(),
			description,
			object,
			kind: Kind::Reactive(Watch {
				target,
				last: RefCell::new(None),
				storages: RefCell::new(BTreeMap::new()),
				ready: Box::new(ready),
				unsubscribed: Cell::new(false),
				this: this.clone(),
			}),
		})
	};

	let subscription = Subscription { body };

	let weak = Rc::downgrade(&subscription.body);
	timeline.lifetime().add_finalizer(
		object,
		Finalizer::new("unsubscribe", move || {
			if let Some(body) = weak.upgrade() {
				Subscription { body }.unsubscribe();
			}
		}),
	);

	let _ = subscription.poll();

	Linkable {
		value: subscription,
		timeline: timeline.clone(),
	}
}

impl<T> Subscription<T>
where
	T: Clone + PartialEq + 'static,
{
	/// Recomputes the target, re-synchronizes the listener set with its
	/// current leaves and classifies the value against the last poll.
	pub fn poll(&self) -> PollResult<T> {
		match &self.body.kind {
			Kind::Constant(value) => PollResult::UnchangedValue(value.clone()),
			Kind::Reactive(watch) => self.body.poll(watch),
		}
	}

	/// Removes every listener. No notification is delivered afterwards.
	pub fn unsubscribe(&self) {
		if let Kind::Reactive(watch) = &self.body.kind {
			if watch.unsubscribed.replace(true) {
				return;
			}

			let storages = std::mem::take(&mut *watch.storages.borrow_mut());
			tracing::trace!(
				subscription = %self.body.description,
				listeners = storages.len(),
				"unsubscribe"
			);
		}
	}
}

impl<T> Subscription<T>
where
	T: 'static,
{
	pub fn is_constant(&self) -> bool {
		matches!(self.body.kind, Kind::Constant(_))
	}

	pub fn is_unsubscribed(&self) -> bool {
		match &self.body.kind {
			Kind::Constant(_) => false,
			Kind::Reactive(watch) => watch.unsubscribed.get(),
		}
	}

	/// Leaves that currently have a listener installed.
	pub fn watched(&self) -> Vec<NodeId> {
		match &self.body.kind {
			Kind::Constant(_) => Vec::new(),
			Kind::Reactive(watch) => watch.storages.borrow().keys().copied().collect(),
		}
	}

	pub fn description(&self) -> &str {
		&self.body.description
	}
}

impl<T> SubscriptionBody<T>
where
	T: Clone + PartialEq + 'static,
{
	fn poll(&self, watch: &Watch<T>) -> PollResult<T> {
		let (value, dependencies) = self
			.timeline
			.evaluate(self.description.clone(), || watch.target.current());

		if !watch.unsubscribed.get() {
			self.synchronize(watch, dependencies.mutable_leaves());
		}

		let mut last = watch.last.borrow_mut();
		let previous = last.take();
		match previous {
			None => {
				*last = Some(value.clone());
				PollResult::InitialValue(value)
			}
			Some(previous) if previous == value => {
				*last = Some(previous);
				PollResult::UnchangedValue(value)
			}
			Some(previous) => {
				*last = Some(value.clone());
				PollResult::ChangedValue {
					value,
					last: previous,
				}
			}
		}
	}

	fn synchronize(&self, watch: &Watch<T>, leaves: Vec<Rc<Leaf>>) {
		let next: FxHashSet<NodeId> = leaves.iter().map(|leaf| leaf.id()).collect();
		let mut storages = watch.storages.borrow_mut();

		storages.retain(|id, _| {
			let keep = next.contains(id);
			if !keep {
				tracing::trace!(subscription = %self.description, leaf = %id, "tearing down listener");
			}
			keep
		});

		for leaf in leaves {
			if storages.contains_key(&leaf.id()) {
				continue;
			}

			tracing::trace!(
				subscription = %self.description,
				leaf = leaf.description(),
				"setting up listener"
			);

			let this = watch.this.clone();
			let teardown = self.timeline.on_update(
				&leaf,
				Rc::new(move || {
					if let Some(body) = this.upgrade() {
						body.notify();
					}
				}),
			);
			storages.insert(leaf.id(), teardown);
		}
	}
}

impl<T> SubscriptionBody<T>
where
	T: 'static,
{
	fn notify(self: Rc<Self>) {
		if let Kind::Reactive(watch) = &self.kind {
			if watch.unsubscribed.get() {
				return;
			}
			let subscription = Subscription { body: self.clone() };
			(watch.ready)(&subscription);
		}
	}
}

impl<T> Owned for Subscription<T> {
	fn object_id(&self) -> ObjectId {
		self.body.object
	}
}

impl<T> Debug for Subscription<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Subscription");
		debug.field("description", &self.body.description);
		match &self.body.kind {
			Kind::Constant(value) => debug.field("constant", value),
			Kind::Reactive(watch) => debug
				.field("last", &*watch.last.borrow())
				.field("watched", &watch.storages.borrow().keys().collect::<Vec<_>>())
				.field("unsubscribed", &watch.unsubscribed.get()),
		};
		debug.finish()
	}
}
