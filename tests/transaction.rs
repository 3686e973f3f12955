use std::cell::Cell as Counter;
use std::rc::Rc;

use timeline::{formula, subscribe, Cell, Marker, Subscription};

use crate::setup;

#[test]
fn writes_share_one_timestamp() {
	let timeline = setup();
	let a = Cell::new(&timeline, 1);
	let b = Cell::new(&timeline, 2);
	let marker = Marker::new(&timeline);
	let before = timeline.now();

	let mut tx = timeline.begin("rename");
	tx.set(&a, 10).unwrap();
	tx.set(&b, 20).unwrap();
	tx.touch(&marker).unwrap();
	assert!(!tx.is_empty());
	assert_eq!(tx.description(), "rename");
	let now = tx.commit();

	assert!(now > before);
	assert_eq!(timeline.now(), now);
	assert_eq!(a.last_updated(), now);
	assert_eq!(b.last_updated(), now);
	assert_eq!(marker.last_updated(), now);
	assert_eq!((a.read(), b.read()), (10, 20));
}

#[test]
fn staged_writes_are_invisible_until_commit() {
	let timeline = setup();
	let cell = Cell::new(&timeline, "old");
	let upper = formula!(&timeline, (cell) => cell.read().to_uppercase());
	assert_eq!(upper.read(), "OLD");

	let mut tx = timeline.begin("edit");
	tx.set(&cell, "new").unwrap();
	assert_eq!(cell.read(), "old");
	assert_eq!(upper.read(), "OLD");

	tx.commit();
	assert_eq!(cell.read(), "new");
	assert_eq!(upper.read(), "NEW");
}

#[test]
fn dropping_rolls_back() {
	let timeline = setup();
	let cell = Cell::new(&timeline, 1);
	let before = timeline.now();

	{
		let mut tx = timeline.begin("abandoned");
		tx.set(&cell, 2).unwrap();
	}

	assert_eq!(cell.read(), 1);
	assert_eq!(timeline.now(), before);
	assert_eq!(cell.last_updated(), before);
}

#[test]
fn frozen_leaves_are_rejected_when_staged() {
	let timeline = setup();
	let cell = Cell::new(&timeline, 1);
	cell.freeze();

	let mut tx = timeline.begin("late");
	assert!(tx.set(&cell, 2).is_err());
	assert!(tx.is_empty());
}

#[test]
fn freezing_after_staging_skips_the_write() {
	let timeline = setup();
	let frozen = Cell::new(&timeline, 1);
	let open = Cell::new(&timeline, 1);

	let mut tx = timeline.begin("race");
	tx.set(&frozen, 2).unwrap();
	tx.set(&open, 2).unwrap();
	frozen.freeze();
	let now = tx.commit();

	assert_eq!(frozen.read(), 1);
	assert!(frozen.last_updated() < now);
	assert_eq!(open.read(), 2);
	assert_eq!(open.last_updated(), now);
}

#[test]
fn empty_commit_still_advances_time() {
	let timeline = setup();
	let before = timeline.now();
	let now = timeline.begin("noop").commit();
	assert_eq!(now.as_u64(), before.as_u64() + 1);
}

#[test]
fn listeners_may_commit_while_flushing() {
	let timeline = setup();
	let source = Cell::new(&timeline, 1);
	let mirror = Cell::new(&timeline, 0);

	let _forward = subscribe(&timeline, source.clone(), {
		let mirror = mirror.clone();
		move |subscription: &Subscription<i32>| {
			let value = subscription.poll().into_value();
			mirror.set(value * 10).unwrap();
		}
	})
	.detached();

	let mirrored = Rc::new(Counter::new(0));
	let _count = subscribe(&timeline, mirror.clone(), {
		let mirrored = mirrored.clone();
		move |_: &Subscription<i32>| mirrored.set(mirrored.get() + 1)
	})
	.detached();

	source.set(2).unwrap();
	assert_eq!(mirror.read(), 20);
	assert_eq!(mirrored.get(), 1);
	assert!(mirror.last_updated() > source.last_updated());
}
