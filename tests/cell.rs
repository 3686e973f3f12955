use timeline::{Cell, FrozenMutationError, Marker, Timestamp};

use crate::setup;

#[test]
fn read_and_set() {
	let timeline = setup();
	let cell = Cell::new(&timeline, 10);
	assert_eq!(cell.read(), 10);

	cell.set(20).unwrap();
	assert_eq!(cell.read(), 20);

	cell.update(|value| value + 1).unwrap();
	assert_eq!(cell.read(), 21);
	assert_eq!(cell.with(|value| value * 2), 42);
}

#[test]
fn every_update_is_a_new_timestamp() {
	let timeline = setup();
	let cell = Cell::new(&timeline, 0);
	assert_eq!(cell.last_updated(), Timestamp::initial());

	let mut previous = cell.last_updated();
	for value in 1..=5 {
		let stamped = cell.set(value).unwrap();
		assert!(stamped > previous);
		assert_eq!(cell.last_updated(), stamped);
		assert_eq!(timeline.now(), stamped);
		previous = stamped;
	}
}

#[test]
fn clones_share_state() {
	let timeline = setup();
	let a = Cell::new(&timeline, "a".to_string());
	let b = a.clone();

	b.set("b".to_string()).unwrap();
	assert_eq!(a.read(), "b");
	assert_eq!(a.id(), b.id());
}

#[test]
fn frozen_cells_reject_updates() {
	let timeline = setup();
	let cell = Cell::new_with_name(&timeline, "name", "Tom");
	cell.freeze();

	let before = timeline.now();
	assert_eq!(
		cell.set("Thomas"),
		Err(FrozenMutationError {
			description: "name".to_string()
		})
	);
	assert_eq!(cell.read(), "Tom");
	assert!(cell.is_frozen());
	assert_eq!(timeline.now(), before);
}

#[test]
fn toggle_flips_booleans() {
	let timeline = setup();
	let flag = Cell::new(&timeline, false);
	flag.toggle().unwrap();
	assert!(flag.read());
	flag.toggle().unwrap();
	assert!(!flag.read());
}

#[test]
fn default_description_points_at_the_caller() {
	let timeline = setup();
	let cell = Cell::new(&timeline, ());
	assert!(cell.description().starts_with("cell at "));
	assert!(cell.description().contains("cell.rs"));
}

#[test]
fn markers_advance_time() {
	let timeline = setup();
	let marker = Marker::new_with_name(&timeline, "external storage");
	let created = marker.last_updated();

	let stamped = marker.update().unwrap();
	assert!(stamped > created);
	assert_eq!(marker.last_updated(), stamped);

	marker.freeze();
	assert!(marker.update().is_err());
}

#[test]
#[should_panic(expected = "cannot write `counter` while it is borrowed by `Cell::with`")]
fn writing_inside_with_is_reported() {
	let timeline = setup();
	let cell = Cell::new_with_name(&timeline, "counter", 1);
	cell.with(|value| {
		let _ = cell.set(value + 1);
	});
}

#[test]
#[should_panic(expected = "while it is borrowed by `Cell::with`")]
fn committing_inside_with_is_reported() {
	let timeline = setup();
	let cell = Cell::new_with_name(&timeline, "counter", 1);
	cell.with(|value| {
		let mut tx = timeline.begin("nested");
		tx.set(&cell, value + 1).unwrap();
		tx.commit();
	});
}
