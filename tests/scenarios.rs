use std::cell::{Cell as Counter, RefCell};
use std::rc::Rc;

use timeline::{formula, subscribe, Cell, Formula, PollResult, Subscription, Timeline};

use crate::mock;
use crate::mock::Spy;
use crate::setup;

#[test]
fn doubled_runs_once_per_change() {
	let timeline = setup();
	let cell = Cell::new(&timeline, 1);
	let mock = mock::SharedMock::new();
	let doubled = formula!(&timeline, (cell, mock) => {
		let value = cell.read() * 2;
		mock.get().evaluated(value);
		value
	});

	mock.get().expect_evaluated().times(1).return_const(());
	assert_eq!(doubled.read(), 2);
	assert_eq!(doubled.read(), 2);
	mock.get().checkpoint();

	cell.set(5).unwrap();

	mock.get().expect_evaluated().withf(|value| *value == 10).times(1).return_const(());
	assert_eq!(doubled.read(), 10);
	assert_eq!(doubled.read(), 10);
	mock.get().checkpoint();
}

struct Branches {
	x: Cell<bool>,
	y: Cell<u64>,
	z: Cell<u64>,
	w: Cell<u64>,
	result: Formula<u64>,
}

fn branches(timeline: &Timeline) -> Branches {
	let x = Cell::new_with_name(timeline, "x", true);
	let y = Cell::new_with_name(timeline, "y", 1);
	let z = Cell::new_with_name(timeline, "z", 2);
	let w = Cell::new_with_name(timeline, "w", 3);
	let result = formula!(timeline, (x, y, z) => if x.read() { y.read() } else { z.read() });
	Branches { x, y, z, w, result }
}

#[test]
fn branch_switch_changes_the_watched_leaves() {
	let timeline = setup();
	let Branches { x, y, z, w, result } = branches(&timeline);

	let ready = Rc::new(Counter::new(0));
	let subscription = subscribe(&timeline, result.clone(), {
		let ready = ready.clone();
		move |_: &Subscription<u64>| ready.set(ready.get() + 1)
	})
	.detached();
	assert_eq!(subscription.watched(), vec![x.id(), y.id()]);

	// Not part of the formula at all.
	w.set(30).unwrap();
	// Not on the branch currently taken.
	z.set(20).unwrap();
	assert_eq!(ready.get(), 0);
	assert_eq!(subscription.poll(), PollResult::UnchangedValue(1));

	x.set(false).unwrap();
	assert_eq!(ready.get(), 1);
	assert_eq!(
		subscription.poll(),
		PollResult::ChangedValue { value: 20, last: 1 }
	);
	assert_eq!(subscription.watched(), vec![x.id(), z.id()]);

	y.set(100).unwrap();
	assert_eq!(ready.get(), 1);

	z.set(21).unwrap();
	assert_eq!(ready.get(), 2);
	assert_eq!(result.read(), 21);
}

#[test]
fn formulas_skip_work_for_unread_branches() {
	let timeline = setup();
	let Branches { x, y, z, result, .. } = branches(&timeline);

	assert_eq!(result.read(), 1);
	let first = result.computed_at();

	z.set(20).unwrap();
	assert_eq!(result.read(), 1);
	assert_eq!(result.computed_at(), first);

	y.set(10).unwrap();
	assert_eq!(result.read(), 10);
	assert!(result.computed_at() > first);

	x.set(false).unwrap();
	assert_eq!(result.read(), 20);
}

#[test]
fn a_render_loop_coalesces_signals() {
	let timeline = setup();
	let first = Cell::new_with_name(&timeline, "first", "Tom".to_string());
	let last = Cell::new_with_name(&timeline, "last", "Dale".to_string());
	let full = formula!(&timeline, (first, last) => format!("{} {}", first.read(), last.read()));

	let dirty = Rc::new(Counter::new(false));
	let subscription = subscribe(&timeline, full, {
		let dirty = dirty.clone();
		move |_: &Subscription<String>| dirty.set(true)
	})
	.detached();

	let frames = Rc::new(RefCell::new(Vec::new()));
	let render = || {
		if dirty.replace(false) {
			frames.borrow_mut().push(subscription.poll().into_value());
		}
	};

	render();
	assert!(frames.borrow().is_empty());

	first.set("Thomas".to_string()).unwrap();
	last.set("Dalé".to_string()).unwrap();
	render();
	render();

	let mut tx = timeline.begin("rename");
	tx.set(&first, "Yehuda".to_string()).unwrap();
	tx.set(&last, "Katz".to_string()).unwrap();
	tx.commit();
	render();

	assert_eq!(*frames.borrow(), vec!["Thomas Dalé", "Yehuda Katz"]);
}

#[test]
fn stale_branches_stop_invalidating() {
	let timeline = setup();
	let a = Cell::new(&timeline, "x");
	let b = Cell::new(&timeline, "y");
	let flag = Cell::new(&timeline, true);
	let runs = Rc::new(Counter::new(0));
	let f = formula!(&timeline, (a, b, flag, runs) => {
		runs.set(runs.get() + 1);
		if flag.read() { a.read() } else { b.read() }
	});

	assert_eq!(f.read(), "x");

	b.set("z").unwrap();
	assert_eq!(f.read(), "x");
	assert_eq!(runs.get(), 1);

	flag.set(false).unwrap();
	assert_eq!(f.read(), "z");
	assert_eq!(runs.get(), 2);

	a.set("w").unwrap();
	assert_eq!(f.read(), "z");
	assert_eq!(runs.get(), 2);
}
