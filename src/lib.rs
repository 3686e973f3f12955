//! Fine-grained reactive cells and memoized formulas on a logical timeline.
//!
//! Every [`Cell`] carries the [`Timestamp`] of its last update. A [`Formula`]
//! records which cells (and nested formulas) it read while it was evaluated
//! and recomputes only when one of them was stamped after its last run.
//! [`subscribe`] bridges this pull model to push-style consumers: it watches
//! exactly the leaves the target currently depends on and tells the consumer
//! when a [`Subscription::poll`] is worth doing.
//!
//! ```
//! use timeline::{Cell, Formula, Timeline};
//!
//! let timeline = Timeline::new();
//! let cell = Cell::new(&timeline, 1);
//! let doubled = Formula::new(&timeline, {
//!     let cell = cell.clone();
//!     move || cell.read() * 2
//! });
//!
//! assert_eq!(doubled.read(), 2);
//! cell.set(5).unwrap();
//! assert_eq!(doubled.read(), 10);
//! ```

pub mod macros;

mod cell;
mod composite;
mod r#const;
mod error;
mod evaluation;
mod formula;
mod leaf;
mod lifetime;
mod marker;
mod subscription;
mod timeline;
mod timestamp;
mod transaction;
mod value;

pub use cell::{Cell, Toggle};
pub use composite::{Composite, Dependency};
pub use error::{FrozenMutationError, UnbalancedFrameError};
pub use formula::Formula;
pub use leaf::{Leaf, NodeId};
pub use lifetime::{Finalizer, Lifetime, ObjectId, Owned};
pub use marker::Marker;
pub use r#const::Const;
pub use subscription::{subscribe, subscribe_with_name, Linkable, PollResult, Subscription};
pub use timeline::{Teardown, Timeline};
pub use timestamp::Timestamp;
pub use transaction::Transaction;
pub use value::{Reactive, Value};
