use thiserror::Error;

/// Returned when a frozen cell or marker is asked to change.
///
/// Freezing is permanent, so retrying the same update can never succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot update `{description}`: it has been frozen")]
pub struct FrozenMutationError {
	pub description: String,
}

/// The dependency-tracking frame stack got out of balance.
///
/// This only happens when the crate itself has a bug, so it is raised as a
/// panic rather than returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnbalancedFrameError {
	#[error("tried to pop frame #{expected} but the frame stack is empty")]
	Empty { expected: u64 },
	#[error("tried to pop frame #{expected} but frame #{found} is on top of the stack")]
	Mismatch { expected: u64, found: u64 },
}
