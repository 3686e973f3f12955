use std::fmt;

/// A point on the logical clock of a [`Timeline`](crate::Timeline).
///
/// Every committed transaction advances the clock by exactly one step, so two
/// timestamps taken from the same timeline are always comparable and never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
	/// The value a fresh timeline starts at.
	pub const fn initial() -> Self {
		Timestamp(1)
	}

	pub(crate) fn next(self) -> Self {
		Timestamp(self.0 + 1)
	}

	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl Default for Timestamp {
	fn default() -> Self {
		Timestamp::initial()
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "@{}", self.0)
	}
}
