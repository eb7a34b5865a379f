//! Time sources and the validity-window evaluator.
//!
//! Every temporal decision in the crate flows through [`Clock::now`] and [`evaluate`], so hosts
//! can swap the wall clock for a [`ManualClock`] in tests or replay tooling.

// self
use crate::_prelude::*;

/// Source of the current instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Mutex::new(start))
	}

	/// Jumps to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Moves the clock by `delta` (which may be negative).
	pub fn advance(&self, delta: Duration) {
		let mut guard = self.0.lock();

		*guard += delta;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Position of an instant relative to a validity window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Validity {
	/// Before `not_before`.
	NotYetValid,
	/// Inside `[not_before, not_on_or_after)`.
	Valid,
	/// At or after `not_on_or_after`.
	Expired,
}

/// Places `now` relative to `[not_before, not_on_or_after)`, widened by `skew` on both sides.
///
/// A negative skew is treated as zero.
pub fn evaluate(
	not_before: OffsetDateTime,
	not_on_or_after: OffsetDateTime,
	now: OffsetDateTime,
	skew: Duration,
) -> Validity {
	let skew = if skew.is_negative() { Duration::ZERO } else { skew };

	// A widened edge that leaves the representable range leaves that side of the window open.
	if not_before.checked_sub(skew).is_some_and(|opens| now < opens) {
		return Validity::NotYetValid;
	}
	if not_on_or_after.checked_add(skew).is_some_and(|closes| now >= closes) {
		return Validity::Expired;
	}

	Validity::Valid
}
