// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token service operations.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
	issued: AtomicU64,
	validated: AtomicU64,
	renewed: AtomicU64,
	cancelled: AtomicU64,
	failures: AtomicU64,
}
impl ServiceMetrics {
	/// Returns the number of tokens issued (renewal replacements included).
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Relaxed)
	}

	/// Returns the number of validation calls, whatever their result.
	pub fn validated(&self) -> u64 {
		self.validated.load(Ordering::Relaxed)
	}

	/// Returns the number of successful renewals.
	pub fn renewed(&self) -> u64 {
		self.renewed.load(Ordering::Relaxed)
	}

	/// Returns the number of tokens moved to the cancelled state.
	pub fn cancelled(&self) -> u64 {
		self.cancelled.load(Ordering::Relaxed)
	}

	/// Returns the number of operations that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issued(&self) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_validated(&self) {
		self.validated.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_renewed(&self) {
		self.renewed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cancelled(&self) {
		self.cancelled.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
