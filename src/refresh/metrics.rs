// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh coordination.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	waiters: AtomicU64,
	logouts: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh calls issued.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that produced persisted credentials.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many requests were parked behind an in-flight refresh.
	pub fn waiters(&self) -> u64 {
		self.waiters.load(Ordering::Relaxed)
	}

	/// Returns how many times the logged-out view was forced.
	pub fn logouts(&self) -> u64 {
		self.logouts.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_waiter(&self) {
		self.waiters.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_logout(&self) {
		self.logouts.fetch_add(1, Ordering::Relaxed);
	}
}
