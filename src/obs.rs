//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `bearer_refresh.pipeline` with a `stage` field, plus a
//!   debug event for every classified failure.
//! - Enable `metrics` to increment `bearer_refresh_disposition_total` (labeled by
//!   `disposition`) and `bearer_refresh_refresh_total` (labeled by `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// A caller-issued request (first attempt or replay).
	Send,
	/// The single in-flight refresh call.
	Refresh,
	/// A waiter parked on someone else's refresh.
	Wait,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Send => "send",
			Stage::Refresh => "refresh",
			Stage::Wait => "wait",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for refresh calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// A refresh call was issued.
	Attempt,
	/// The refresh call succeeded and credentials were persisted.
	Success,
	/// The refresh call failed and the session was logged out.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
