// self
use crate::{obs::RefreshOutcome, refresh::Disposition};

/// Records a refresh outcome via the global metrics recorder (when enabled).
pub fn record_refresh_outcome(outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("bearer_refresh_refresh_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records how a failed response was classified (when enabled).
pub fn record_disposition(disposition: Disposition) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_refresh_disposition_total",
			"disposition" => disposition.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = disposition;
	}
}
