// self
use crate::{_prelude::*, obs::Stage, refresh::Disposition, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type Instrumented<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type Instrumented<F> = F;

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct PipelineSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl PipelineSpan {
	/// Creates a new span tagged with the stage and request path.
	pub fn new(stage: Stage, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_refresh.pipeline", stage = stage.as_str(), path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, path);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event describing how a failure was classified.
pub fn trace_disposition(disposition: Disposition, path: &str, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(disposition = disposition.as_str(), path, status, "classified failure");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (disposition, path, status);
	}
}

/// Emits a warning when the session is forced to the logged-out view.
pub fn trace_forced_logout(reason: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(reason, "forcing logged-out view");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}

/// Emits a warning when stored credentials could not be removed during logout.
pub fn trace_store_failure(error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "failed to clear stored credentials");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
