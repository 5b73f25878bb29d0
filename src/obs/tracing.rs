// self
use crate::{
	_prelude::*,
	obs::OperationKind,
	store::{StoreError, StoreOp},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OperationKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("psinder_api.operation", operation = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
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

/// Reports a storage failure that the session contained instead of propagating.
pub fn storage_failure(op: StoreOp, key: &str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(op = op.as_str(), key, %error, "credential store operation failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, key, error);
	}

	crate::obs::record_storage_failure(op);
}

/// Emits a debug line for an outgoing request. Never includes header values.
pub fn request_sent(method: &::http::Method, path: &str, attempt: u8) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(%method, path, attempt, "api request");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, path, attempt);
	}
}

/// Emits a debug line for a received response.
pub fn response_received(method: &::http::Method, path: &str, status: u16) {
	#[cfg(feature = "tracing")]
	{
		if status >= 400 {
			tracing::debug!(%method, path, status, "api error response");
		} else {
			tracing::debug!(%method, path, status, "api response");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, path, status);
	}
}

/// Emits an info line when the session is cleared.
pub fn session_cleared(reason: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(reason, "session cleared");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}

/// Emits a warning when a refresh exchange fails and the session is about to be cleared.
pub fn refresh_failed(error: &(dyn StdError + 'static)) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%error, "token refresh failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
