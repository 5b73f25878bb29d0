// self
use crate::{
	obs::{OperationKind, OperationOutcome},
	store::StoreOp,
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"psinder_api_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a contained storage failure via the global metrics recorder (when enabled).
pub fn record_storage_failure(op: StoreOp) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("psinder_api_storage_failure_total", "op" => op.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = op;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_operation_outcome_noop_without_metrics() {
		record_operation_outcome(OperationKind::Login, OperationOutcome::Failure);
		record_storage_failure(StoreOp::Read);
	}
}
