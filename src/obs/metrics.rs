// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
///
/// Every outcome increments `federation_sts_op_total`; failures also increment
/// `federation_sts_op_failure_total`.
pub fn record_op_outcome(kind: OpKind, stage: &'static str, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"federation_sts_op_total",
			"op" => kind.as_str(),
			"stage" => stage,
			"outcome" => outcome.as_str()
		)
		.increment(1);

		if outcome == OpOutcome::Failure {
			metrics::counter!(
				"federation_sts_op_failure_total",
				"op" => kind.as_str(),
				"stage" => stage
			)
			.increment(1);
		}
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, stage, outcome);
	}
}
