//! Observability helpers for token, session, and chain operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `federation_sts.op` with the `op`
//!   (operation kind) and `stage` (call site) fields. The `outcome` field is filled in when the
//!   operation settles.
//! - Enable `metrics` to increment the `federation_sts_op_total` counter for every
//!   attempt/success/failure, labeled by `op`, `stage`, and `outcome`. Failures also increment
//!   `federation_sts_op_failure_total`.
//!
//! Security-relevant lifecycle events are always reported through an [`AuditSink`], independent
//! of either feature.

mod audit;
mod metrics;
mod tracing;

pub use audit::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Token issuance.
	Issue,
	/// Token validation.
	Validate,
	/// Token renewal.
	Renew,
	/// Token cancellation.
	Cancel,
	/// Session registration.
	CreateSession,
	/// Session teardown.
	DestroySession,
	/// Token-to-session binding.
	BindToken,
	/// Handler chain run.
	ChainRun,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Issue => "issue",
			OpKind::Validate => "validate",
			OpKind::Renew => "renew",
			OpKind::Cancel => "cancel",
			OpKind::CreateSession => "create_session",
			OpKind::DestroySession => "destroy_session",
			OpKind::BindToken => "bind_token",
			OpKind::ChainRun => "chain_run",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
