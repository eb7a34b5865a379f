// std
use std::cell::Cell;
// self
use crate::{
	_prelude::*,
	obs::{self, OpKind, OpOutcome},
};

/// A span builder used by token, session, and chain operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	kind: OpKind,
	stage: &'static str,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	///
	/// The `outcome` field starts empty and is filled by [`OpSpanGuard::record_outcome`].
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		let span = tracing::info_span!(
			"federation_sts.op",
			op = kind.as_str(),
			stage,
			outcome = tracing::field::Empty
		);

		Self {
			kind,
			stage,
			#[cfg(feature = "tracing")]
			span,
		}
	}

	/// Enters the span and counts an attempt for the operation.
	pub fn entered(self) -> OpSpanGuard {
		obs::record_op_outcome(self.kind, self.stage, OpOutcome::Attempt);

		OpSpanGuard {
			kind: self.kind,
			stage: self.stage,
			outcome: Cell::new(None),
			#[cfg(feature = "tracing")]
			guard: self.span.entered(),
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`]; settles the outcome of the operation it covers.
pub struct OpSpanGuard {
	kind: OpKind,
	stage: &'static str,
	outcome: Cell<Option<OpOutcome>>,
	#[cfg(feature = "tracing")]
	guard: tracing::span::EnteredSpan,
}
impl OpSpanGuard {
	/// Operation kind the guard was opened for.
	pub fn kind(&self) -> OpKind {
		self.kind
	}

	/// Stores `outcome` on the span and counts it.
	pub fn record_outcome(&self, outcome: OpOutcome) {
		#[cfg(feature = "tracing")]
		self.guard.record("outcome", outcome.as_str());

		self.outcome.set(Some(outcome));
		obs::record_op_outcome(self.kind, self.stage, outcome);
	}

	/// Records success or failure from `result` and hands it back.
	pub fn settle<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
		self.record_outcome(if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure });

		result
	}

	/// Most recent outcome recorded through this guard.
	pub fn outcome(&self) -> Option<OpOutcome> {
		self.outcome.get()
	}
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OpSpanGuard")
			.field("op", &self.kind.as_str())
			.field("stage", &self.stage)
			.field("outcome", &self.outcome.get())
			.finish()
	}
}
