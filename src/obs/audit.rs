//! Security audit events.
//!
//! Audit events are distinct from tracing: they describe security-relevant lifecycle changes and
//! are delivered to a host-supplied [`AuditSink`] whether or not the `tracing` feature is on.

// self
use crate::{
	_prelude::*,
	auth::{HandlerName, SessionId, TokenId},
	error::FaultCode,
};

/// Security-relevant lifecycle change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
	/// A token was minted and recorded.
	TokenIssued {
		/// New token identifier.
		token_id: TokenId,
		/// Principal the token vouches for.
		subject: String,
		/// Issuing authority.
		issuer: String,
		/// Instant of issuance.
		at: OffsetDateTime,
	},
	/// A token moved to the cancelled state.
	TokenCancelled {
		/// Cancelled token identifier.
		token_id: TokenId,
		/// Instant of cancellation.
		at: OffsetDateTime,
	},
	/// A token was renewed into a replacement.
	TokenRenewed {
		/// Source token identifier.
		source: TokenId,
		/// Replacement token identifier.
		replacement: TokenId,
		/// Instant of renewal.
		at: OffsetDateTime,
	},
	/// Validation observed a token past its window for the first time.
	TokenExpiredObserved {
		/// Expired token identifier.
		token_id: TokenId,
		/// Instant of observation.
		at: OffsetDateTime,
	},
	/// A session was registered.
	SessionCreated {
		/// Session identifier.
		session_id: SessionId,
		/// Active sessions after the change.
		active: u64,
	},
	/// A session was torn down.
	SessionDestroyed {
		/// Session identifier.
		session_id: SessionId,
		/// Tokens cancelled by the teardown.
		tokens_cancelled: usize,
		/// Active sessions after the change.
		active: u64,
	},
	/// A handler aborted a chain run.
	HandlerChainFailed {
		/// Handler that raised the fault.
		handler: HandlerName,
		/// Fault classification.
		code: FaultCode,
		/// Human-readable reason.
		reason: String,
	},
	/// The registry failed to persist a state change.
	RegistryFailure {
		/// Token whose change was lost.
		token_id: TokenId,
		/// Backend message.
		message: String,
	},
}

/// Receiver for [`AuditEvent`]s.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Records a single event. Implementations must not block for long.
	fn record(&self, event: AuditEvent);
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;
impl AuditSink for NoopAuditSink {
	fn record(&self, _: AuditEvent) {}
}

/// Sink that keeps events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink(Mutex<Vec<AuditEvent>>);
impl MemoryAuditSink {
	/// Returns a snapshot of every event recorded so far.
	pub fn events(&self) -> Vec<AuditEvent> {
		self.0.lock().clone()
	}

	/// Drains and returns the recorded events.
	pub fn take(&self) -> Vec<AuditEvent> {
		std::mem::take(&mut *self.0.lock())
	}
}
impl AuditSink for MemoryAuditSink {
	fn record(&self, event: AuditEvent) {
		#[cfg(feature = "tracing")]
		tracing::debug!(?event, "audit event recorded");

		self.0.lock().push(event);
	}
}
