// self
use crate::{
	_prelude::*,
	chain::{Fault, Handler, HandlerEnv, HandlerOutcome, HandlerSpec, Message, MessageKind},
	error::{ConfigError, FaultCode},
	session::SessionRegistry,
};

/// Ends the message session on logout requests and stops the chain.
///
/// Every token bound to the session is cancelled. Other message kinds pass through untouched.
pub struct LogoutHandler {
	sessions: Arc<SessionRegistry>,
}
impl LogoutHandler {
	/// Factory used by the handler registry.
	pub fn from_spec(spec: &HandlerSpec, env: &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError> {
		Ok(Arc::new(Self { sessions: env.require_sessions(&spec.name)? }))
	}
}
impl Handler for LogoutHandler {
	fn handle(&self, message: &mut Message) -> Result<HandlerOutcome, Fault> {
		if message.kind != MessageKind::LogoutRequest {
			return Ok(HandlerOutcome::Continue);
		}

		let Some(session_id) = message.session_id.as_ref() else {
			return Err(Fault::new(FaultCode::MissingSession, "logout request carries no session"));
		};
		let destroyed = self
			.sessions
			.destroy_session(session_id)
			.map_err(|e| Fault::new(FaultCode::Processing, e.to_string()))?;

		message.note(if destroyed { "logout:destroyed" } else { "logout:unknown-session" });

		Ok(HandlerOutcome::Stop)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::{AudienceSet, HandlerName, SessionId, ValidationStatus},
	};

	#[test]
	fn logout_cascades_and_stops() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let session = SessionId::new("s-1").expect("Session id fixture should be valid.");
		let token = harness
			.sts
			.issue("alice", &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
			.expect("Issuance should succeed for the fixture.");

		harness.sessions.create_session(&session);
		harness
			.sessions
			.bind_token(&session, token.id().clone())
			.expect("Binding to a live session should succeed.");

		let env = HandlerEnv::default().with_sessions(harness.sessions.clone());
		let spec = HandlerSpec::new(
			HandlerName::new("bye").expect("Handler name fixture should be valid."),
			"logout",
		);
		let handler = LogoutHandler::from_spec(&spec, &env).expect("Logout handler should build.");
		let mut message = Message::new(MessageKind::LogoutRequest).with_session(session.clone());

		assert_eq!(handler.handle(&mut message), Ok(HandlerOutcome::Stop));
		assert_eq!(harness.sts.validate(&token), ValidationStatus::Cancelled);
		assert_eq!(harness.sessions.active_session_count(), 0);

		let mut response = Message::new(MessageKind::Response).with_session(session);

		assert_eq!(handler.handle(&mut response), Ok(HandlerOutcome::Continue));
	}
}
