// self
use crate::{
	_prelude::*,
	auth::{AudienceSet, ParticipantId},
	chain::{Fault, Handler, HandlerEnv, HandlerOutcome, HandlerSpec, Message},
	error::{ConfigError, FaultCode},
	holder::{ConfirmationInfo, IssuerInfo},
	session::SessionRegistry,
	sts::TokenService,
};

/// Mints an assertion for the authenticated subject and binds it to the message session.
///
/// Skips messages that already carry a token or have no subject. The audience is the `audience`
/// option when set, else the message destination. The destination is registered as a session
/// participant; option `post_binding` (default `false`) records its logout binding.
pub struct AssertionIssuerHandler {
	sts: Arc<TokenService>,
	sessions: Arc<SessionRegistry>,
	issuer: IssuerInfo,
	confirmation: ConfirmationInfo,
	audience: Option<AudienceSet>,
	post_binding: bool,
}
impl AssertionIssuerHandler {
	/// Factory used by the handler registry.
	pub fn from_spec(spec: &HandlerSpec, env: &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError> {
		let audience = spec.get("audience").map(AudienceSet::from_str).transpose()?;

		Ok(Arc::new(Self {
			sts: env.require_sts(&spec.name)?,
			sessions: env.require_sessions(&spec.name)?,
			issuer: env.require_issuer(&spec.name)?,
			confirmation: env.confirmation.unwrap_or_default(),
			audience,
			post_binding: spec.flag("post_binding", false)?,
		}))
	}

	fn audience_for(&self, message: &Message) -> Result<AudienceSet, Fault> {
		if let Some(audience) = &self.audience {
			return Ok(audience.clone());
		}

		match message.destination.as_deref() {
			Some(destination) => AudienceSet::new([destination]).map_err(|e| {
				Fault::new(FaultCode::MalformedMessage, format!("destination is unusable: {e}"))
			}),
			None => Ok(AudienceSet::unrestricted()),
		}
	}
}
impl Handler for AssertionIssuerHandler {
	fn handle(&self, message: &mut Message) -> Result<HandlerOutcome, Fault> {
		if message.token.is_some() {
			return Ok(HandlerOutcome::Continue);
		}

		let Some(subject) = message.subject.clone() else {
			return Ok(HandlerOutcome::Continue);
		};
		let Some(session_id) = message.session_id.clone() else {
			return Err(Fault::new(FaultCode::MissingSession, "message carries no session"));
		};
		let audience = self.audience_for(message)?;
		let token = self
			.sts
			.issue(&subject, &self.issuer, &self.confirmation, audience)
			.map_err(|e| Fault::new(FaultCode::Processing, e.to_string()))?;

		if let Err(e) = self.sessions.bind_token(&session_id, token.id().clone()) {
			// Unbound tokens would survive logout.
			let reason = match self.sts.cancel(token.id()) {
				Ok(()) => e.to_string(),
				Err(cancel_err) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(
						token_id = %token.id(),
						error = %cancel_err,
						"compensating cancel failed"
					);

					format!("{e} (unbound token {} is still live: {cancel_err})", token.id())
				},
			};

			return Err(Fault::new(FaultCode::MissingSession, reason));
		}

		if let Some(destination) = message.destination.as_deref() {
			let participant = ParticipantId::new(destination).map_err(|e| {
				Fault::new(FaultCode::MalformedMessage, format!("destination is unusable: {e}"))
			})?;

			self.sessions
				.register_participant(&session_id, participant, self.post_binding)
				.map_err(|e| Fault::new(FaultCode::MissingSession, e.to_string()))?;
		}

		message.token = Some(token);

		Ok(HandlerOutcome::Continue)
	}
}
