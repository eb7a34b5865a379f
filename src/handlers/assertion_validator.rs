// self
use crate::{
	_prelude::*,
	chain::{Fault, Handler, HandlerEnv, HandlerOutcome, HandlerSpec, Message},
	error::{ConfigError, FaultCode},
	sts::TokenService,
};

/// Validates the assertion carried by a message.
///
/// Validation targets the message destination when present. Option `required` (default `false`)
/// faults messages that carry no assertion at all.
pub struct AssertionValidatorHandler {
	sts: Arc<TokenService>,
	required: bool,
}
impl AssertionValidatorHandler {
	/// Factory used by the handler registry.
	pub fn from_spec(spec: &HandlerSpec, env: &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError> {
		Ok(Arc::new(Self {
			sts: env.require_sts(&spec.name)?,
			required: spec.flag("required", false)?,
		}))
	}
}
impl Handler for AssertionValidatorHandler {
	fn handle(&self, message: &mut Message) -> Result<HandlerOutcome, Fault> {
		let Some(token) = message.token.as_ref() else {
			if self.required {
				return Err(Fault::new(FaultCode::InvalidAssertion, "message carries no assertion"));
			}

			return Ok(HandlerOutcome::Continue);
		};
		let status = match message.destination.as_deref() {
			Some(relying_party) => self.sts.validate_for(token, relying_party),
			None => self.sts.validate(token),
		};

		if !status.is_valid() {
			return Err(Fault::new(
				FaultCode::InvalidAssertion,
				format!("assertion `{}` is {status}", token.id()),
			));
		}

		Ok(HandlerOutcome::Continue)
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
		auth::{AudienceSet, HandlerName},
		chain::MessageKind,
	};

	fn handler(harness: &TestHarness, required: bool) -> Arc<dyn Handler> {
		let env = HandlerEnv::default().with_sts(harness.sts.clone());
		let spec = HandlerSpec::new(
			HandlerName::new("validate").expect("Handler name fixture should be valid."),
			"assertion-validator",
		)
		.option("required", required.to_string());

		AssertionValidatorHandler::from_spec(&spec, &env).expect("Validator handler should build.")
	}

	#[test]
	fn rejects_audience_mismatch_and_cancelled_tokens() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let audience = AudienceSet::new(["https://sp-a.example.com/"])
			.expect("Audience fixture should be valid.");
		let token = harness
			.sts
			.issue("alice", &test_issuer_info(), &test_confirmation_info(), audience)
			.expect("Issuance should succeed for the fixture.");
		let validator = handler(&harness, false);
		let mut ok = Message::new(MessageKind::Response)
			.with_destination("https://sp-a.example.com/")
			.with_token(token.clone());

		assert_eq!(validator.handle(&mut ok), Ok(HandlerOutcome::Continue));

		let mut wrong_sp = Message::new(MessageKind::Response)
			.with_destination("https://sp-b.example.com/")
			.with_token(token.clone());
		let fault = validator.handle(&mut wrong_sp).expect_err("Audience mismatch must fault.");

		assert_eq!(fault.code, FaultCode::InvalidAssertion);
		assert!(fault.reason.ends_with("audience_mismatch"));

		harness.sts.cancel(token.id()).expect("Cancel should succeed.");

		assert!(validator.handle(&mut ok).is_err());
	}

	#[test]
	fn missing_tokens_fault_only_when_required() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let mut message = Message::new(MessageKind::Response);

		assert_eq!(handler(&harness, false).handle(&mut message), Ok(HandlerOutcome::Continue));
		assert!(handler(&harness, true).handle(&mut message).is_err());
	}
}
