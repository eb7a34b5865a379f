//! Crate-level error types shared by the token service, session registry, and handler chain.

// self
use crate::{
	_prelude::*,
	auth::{
		AudienceError, HandlerName, IdentifierError, SessionId, TokenBuilderError, TokenId,
		ValidationStatus,
	},
	holder::HolderError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
///
/// Validation outcomes are values ([`ValidationStatus`]), not errors; the variants below cover
/// deployment mistakes, illegal lifecycle transitions, and handler-signalled faults.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Signer or verifier failure.
	#[error(transparent)]
	Signature(#[from] crate::crypto::SignatureError),
	/// Issuance parameters are missing or malformed; no token was created.
	#[error(transparent)]
	Issuance(#[from] IssuanceError),
	/// The source token is not in a renewable state.
	#[error(transparent)]
	Renewal(#[from] RenewalError),
	/// A handler aborted the chain.
	#[error(transparent)]
	ProtocolFault(#[from] ProtocolFault),

	/// A consumer presented a token whose validity window has closed.
	#[error("Assertion `{token_id}` expired at {not_on_or_after}.")]
	AssertionExpired {
		/// Identifier of the expired token.
		token_id: TokenId,
		/// Instant at which the token stopped being valid.
		not_on_or_after: OffsetDateTime,
	},
	/// A consumer presented a token that did not validate for any other reason.
	#[error("Assertion `{token_id}` is not valid: {status}.")]
	InvalidToken {
		/// Identifier carried by the presented token.
		token_id: TokenId,
		/// Validation result explaining the rejection.
		status: ValidationStatus,
	},
	/// Structural mutation attempted on a locked handler chain.
	#[error("Handler chain is locked; `{operation}` is not permitted after build.")]
	ChainLocked {
		/// Mutation that was rejected.
		operation: &'static str,
	},
	/// Operation referenced a session that is not registered.
	#[error("Session `{session_id}` is not registered.")]
	UnknownSession {
		/// Offending session identifier.
		session_id: SessionId,
	},
}

/// Configuration and validation failures raised while wiring a deployment.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Handler-chain declaration could not be parsed.
	#[error("Handler chain declaration is invalid at `{path}`: {message}.")]
	Parse {
		/// JSON path of the offending value.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// Audience list failed validation.
	#[error(transparent)]
	InvalidAudience(#[from] AudienceError),
	/// Issuer or confirmation holder failed validation.
	#[error(transparent)]
	InvalidHolder(#[from] HolderError),
	/// No factory is registered for a handler kind.
	#[error("No handler factory is registered for kind `{kind}`.")]
	UnknownHandlerKind {
		/// Handler kind (type tag) from the declaration.
		kind: String,
	},
	/// No chain executor is registered under the requested name.
	#[error("No chain executor is registered under `{name}`.")]
	UnknownExecutor {
		/// Executor name from the declaration.
		name: String,
	},
	/// Two handlers in one chain share a name.
	#[error("Handler `{name}` is declared more than once.")]
	DuplicateHandler {
		/// Duplicated handler name.
		name: HandlerName,
	},
	/// A handler requires an option that was not declared.
	#[error("Handler `{handler}` requires the `{option}` option.")]
	MissingOption {
		/// Handler being built.
		handler: HandlerName,
		/// Missing option key.
		option: &'static str,
	},
	/// A handler option could not be interpreted.
	#[error("Handler `{handler}` option `{option}` has an invalid value `{value}`.")]
	InvalidOption {
		/// Handler being built.
		handler: HandlerName,
		/// Option key.
		option: &'static str,
		/// Rejected value.
		value: String,
	},
	/// A handler requires a collaborator the environment does not provide.
	#[error("Handler `{handler}` requires a {collaborator} collaborator.")]
	MissingCollaborator {
		/// Handler being built.
		handler: HandlerName,
		/// Collaborator label.
		collaborator: &'static str,
	},
	/// Handler removal or insertion targeted a position that does not exist.
	#[error("Handler `{name}` is not part of the chain.")]
	UnknownHandler {
		/// Handler name that was not found.
		name: HandlerName,
	},
}
impl ConfigError {
	/// Wraps a path-aware JSON failure.
	pub fn parse(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Parse { path: err.path().to_string(), message: err.inner().to_string() }
	}
}

/// Issuance failures; raised before any token is stored.
#[derive(Debug, ThisError)]
pub enum IssuanceError {
	/// Subject was absent or blank.
	#[error("Issuance requires a subject.")]
	MissingSubject,
	/// Issuer identity was absent or blank.
	#[error("Issuance requires an issuer identity.")]
	MissingIssuer,
	/// Validity duration would not open a window.
	#[error("Assertion validity must be positive, got {validity}.")]
	NonPositiveValidity {
		/// Offending duration.
		validity: Duration,
	},
	/// Token construction rejected the parameters.
	#[error("Unable to build assertion.")]
	Build(#[from] TokenBuilderError),
	/// Signer refused to sign the assertion.
	#[error("Unable to sign assertion.")]
	Signing(#[source] crate::crypto::SignatureError),
}

/// Renewal failures for tokens outside the renewable state.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum RenewalError {
	/// Token was cancelled earlier.
	#[error("Token `{token_id}` was cancelled and cannot be renewed.")]
	Cancelled {
		/// Source token identifier.
		token_id: TokenId,
	},
	/// Token's validity window has closed.
	#[error("Token `{token_id}` has expired and cannot be renewed.")]
	Expired {
		/// Source token identifier.
		token_id: TokenId,
	},
	/// Token was never issued by this service.
	#[error("Token `{token_id}` is unknown.")]
	Unknown {
		/// Source token identifier.
		token_id: TokenId,
	},
}

/// Classification attached to every [`ProtocolFault`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCode {
	/// Message issuer is outside the trusted domains.
	IssuerNotTrusted,
	/// Presented assertion did not validate.
	InvalidAssertion,
	/// Message lacks a session or references an unknown one.
	MissingSession,
	/// Message is structurally incomplete for the handler.
	MalformedMessage,
	/// A collaborator call failed while processing.
	Processing,
}
impl FaultCode {
	/// Returns a stable label suitable for logs and wire-level status mapping.
	pub const fn as_str(self) -> &'static str {
		match self {
			FaultCode::IssuerNotTrusted => "issuer_not_trusted",
			FaultCode::InvalidAssertion => "invalid_assertion",
			FaultCode::MissingSession => "missing_session",
			FaultCode::MalformedMessage => "malformed_message",
			FaultCode::Processing => "processing",
		}
	}
}
impl Display for FaultCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Handler-signalled failure that aborted a chain run.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Handler `{handler}` raised a protocol fault ({code}): {reason}.")]
pub struct ProtocolFault {
	/// Handler that raised the fault.
	pub handler: HandlerName,
	/// Fault classification.
	pub code: FaultCode,
	/// Human-readable reason.
	pub reason: String,
}
