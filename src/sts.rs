//! Token service: issues, validates, renews, and cancels signed assertions.
//!
//! [`TokenService`] owns the authoritative [`TokenRegistry`] and delegates every cryptographic
//! decision to the injected [`Signer`]/[`Verifier`]. Validation outcomes are values
//! ([`ValidationStatus`]) so handlers can turn them into protocol responses; only deployment
//! mistakes and illegal lifecycle transitions surface as [`Error`]s.
//!
//! Renewal retires the source token and records its replacement through
//! [`TokenRegistry::rotate`], a single critical section, so concurrent validators never observe
//! both tokens (or neither) as valid.

mod metrics;

pub use metrics::ServiceMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AudienceSet, Token, TokenId, TokenState, UnsignedToken, ValidationStatus},
	clock::{self, Clock, SystemClock, Validity},
	crypto::{SignatureError, Signer, Verifier},
	error::{IssuanceError, RenewalError},
	holder::{ConfirmationInfo, IssuerInfo},
	obs::{AuditEvent, AuditSink, NoopAuditSink, OpKind, OpOutcome, OpSpan, OpSpanGuard},
	store::{CancelOutcome, RegistryLookup, RotateOutcome, StoreError, TokenEntry, TokenRegistry},
};

/// Token service tunables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
	/// Tolerance applied to both edges of every validity window. Defaults to zero.
	#[serde(default)]
	pub clock_skew: Duration,
	/// When true, cancelling an unknown identifier records a tombstone so the identifier
	/// validates as [`ValidationStatus::Cancelled`] if it ever reappears. Defaults to false.
	#[serde(default)]
	pub remember_unknown_cancellations: bool,
}

/// Security token service.
#[derive(Clone)]
pub struct TokenService {
	registry: Arc<dyn TokenRegistry>,
	signer: Arc<dyn Signer>,
	verifier: Arc<dyn Verifier>,
	clock: Arc<dyn Clock>,
	audit: Arc<dyn AuditSink>,
	config: ServiceConfig,
	metrics: Arc<ServiceMetrics>,
}
impl TokenService {
	/// Creates a service over the provided registry and signing collaborators.
	///
	/// The service starts with the wall clock, a no-op audit sink, and [`ServiceConfig::default`].
	pub fn new(
		registry: Arc<dyn TokenRegistry>,
		signer: Arc<dyn Signer>,
		verifier: Arc<dyn Verifier>,
	) -> Self {
		Self {
			registry,
			signer,
			verifier,
			clock: Arc::new(SystemClock),
			audit: Arc::new(NoopAuditSink),
			config: ServiceConfig::default(),
			metrics: Default::default(),
		}
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the audit sink.
	pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = audit;

		self
	}

	/// Replaces the tunables.
	pub fn with_config(mut self, config: ServiceConfig) -> Self {
		self.config = config;

		self
	}

	/// Active tunables.
	pub fn config(&self) -> &ServiceConfig {
		&self.config
	}

	/// Shared operation counters.
	pub fn metrics(&self) -> &ServiceMetrics {
		&self.metrics
	}

	/// Current instant according to the injected clock.
	pub fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}

	pub(crate) fn audit(&self) -> &Arc<dyn AuditSink> {
		&self.audit
	}

	/// Mints, signs, and records a new token for `subject`.
	///
	/// The window opens now and closes after `issuer.validity`. Fails with
	/// [`IssuanceError`] before anything is stored when the parameters are incomplete.
	pub fn issue(
		&self,
		subject: &str,
		issuer: &IssuerInfo,
		confirmation: &ConfirmationInfo,
		audience: AudienceSet,
	) -> Result<Token> {
		let span = OpSpan::new(OpKind::Issue, "issue").entered();
		let result = (|| -> Result<Token> {
			if subject.trim().is_empty() {
				return Err(IssuanceError::MissingSubject.into());
			}

			Self::check_issuer(issuer)?;

			let now = self.clock.now();
			let unsigned = Token::builder(issuer.issuer.as_str(), subject)
				.confirmation_method(confirmation.method)
				.name_id_format(confirmation.name_id_format)
				.not_before(now)
				.valid_for(issuer.validity)
				.audience(audience)
				.build()
				.map_err(IssuanceError::from)?;
			let token = self.sign(unsigned)?;

			self.registry.insert(TokenEntry::issued(token.clone()))?;
			self.metrics.record_issued();
			self.audit.record(AuditEvent::TokenIssued {
				token_id: token.id().clone(),
				subject: token.subject().to_owned(),
				issuer: token.issuer().to_owned(),
				at: now,
			});

			Ok(token)
		})();

		self.observe(&span, result)
	}

	/// Validates a presented token against the registry.
	///
	/// Checks run in a fixed order: registry lookup, signature, validity window (with the
	/// configured skew), then stored state. The first failing check decides the result.
	pub fn validate(&self, token: &Token) -> ValidationStatus {
		let span = OpSpan::new(OpKind::Validate, "validate").entered();

		self.evaluate(&span, token.id(), Some(token))
	}

	/// Validates a token by identifier, verifying the stored copy's signature.
	pub fn validate_id(&self, id: &TokenId) -> ValidationStatus {
		let span = OpSpan::new(OpKind::Validate, "validate_id").entered();

		self.evaluate(&span, id, None)
	}

	/// Validates a presented token for a specific relying party.
	///
	/// Returns [`ValidationStatus::AudienceMismatch`] when the token is otherwise valid but its
	/// non-empty audience does not list `relying_party`.
	pub fn validate_for(&self, token: &Token, relying_party: &str) -> ValidationStatus {
		let span = OpSpan::new(OpKind::Validate, "validate_for").entered();
		let status = self.evaluate(&span, token.id(), Some(token));

		if status.is_valid() && !token.audience().permits(relying_party) {
			return ValidationStatus::AudienceMismatch;
		}

		status
	}

	/// Converts a non-valid status into an error for callers that prefer `?`.
	pub fn require_valid(&self, token: &Token) -> Result<()> {
		match self.validate(token) {
			ValidationStatus::Valid => Ok(()),
			ValidationStatus::Expired => Err(Error::AssertionExpired {
				token_id: token.id().clone(),
				not_on_or_after: token.not_on_or_after(),
			}),
			status => Err(Error::InvalidToken { token_id: token.id().clone(), status }),
		}
	}

	/// Issues a replacement for `id` and cancels the original in one registry transition.
	///
	/// The replacement keeps the subject, confirmation, and audience of the source and receives a
	/// new identifier and a window of `issuer.validity` starting now.
	pub fn renew(&self, id: &TokenId, issuer: &IssuerInfo) -> Result<Token> {
		let span = OpSpan::new(OpKind::Renew, "renew").entered();
		let result = (|| -> Result<Token> {
			Self::check_issuer(issuer)?;

			let source = match self.registry.lookup(id) {
				RegistryLookup::Found(entry) => entry,
				RegistryLookup::Tombstone(_) =>
					return Err(RenewalError::Cancelled { token_id: id.clone() }.into()),
				RegistryLookup::Missing =>
					return Err(RenewalError::Unknown { token_id: id.clone() }.into()),
			};

			Self::ensure_renewable(id, source.state)?;

			let now = self.clock.now();
			let unsigned = Token::builder(issuer.issuer.as_str(), source.token.subject())
				.confirmation_method(source.token.confirmation_method())
				.name_id_format(source.token.name_id_format())
				.not_before(now)
				.valid_for(issuer.validity)
				.audience(source.token.audience().clone())
				.build()
				.map_err(IssuanceError::from)?;
			let replacement = self.sign(unsigned)?;
			let outcome = self
				.registry
				.rotate(id, TokenEntry::issued(replacement.clone()), now, self.config.clock_skew)
				.inspect_err(|e| self.report_registry_failure(id, e))?;

			match outcome {
				RotateOutcome::Rotated => {
					self.metrics.record_issued();
					self.metrics.record_renewed();
					self.audit.record(AuditEvent::TokenIssued {
						token_id: replacement.id().clone(),
						subject: replacement.subject().to_owned(),
						issuer: replacement.issuer().to_owned(),
						at: now,
					});
					self.audit.record(AuditEvent::TokenRenewed {
						source: id.clone(),
						replacement: replacement.id().clone(),
						at: now,
					});

					Ok(replacement)
				},
				RotateOutcome::NotRenewable(state) => {
					Self::ensure_renewable(id, state)?;

					Err(RenewalError::Unknown { token_id: id.clone() }.into())
				},
				RotateOutcome::Expired => {
					self.audit
						.record(AuditEvent::TokenExpiredObserved { token_id: id.clone(), at: now });

					Err(RenewalError::Expired { token_id: id.clone() }.into())
				},
				RotateOutcome::Missing => Err(RenewalError::Unknown { token_id: id.clone() }.into()),
			}
		})();

		self.observe(&span, result)
	}

	/// Moves `id` to the cancelled state.
	///
	/// Idempotent: cancelling a cancelled, expired, or unknown identifier succeeds without changing
	/// anything, except that unknown identifiers are tombstoned when
	/// [`ServiceConfig::remember_unknown_cancellations`] is set.
	pub fn cancel(&self, id: &TokenId) -> Result<()> {
		let span = OpSpan::new(OpKind::Cancel, "cancel").entered();
		let result = (|| -> Result<()> {
			let now = self.clock.now();
			let outcome =
				self.registry.cancel(id, now).inspect_err(|e| self.report_registry_failure(id, e))?;

			match outcome {
				CancelOutcome::Cancelled => {
					self.metrics.record_cancelled();
					self.audit.record(AuditEvent::TokenCancelled { token_id: id.clone(), at: now });
				},
				CancelOutcome::AlreadyTerminal(_) => {},
				CancelOutcome::Missing if self.config.remember_unknown_cancellations => self
					.registry
					.remember_cancelled(id, now)
					.inspect_err(|e| self.report_registry_failure(id, e))?,
				CancelOutcome::Missing => {},
			}

			Ok(())
		})();

		self.observe(&span, result)
	}

	/// Stored lifecycle state of `id`, if the registry knows it.
	///
	/// Tombstoned identifiers report [`TokenState::Cancelled`].
	pub fn state_of(&self, id: &TokenId) -> Option<TokenState> {
		match self.registry.lookup(id) {
			RegistryLookup::Found(entry) => Some(entry.state),
			RegistryLookup::Tombstone(_) => Some(TokenState::Cancelled),
			RegistryLookup::Missing => None,
		}
	}

	fn evaluate(
		&self,
		span: &OpSpanGuard,
		id: &TokenId,
		presented: Option<&Token>,
	) -> ValidationStatus {
		self.metrics.record_validated();

		let entry = match self.registry.lookup(id) {
			RegistryLookup::Found(entry) => entry,
			RegistryLookup::Tombstone(_) =>
				return self.settle(span, ValidationStatus::Cancelled),
			RegistryLookup::Missing => return self.settle(span, ValidationStatus::Unknown),
		};
		let candidate = presented.unwrap_or(&entry.token);

		if !self.signature_holds(candidate, entry.token.issuer()) {
			return self.settle(span, ValidationStatus::SignatureInvalid);
		}

		let now = self.clock.now();
		let status = match clock::evaluate(
			entry.token.not_before(),
			entry.token.not_on_or_after(),
			now,
			self.config.clock_skew,
		) {
			Validity::NotYetValid => ValidationStatus::NotYetValid,
			Validity::Expired => {
				self.observe_expiry(id, entry.state, now);

				ValidationStatus::Expired
			},
			Validity::Valid => match entry.state {
				TokenState::Issued => ValidationStatus::Valid,
				TokenState::Cancelled => ValidationStatus::Cancelled,
				TokenState::Expired => ValidationStatus::Expired,
			},
		};

		self.settle(span, status)
	}

	fn signature_holds(&self, token: &Token, trusted_issuer: &str) -> bool {
		let verified = token.canonical_bytes().and_then(|canonical| {
			self.verifier.verify(&canonical, token.signature(), trusted_issuer)
		});

		match verified {
			Ok(holds) => holds,
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(token_id = %token.id(), error = %e, "signature verification failed");
				#[cfg(not(feature = "tracing"))]
				let _ = e;

				false
			},
		}
	}

	fn observe_expiry(&self, id: &TokenId, state: TokenState, now: OffsetDateTime) {
		if state != TokenState::Issued {
			return;
		}

		match self.registry.mark_expired(id, now) {
			Ok(true) =>
				self.audit.record(AuditEvent::TokenExpiredObserved { token_id: id.clone(), at: now }),
			Ok(false) => {},
			Err(e) => self.report_registry_failure(id, &e),
		}
	}

	fn sign(&self, unsigned: UnsignedToken) -> Result<Token> {
		let canonical = unsigned.canonical_bytes().map_err(IssuanceError::Signing)?;
		let signature = self.signer.sign(&canonical).map_err(IssuanceError::Signing)?;

		if signature.is_empty() {
			return Err(IssuanceError::Signing(SignatureError::Backend {
				message: "signer returned an empty signature".into(),
			})
			.into());
		}

		Ok(unsigned.sign(signature))
	}

	fn check_issuer(issuer: &IssuerInfo) -> Result<()> {
		if issuer.issuer.trim().is_empty() {
			return Err(IssuanceError::MissingIssuer.into());
		}
		if !issuer.validity.is_positive() {
			return Err(IssuanceError::NonPositiveValidity { validity: issuer.validity }.into());
		}

		Ok(())
	}

	fn ensure_renewable(id: &TokenId, state: TokenState) -> Result<()> {
		match state {
			TokenState::Issued => Ok(()),
			TokenState::Cancelled => Err(RenewalError::Cancelled { token_id: id.clone() }.into()),
			TokenState::Expired => Err(RenewalError::Expired { token_id: id.clone() }.into()),
		}
	}

	fn report_registry_failure(&self, id: &TokenId, err: &StoreError) {
		#[cfg(feature = "tracing")]
		tracing::error!(token_id = %id, error = %err, "token registry write failed");

		self.audit
			.record(AuditEvent::RegistryFailure { token_id: id.clone(), message: err.to_string() });
	}

	fn settle(&self, span: &OpSpanGuard, status: ValidationStatus) -> ValidationStatus {
		let outcome = if status.is_valid() { OpOutcome::Success } else { OpOutcome::Failure };

		span.record_outcome(outcome);

		status
	}

	fn observe<T>(&self, span: &OpSpanGuard, result: Result<T>) -> Result<T> {
		if let Err(e) = &result {
			#[cfg(feature = "tracing")]
			tracing::debug!(op = %span.kind(), error = %e, "token service operation failed");
			#[cfg(not(feature = "tracing"))]
			let _ = e;

			self.metrics.record_failure();
		}

		span.settle(result)
	}
}
impl Debug for TokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenService")
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn issue_stamps_window_and_confirmation() {
		let start = macros::datetime!(2025-01-01 00:00 UTC);
		let harness = test_harness(start);
		let token = harness
			.sts
			.issue("alice", &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
			.expect("Issuance should succeed for the fixture.");

		assert!(token.id().starts_with("ID_"));
		assert_eq!(token.not_before(), start);
		assert_eq!(token.not_on_or_after(), start + Duration::minutes(5));
		assert_eq!(token.issuer(), TEST_ISSUER);
		assert!(!token.signature().is_empty());
		assert_eq!(harness.sts.state_of(token.id()), Some(TokenState::Issued));
		assert_eq!(harness.sts.metrics().issued(), 1);
	}

	#[test]
	fn issue_fails_fast_without_subject() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let err = harness
			.sts
			.issue("  ", &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
			.expect_err("Blank subjects must be rejected.");

		assert!(matches!(err, Error::Issuance(IssuanceError::MissingSubject)));
		assert!(harness.registry.is_empty());
		assert_eq!(harness.sts.metrics().failures(), 1);
	}

	#[test]
	fn issue_rejects_blank_issuer_even_when_built_by_hand() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let mut issuer = test_issuer_info();

		issuer.issuer = String::new();

		let err = harness
			.sts
			.issue("alice", &issuer, &test_confirmation_info(), AudienceSet::default())
			.expect_err("Blank issuers must be rejected.");

		assert!(matches!(err, Error::Issuance(IssuanceError::MissingIssuer)));
		assert!(harness.registry.is_empty());
	}

	#[test]
	fn validate_id_checks_stored_copy() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let token = harness
			.sts
			.issue("alice", &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
			.expect("Issuance should succeed for the fixture.");

		assert_eq!(harness.sts.validate_id(token.id()), ValidationStatus::Valid);

		harness.clock.advance(Duration::minutes(6));

		assert_eq!(harness.sts.validate_id(token.id()), ValidationStatus::Expired);
		assert_eq!(harness.sts.state_of(token.id()), Some(TokenState::Expired));
	}

	#[test]
	fn expiry_is_audited_once() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let token = harness
			.sts
			.issue("alice", &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
			.expect("Issuance should succeed for the fixture.");

		harness.clock.advance(Duration::minutes(10));

		assert_eq!(harness.sts.validate(&token), ValidationStatus::Expired);
		assert_eq!(harness.sts.validate(&token), ValidationStatus::Expired);

		let observed = harness
			.audit
			.events()
			.into_iter()
			.filter(|e| matches!(e, AuditEvent::TokenExpiredObserved { .. }))
			.count();

		assert_eq!(observed, 1);
	}

	#[test]
	fn config_deserializes_with_defaults() {
		let config: ServiceConfig =
			serde_json::from_str("{}").expect("Empty service config should deserialize.");

		assert_eq!(config, ServiceConfig::default());
		assert_eq!(config.clock_skew, Duration::ZERO);
		assert!(!config.remember_unknown_cancellations);
	}
}
