//! Immutable assertion struct, its canonical form, and the two-phase builder.

// self
use crate::{
	_prelude::*,
	auth::{AudienceSet, ConfirmationMethod, NameIdFormat, Signature, TokenId},
	crypto::SignatureError,
};

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenBuilderError {
	/// Issued when the issuer is blank.
	#[error("Issuer is required.")]
	MissingIssuer,
	/// Issued when the subject is blank.
	#[error("Subject is required.")]
	MissingSubject,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via not_on_or_after or valid_for.")]
	MissingExpiry,
	/// Issued when the window would be empty or inverted.
	#[error("not_on_or_after must be strictly after not_before.")]
	EmptyWindow,
	/// Issued when `not_before + valid_for` falls outside the representable time range.
	#[error("Validity window end is out of range.")]
	WindowOverflow,
}

/// Signed content of a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Claims {
	id: TokenId,
	issuer: String,
	subject: String,
	confirmation_method: ConfirmationMethod,
	name_id_format: NameIdFormat,
	not_before: OffsetDateTime,
	not_on_or_after: OffsetDateTime,
	audience: AudienceSet,
}
impl Claims {
	fn canonical_bytes(&self) -> Result<Vec<u8>, SignatureError> {
		let canonical = CanonicalClaims {
			id: &self.id,
			issuer: &self.issuer,
			subject: &self.subject,
			confirmation_method: self.confirmation_method.uri(),
			name_id_format: self.name_id_format.uri(),
			not_before: (self.not_before.unix_timestamp(), self.not_before.nanosecond()),
			not_on_or_after: (
				self.not_on_or_after.unix_timestamp(),
				self.not_on_or_after.nanosecond(),
			),
			audience: self.audience.as_slice(),
		};

		serde_json::to_vec(&canonical)
			.map_err(|e| SignatureError::Canonicalization { message: e.to_string() })
	}
}

// Field order is part of the signed format.
#[derive(Serialize)]
struct CanonicalClaims<'a> {
	id: &'a str,
	issuer: &'a str,
	subject: &'a str,
	confirmation_method: &'static str,
	name_id_format: &'static str,
	not_before: (i64, u32),
	not_on_or_after: (i64, u32),
	audience: &'a [String],
}

/// Issued security token (assertion).
///
/// A `Token` can only be obtained by signing an [`UnsignedToken`], so every value carries a
/// signature over its canonical bytes. Fields are read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	#[serde(flatten)]
	claims: Claims,
	signature: Signature,
}
impl Token {
	/// Returns a builder for the provided issuer and subject.
	pub fn builder(issuer: impl Into<String>, subject: impl Into<String>) -> TokenBuilder {
		TokenBuilder::new(issuer.into(), subject.into())
	}

	/// Opaque identifier assigned at issuance.
	pub fn id(&self) -> &TokenId {
		&self.claims.id
	}

	/// Issuing authority.
	pub fn issuer(&self) -> &str {
		&self.claims.issuer
	}

	/// Principal the token vouches for.
	pub fn subject(&self) -> &str {
		&self.claims.subject
	}

	/// Subject confirmation method.
	pub fn confirmation_method(&self) -> ConfirmationMethod {
		self.claims.confirmation_method
	}

	/// Name identifier format of the subject.
	pub fn name_id_format(&self) -> NameIdFormat {
		self.claims.name_id_format
	}

	/// First instant at which the token is valid.
	pub fn not_before(&self) -> OffsetDateTime {
		self.claims.not_before
	}

	/// First instant at which the token is no longer valid.
	pub fn not_on_or_after(&self) -> OffsetDateTime {
		self.claims.not_on_or_after
	}

	/// Relying parties permitted to accept the token.
	pub fn audience(&self) -> &AudienceSet {
		&self.claims.audience
	}

	/// Signature over [`Token::canonical_bytes`].
	pub fn signature(&self) -> &Signature {
		&self.signature
	}

	/// Deterministic byte form covered by the signature.
	pub fn canonical_bytes(&self) -> Result<Vec<u8>, SignatureError> {
		self.claims.canonical_bytes()
	}
}

/// Fully specified token awaiting its signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedToken(Claims);
impl UnsignedToken {
	/// Identifier the signed token will carry.
	pub fn id(&self) -> &TokenId {
		&self.0.id
	}

	/// Deterministic byte form the signer must cover.
	pub fn canonical_bytes(&self) -> Result<Vec<u8>, SignatureError> {
		self.0.canonical_bytes()
	}

	/// Attaches the signature, producing an immutable [`Token`].
	pub fn sign(self, signature: Signature) -> Token {
		Token { claims: self.0, signature }
	}
}

/// Builder for [`UnsignedToken`] values.
#[derive(Clone, Debug)]
pub struct TokenBuilder {
	id: Option<TokenId>,
	issuer: String,
	subject: String,
	confirmation_method: ConfirmationMethod,
	name_id_format: NameIdFormat,
	not_before: Option<OffsetDateTime>,
	not_on_or_after: Option<OffsetDateTime>,
	valid_for: Option<Duration>,
	audience: AudienceSet,
}
impl TokenBuilder {
	fn new(issuer: String, subject: String) -> Self {
		Self {
			id: None,
			issuer,
			subject,
			confirmation_method: ConfirmationMethod::default(),
			name_id_format: NameIdFormat::default(),
			not_before: None,
			not_on_or_after: None,
			valid_for: None,
			audience: AudienceSet::default(),
		}
	}

	/// Overrides the generated identifier.
	pub fn id(mut self, id: TokenId) -> Self {
		self.id = Some(id);

		self
	}

	/// Sets the confirmation method.
	pub fn confirmation_method(mut self, method: ConfirmationMethod) -> Self {
		self.confirmation_method = method;

		self
	}

	/// Sets the name identifier format.
	pub fn name_id_format(mut self, format: NameIdFormat) -> Self {
		self.name_id_format = format;

		self
	}

	/// Sets the window start.
	pub fn not_before(mut self, instant: OffsetDateTime) -> Self {
		self.not_before = Some(instant);

		self
	}

	/// Sets an absolute window end.
	pub fn not_on_or_after(mut self, instant: OffsetDateTime) -> Self {
		self.not_on_or_after = Some(instant);

		self
	}

	/// Sets the window end relative to the window start.
	pub fn valid_for(mut self, duration: Duration) -> Self {
		self.valid_for = Some(duration);

		self
	}

	/// Sets the audience restriction.
	pub fn audience(mut self, audience: AudienceSet) -> Self {
		self.audience = audience;

		self
	}

	/// Consumes the builder and produces an [`UnsignedToken`].
	pub fn build(self) -> Result<UnsignedToken, TokenBuilderError> {
		if self.issuer.trim().is_empty() {
			return Err(TokenBuilderError::MissingIssuer);
		}
		if self.subject.trim().is_empty() {
			return Err(TokenBuilderError::MissingSubject);
		}

		let not_before = self.not_before.unwrap_or_else(OffsetDateTime::now_utc);
		let not_on_or_after = match (self.not_on_or_after, self.valid_for) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				not_before.checked_add(delta).ok_or(TokenBuilderError::WindowOverflow)?,
			(None, None) => return Err(TokenBuilderError::MissingExpiry),
		};

		if not_on_or_after <= not_before {
			return Err(TokenBuilderError::EmptyWindow);
		}

		Ok(UnsignedToken(Claims {
			id: self.id.unwrap_or_else(TokenId::generate),
			issuer: self.issuer,
			subject: self.subject,
			confirmation_method: self.confirmation_method,
			name_id_format: self.name_id_format,
			not_before,
			not_on_or_after,
			audience: self.audience,
		}))
	}
}
