//! Stored lifecycle states and validation results.

// self
use crate::_prelude::*;

/// Authoritative lifecycle state recorded by the token registry.
///
/// `Expired` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
	/// Minted by the token service and not yet retired.
	Issued,
	/// Observed past its `not_on_or_after` instant.
	Expired,
	/// Explicitly revoked.
	Cancelled,
}
impl TokenState {
	/// Returns true for states no transition may leave.
	pub const fn is_terminal(self) -> bool {
		matches!(self, TokenState::Expired | TokenState::Cancelled)
	}

	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenState::Issued => "issued",
			TokenState::Expired => "expired",
			TokenState::Cancelled => "cancelled",
		}
	}
}
impl Display for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Result of validating a presented token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
	/// Signature verifies, the window is open, and the token is still issued.
	Valid,
	/// The validity window has closed.
	Expired,
	/// The validity window has not opened yet.
	NotYetValid,
	/// The token was revoked.
	Cancelled,
	/// The signature does not verify against the trusted issuer.
	SignatureInvalid,
	/// The token was never issued by this service.
	Unknown,
	/// The relying party is outside the token's audience restriction.
	AudienceMismatch,
}
impl ValidationStatus {
	/// Returns true only for [`ValidationStatus::Valid`].
	pub const fn is_valid(self) -> bool {
		matches!(self, ValidationStatus::Valid)
	}

	/// Returns a stable label suitable for logs and faults.
	pub const fn as_str(self) -> &'static str {
		match self {
			ValidationStatus::Valid => "valid",
			ValidationStatus::Expired => "expired",
			ValidationStatus::NotYetValid => "not_yet_valid",
			ValidationStatus::Cancelled => "cancelled",
			ValidationStatus::SignatureInvalid => "signature_invalid",
			ValidationStatus::Unknown => "unknown",
			ValidationStatus::AudienceMismatch => "audience_mismatch",
		}
	}
}
impl Display for ValidationStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
