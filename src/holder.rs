//! Per-deployment trust parameters consumed by the token service at issuance.
//!
//! [`IssuerInfo`] names the issuing authority and how long its assertions live;
//! [`ConfirmationInfo`] names how subjects prove possession and how they are identified. Both are
//! plain immutable values; the token service computes `not_on_or_after = now + validity` itself.

// self
use crate::{
	_prelude::*,
	auth::{ConfirmationMethod, NameIdFormat},
};

/// Default assertion validity used by the reference deployment.
pub const DEFAULT_ASSERTION_VALIDITY: Duration = Duration::minutes(5);
/// SAML 2.0 top-level success status.
pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
/// Protocol version stamped on issued assertions.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2.0";

/// Errors raised while constructing holders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum HolderError {
	/// Issuer identity is blank.
	#[error("Issuer identity cannot be empty.")]
	EmptyIssuer,
	/// Validity would never open a window.
	#[error("Assertion validity must be positive.")]
	NonPositiveValidity,
}

/// Issuing authority parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerInfo {
	/// Issuer identity (usually the IDP entity URI).
	pub issuer: String,
	/// Status code attached to responses carrying issued assertions.
	pub status_code: String,
	/// Protocol version of issued assertions.
	pub protocol_version: String,
	/// How long an assertion stays valid after issuance.
	pub validity: Duration,
}
impl IssuerInfo {
	/// Creates a builder seeded with the issuer identity and reference defaults.
	pub fn builder(issuer: impl Into<String>) -> IssuerInfoBuilder {
		IssuerInfoBuilder::new(issuer.into())
	}
}

/// Builder for [`IssuerInfo`] values.
#[derive(Debug)]
pub struct IssuerInfoBuilder {
	issuer: String,
	status_code: String,
	protocol_version: String,
	validity: Duration,
}
impl IssuerInfoBuilder {
	fn new(issuer: String) -> Self {
		Self {
			issuer,
			status_code: STATUS_SUCCESS.into(),
			protocol_version: DEFAULT_PROTOCOL_VERSION.into(),
			validity: DEFAULT_ASSERTION_VALIDITY,
		}
	}

	/// Overrides the response status code.
	pub fn status_code(mut self, code: impl Into<String>) -> Self {
		self.status_code = code.into();

		self
	}

	/// Overrides the protocol version.
	pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
		self.protocol_version = version.into();

		self
	}

	/// Overrides the assertion validity (defaults to five minutes).
	pub fn validity(mut self, validity: Duration) -> Self {
		self.validity = validity;

		self
	}

	/// Consumes the builder and validates the resulting holder.
	pub fn build(self) -> Result<IssuerInfo, HolderError> {
		if self.issuer.trim().is_empty() {
			return Err(HolderError::EmptyIssuer);
		}
		if !self.validity.is_positive() {
			return Err(HolderError::NonPositiveValidity);
		}

		Ok(IssuerInfo {
			issuer: self.issuer,
			status_code: self.status_code,
			protocol_version: self.protocol_version,
			validity: self.validity,
		})
	}
}

/// Subject confirmation parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationInfo {
	/// Confirmation method stamped on issued assertions.
	pub method: ConfirmationMethod,
	/// Name identifier format of the subject.
	pub name_id_format: NameIdFormat,
}
impl ConfirmationInfo {
	/// Creates a holder from its two parameters.
	pub fn new(method: ConfirmationMethod, name_id_format: NameIdFormat) -> Self {
		Self { method, name_id_format }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn issuer_defaults_match_reference_deployment() {
		let info = IssuerInfo::builder("https://idp.example.com/")
			.build()
			.expect("Issuer with defaults should build.");

		assert_eq!(info.validity, Duration::minutes(5));
		assert_eq!(info.status_code, STATUS_SUCCESS);
		assert_eq!(info.protocol_version, "2.0");
	}

	#[test]
	fn issuer_builder_rejects_blank_and_non_positive() {
		assert_eq!(IssuerInfo::builder("  ").build(), Err(HolderError::EmptyIssuer));
		assert_eq!(
			IssuerInfo::builder("https://idp.example.com/").validity(Duration::ZERO).build(),
			Err(HolderError::NonPositiveValidity)
		);
	}

	#[test]
	fn confirmation_defaults_to_bearer() {
		let info = ConfirmationInfo::default();

		assert_eq!(info.method, ConfirmationMethod::Bearer);
		assert_eq!(info.name_id_format, NameIdFormat::Unspecified);
	}
}
