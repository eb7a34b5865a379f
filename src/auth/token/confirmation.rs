//! Subject confirmation methods and name identifier formats.

// self
use crate::_prelude::*;

/// How the presenter proves it may use a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMethod {
	#[default]
	/// Whoever holds the token may use it.
	Bearer,
	/// The presenter must demonstrate possession of a key bound to the token.
	HolderOfKey,
	/// An attesting entity vouches for the subject.
	SenderVouches,
}
impl ConfirmationMethod {
	/// Returns the SAML 2.0 URI for the method.
	pub const fn uri(self) -> &'static str {
		match self {
			ConfirmationMethod::Bearer => "urn:oasis:names:tc:SAML:2.0:cm:bearer",
			ConfirmationMethod::HolderOfKey => "urn:oasis:names:tc:SAML:2.0:cm:holder-of-key",
			ConfirmationMethod::SenderVouches => "urn:oasis:names:tc:SAML:2.0:cm:sender-vouches",
		}
	}
}
impl Display for ConfirmationMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.uri())
	}
}

/// Format of the subject's name identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameIdFormat {
	#[default]
	/// No particular format.
	Unspecified,
	/// RFC 822 email address.
	EmailAddress,
	/// Stable pseudonymous identifier shared with one relying party.
	Persistent,
	/// One-time identifier.
	Transient,
}
impl NameIdFormat {
	/// Returns the SAML URI for the format.
	pub const fn uri(self) -> &'static str {
		match self {
			NameIdFormat::Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
			NameIdFormat::EmailAddress => "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress",
			NameIdFormat::Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
			NameIdFormat::Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
		}
	}
}
impl Display for NameIdFormat {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.uri())
	}
}
