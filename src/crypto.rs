//! Signing contracts the token service delegates cryptography to.
//!
//! The service never implements cryptography itself: it hands canonical token bytes to a
//! [`Signer`] at issuance and asks a [`Verifier`] to check presented tokens. Hosts plug in XML-DSig,
//! HSM-backed, or asymmetric implementations; [`HmacSha256Signer`] is a shared-secret reference
//! implementation for single-node deployments and tests.

// crates.io
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{_prelude::*, auth::Signature};

type HmacSha256 = Hmac<Sha256>;

/// Minimum key length (in bytes) accepted by [`HmacSha256Signer`].
pub const MIN_HMAC_KEY_LEN: usize = 32;

/// Errors raised by signers and verifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SignatureError {
	/// Key material was rejected.
	#[error("Signing key is invalid: {reason}.")]
	InvalidKey {
		/// Why the key was rejected.
		reason: String,
	},
	/// Token content could not be reduced to canonical bytes.
	#[error("Token could not be canonicalized: {message}.")]
	Canonicalization {
		/// Serializer message.
		message: String,
	},
	/// Backend failed while signing or verifying.
	#[error("Signature backend failure: {message}.")]
	Backend {
		/// Backend message.
		message: String,
	},
}

/// Produces signatures over canonical token bytes.
pub trait Signer
where
	Self: Send + Sync,
{
	/// Signs `canonical` and returns the opaque blob.
	fn sign(&self, canonical: &[u8]) -> Result<Signature, SignatureError>;
}

/// Checks signatures over canonical token bytes.
pub trait Verifier
where
	Self: Send + Sync,
{
	/// Returns `Ok(true)` only if `signature` covers `canonical` and was produced on behalf of
	/// `trusted_issuer`.
	fn verify(
		&self,
		canonical: &[u8],
		signature: &Signature,
		trusted_issuer: &str,
	) -> Result<bool, SignatureError>;
}

/// HMAC-SHA256 signer and verifier bound to a single issuer.
#[derive(Clone)]
pub struct HmacSha256Signer {
	issuer: String,
	key: Arc<[u8]>,
}
impl HmacSha256Signer {
	/// Creates a signer for `issuer`; the key must be at least [`MIN_HMAC_KEY_LEN`] bytes.
	pub fn new(issuer: impl Into<String>, key: impl AsRef<[u8]>) -> Result<Self, SignatureError> {
		let key = key.as_ref();

		if key.len() < MIN_HMAC_KEY_LEN {
			return Err(SignatureError::InvalidKey {
				reason: format!("expected at least {MIN_HMAC_KEY_LEN} bytes, got {}", key.len()),
			});
		}

		Ok(Self { issuer: issuer.into(), key: Arc::from(key) })
	}

	/// Issuer this signer speaks for.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	fn mac(&self) -> Result<HmacSha256, SignatureError> {
		HmacSha256::new_from_slice(&self.key)
			.map_err(|e| SignatureError::InvalidKey { reason: e.to_string() })
	}
}
impl Signer for HmacSha256Signer {
	fn sign(&self, canonical: &[u8]) -> Result<Signature, SignatureError> {
		let mut mac = self.mac()?;

		mac.update(canonical);

		Ok(Signature::new(mac.finalize().into_bytes().to_vec()))
	}
}
impl Verifier for HmacSha256Signer {
	fn verify(
		&self,
		canonical: &[u8],
		signature: &Signature,
		trusted_issuer: &str,
	) -> Result<bool, SignatureError> {
		if trusted_issuer != self.issuer {
			return Ok(false);
		}

		let mut mac = self.mac()?;

		mac.update(canonical);

		Ok(mac.verify_slice(signature.as_bytes()).is_ok())
	}
}
impl Debug for HmacSha256Signer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HmacSha256Signer")
			.field("issuer", &self.issuer)
			.field("key", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

	#[test]
	fn sign_then_verify_accepts_only_matching_content_and_issuer() {
		let signer = HmacSha256Signer::new("https://idp.example.com/", KEY)
			.expect("Signer fixture should accept a 32 byte key.");
		let signature = signer.sign(b"payload").expect("Signing should succeed.");

		assert!(signer.verify(b"payload", &signature, "https://idp.example.com/").unwrap_or(false));
		assert!(!signer.verify(b"tampered", &signature, "https://idp.example.com/").unwrap_or(true));
		assert!(!signer.verify(b"payload", &signature, "https://other.example.com/").unwrap_or(true));
	}

	#[test]
	fn short_keys_are_rejected() {
		let err = HmacSha256Signer::new("iss", b"short").expect_err("Short keys must be rejected.");

		assert!(matches!(err, SignatureError::InvalidKey { .. }));
	}

	#[test]
	fn debug_redacts_key() {
		let signer = HmacSha256Signer::new("iss", KEY).expect("Signer fixture should build.");

		assert!(!format!("{signer:?}").contains("0123456789"));
	}
}
