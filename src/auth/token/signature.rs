//! Opaque signature blob bound to a token's canonical bytes.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
// self
use crate::_prelude::*;

/// Signature produced by a [`Signer`](crate::crypto::Signer) over a token's canonical bytes.
///
/// Serialized as unpadded base64 so registry snapshots stay human-readable.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(Vec<u8>);
impl Signature {
	/// Wraps raw signature bytes.
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self(bytes.into())
	}

	/// Returns the raw signature bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Returns true if the blob carries no bytes.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<[u8]> for Signature {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}
impl From<Signature> for String {
	fn from(value: Signature) -> Self {
		STANDARD_NO_PAD.encode(value.0)
	}
}
impl TryFrom<String> for Signature {
	type Error = base64::DecodeError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		STANDARD_NO_PAD.decode(value).map(Self)
	}
}
impl Debug for Signature {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Signature({} bytes)", self.0.len())
	}
}
impl Display for Signature {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&STANDARD_NO_PAD.encode(&self.0))
	}
}
