//! Audience restriction modeling.

// std
use std::collections::BTreeSet;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Errors emitted when validating audience entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AudienceError {
	/// Empty entries are not allowed.
	#[error("Audience entries cannot be empty.")]
	Empty,
	/// Entry is not an absolute URI.
	#[error("Audience entry is not an absolute URI: {entry}.")]
	InvalidUri {
		/// The offending entry.
		entry: String,
	},
}

/// Normalized set of relying-party URIs permitted to accept a token.
///
/// Entries are validated as absolute URIs, deduplicated, and sorted so equality and the signed
/// canonical form stay stable regardless of declaration order. An empty set places no
/// restriction on the relying party.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct AudienceSet(Arc<[String]>);
impl AudienceSet {
	/// Creates a normalized audience set from any iterator of URIs.
	pub fn new<I, S>(entries: I) -> Result<Self, AudienceError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self(normalize(entries)?))
	}

	/// Audience set that places no restriction.
	pub fn unrestricted() -> Self {
		Self::default()
	}

	/// Number of distinct relying parties.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no restriction is declared.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the relying party is explicitly listed.
	pub fn contains(&self, relying_party: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(relying_party)).is_ok()
	}

	/// Returns true if the relying party may accept a token carrying this restriction.
	pub fn permits(&self, relying_party: &str) -> bool {
		self.is_empty() || self.contains(relying_party)
	}

	/// Iterator over normalized entries.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|s| s.as_str())
	}

	/// Returns the underlying slice of entries.
	pub fn as_slice(&self) -> &[String] {
		&self.0
	}
}
impl Debug for AudienceSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AudienceSet").field(&self.0).finish()
	}
}
impl Display for AudienceSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0.join(","))
	}
}

impl FromStr for AudienceSet {
	type Err = AudienceError;

	/// Parses a comma-separated list; surrounding whitespace on each entry is ignored.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.trim().is_empty() {
			return Ok(Self::default());
		}

		Self::new(s.split(',').map(str::trim))
	}
}
impl Serialize for AudienceSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for entry in self.0.iter() {
			seq.serialize_element(entry)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for AudienceSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		AudienceSet::new(values).map_err(DeError::custom)
	}
}

fn normalize<I, S>(entries: I) -> Result<Arc<[String]>, AudienceError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut set = BTreeSet::new();

	for entry in entries {
		let owned: String = entry.into();

		if owned.is_empty() {
			return Err(AudienceError::Empty);
		}
		if owned.chars().any(char::is_whitespace) || Url::parse(&owned).is_err() {
			return Err(AudienceError::InvalidUri { entry: owned });
		}

		set.insert(owned);
	}

	Ok(Arc::from(set.into_iter().collect::<Vec<_>>()))
}
