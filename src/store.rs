//! Token registry contract and built-in registry implementations.
//!
//! The registry is the authority on token lifecycle state. Every transition goes through a single
//! write-locked section, so a renewal that retires the source token and records its replacement is
//! observed by concurrent validators either entirely or not at all.

pub mod file;
pub mod memory;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

// self
use crate::{
	_prelude::*,
	auth::{Token, TokenId, TokenState},
	clock::{self, Validity},
};

/// Storage contract implemented by token registries.
pub trait TokenRegistry
where
	Self: Send + Sync,
{
	/// Records a freshly issued token. Re-inserting an identifier replaces the entry.
	fn insert(&self, entry: TokenEntry) -> Result<(), StoreError>;

	/// Looks up the authoritative entry for `id`.
	fn lookup(&self, id: &TokenId) -> RegistryLookup;

	/// Moves an issued token to [`TokenState::Cancelled`]; terminal entries are left untouched.
	fn cancel(&self, id: &TokenId, instant: OffsetDateTime) -> Result<CancelOutcome, StoreError>;

	/// Moves an issued token to [`TokenState::Expired`]; returns true if this call made the change.
	fn mark_expired(&self, id: &TokenId, instant: OffsetDateTime) -> Result<bool, StoreError>;

	/// Remembers that an unknown identifier was cancelled.
	fn remember_cancelled(&self, id: &TokenId, instant: OffsetDateTime) -> Result<(), StoreError>;

	/// Atomically cancels `source` and records `replacement` if `source` is still renewable at
	/// `now` (with `skew` tolerance).
	fn rotate(
		&self,
		source: &TokenId,
		replacement: TokenEntry,
		now: OffsetDateTime,
		skew: Duration,
	) -> Result<RotateOutcome, StoreError>;

	/// Number of tracked tokens, excluding tombstones.
	fn len(&self) -> usize;

	/// Returns true if no tokens are tracked.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Registry entry pairing a token with its authoritative lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
	/// Issued token.
	pub token: Token,
	/// Current lifecycle state.
	pub state: TokenState,
	/// Instant of the last state change, if any.
	pub changed_at: Option<OffsetDateTime>,
}
impl TokenEntry {
	/// Creates an entry in the [`TokenState::Issued`] state.
	pub fn issued(token: Token) -> Self {
		Self { token, state: TokenState::Issued, changed_at: None }
	}

	/// Identifier of the tracked token.
	pub fn id(&self) -> &TokenId {
		self.token.id()
	}
}

/// Result of [`TokenRegistry::lookup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryLookup {
	/// Token is tracked.
	Found(TokenEntry),
	/// Identifier was never issued but was cancelled at the recorded instant.
	Tombstone(OffsetDateTime),
	/// Identifier is unknown.
	Missing,
}

/// Result of [`TokenRegistry::cancel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
	/// The token moved from issued to cancelled.
	Cancelled,
	/// The token was already terminal and kept its state.
	AlreadyTerminal(TokenState),
	/// No token matched the identifier.
	Missing,
}

/// Result of [`TokenRegistry::rotate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateOutcome {
	/// The source was cancelled and the replacement recorded.
	Rotated,
	/// The source is in a terminal state.
	NotRenewable(TokenState),
	/// The source window closed; it was marked expired.
	Expired,
	/// No token matched the source identifier.
	Missing,
}

/// Error type produced by [`TokenRegistry`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Lifecycle bookkeeping shared by the built-in registries.
///
/// Callers hold the surrounding write lock for every mutating method.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegistryState {
	entries: HashMap<TokenId, TokenEntry>,
	tombstones: HashMap<TokenId, OffsetDateTime>,
}
impl RegistryState {
	pub(crate) fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
		Self {
			entries: snapshot.entries.into_iter().map(|e| (e.id().clone(), e)).collect(),
			tombstones: snapshot.tombstones.into_iter().collect(),
		}
	}

	pub(crate) fn snapshot(&self) -> RegistrySnapshot {
		let mut entries = self.entries.values().cloned().collect::<Vec<_>>();
		let mut tombstones =
			self.tombstones.iter().map(|(id, at)| (id.clone(), *at)).collect::<Vec<_>>();

		entries.sort_by(|a, b| a.id().cmp(b.id()));
		tombstones.sort_by(|a, b| a.0.cmp(&b.0));

		RegistrySnapshot { entries, tombstones }
	}

	pub(crate) fn insert(&mut self, entry: TokenEntry) {
		self.tombstones.remove(entry.id());
		self.entries.insert(entry.id().clone(), entry);
	}

	pub(crate) fn lookup(&self, id: &TokenId) -> RegistryLookup {
		if let Some(entry) = self.entries.get(id) {
			return RegistryLookup::Found(entry.clone());
		}

		match self.tombstones.get(id) {
			Some(at) => RegistryLookup::Tombstone(*at),
			None => RegistryLookup::Missing,
		}
	}

	pub(crate) fn cancel(&mut self, id: &TokenId, instant: OffsetDateTime) -> CancelOutcome {
		match self.entries.get_mut(id) {
			Some(entry) if entry.state.is_terminal() => CancelOutcome::AlreadyTerminal(entry.state),
			Some(entry) => {
				entry.state = TokenState::Cancelled;
				entry.changed_at = Some(instant);

				CancelOutcome::Cancelled
			},
			None => CancelOutcome::Missing,
		}
	}

	pub(crate) fn mark_expired(&mut self, id: &TokenId, instant: OffsetDateTime) -> bool {
		match self.entries.get_mut(id) {
			Some(entry) if entry.state == TokenState::Issued => {
				entry.state = TokenState::Expired;
				entry.changed_at = Some(instant);

				true
			},
			_ => false,
		}
	}

	pub(crate) fn remember_cancelled(&mut self, id: &TokenId, instant: OffsetDateTime) -> bool {
		if self.entries.contains_key(id) || self.tombstones.contains_key(id) {
			return false;
		}

		self.tombstones.insert(id.clone(), instant);

		true
	}

	pub(crate) fn rotate(
		&mut self,
		source: &TokenId,
		replacement: TokenEntry,
		now: OffsetDateTime,
		skew: Duration,
	) -> RotateOutcome {
		let Some(entry) = self.entries.get_mut(source) else {
			return RotateOutcome::Missing;
		};

		if entry.state.is_terminal() {
			return RotateOutcome::NotRenewable(entry.state);
		}
		if clock::evaluate(entry.token.not_before(), entry.token.not_on_or_after(), now, skew)
			== Validity::Expired
		{
			entry.state = TokenState::Expired;
			entry.changed_at = Some(now);

			return RotateOutcome::Expired;
		}

		entry.state = TokenState::Cancelled;
		entry.changed_at = Some(now);

		self.insert(replacement);

		RotateOutcome::Rotated
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

/// Serialized form of a registry, ordered for stable diffs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct RegistrySnapshot {
	entries: Vec<TokenEntry>,
	#[serde(default)]
	tombstones: Vec<(TokenId, OffsetDateTime)>,
}
