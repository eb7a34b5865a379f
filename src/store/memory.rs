//! Thread-safe in-memory [`TokenRegistry`] implementation for single-node deployments and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenId,
	store::{
		CancelOutcome, RegistryLookup, RegistryState, RotateOutcome, StoreError, TokenEntry,
		TokenRegistry,
	},
};

/// Registry backend that keeps lifecycle state in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryRegistry(Arc<RwLock<RegistryState>>);
impl TokenRegistry for MemoryRegistry {
	fn insert(&self, entry: TokenEntry) -> Result<(), StoreError> {
		self.0.write().insert(entry);

		Ok(())
	}

	fn lookup(&self, id: &TokenId) -> RegistryLookup {
		self.0.read().lookup(id)
	}

	fn cancel(&self, id: &TokenId, instant: OffsetDateTime) -> Result<CancelOutcome, StoreError> {
		Ok(self.0.write().cancel(id, instant))
	}

	fn mark_expired(&self, id: &TokenId, instant: OffsetDateTime) -> Result<bool, StoreError> {
		Ok(self.0.write().mark_expired(id, instant))
	}

	fn remember_cancelled(&self, id: &TokenId, instant: OffsetDateTime) -> Result<(), StoreError> {
		self.0.write().remember_cancelled(id, instant);

		Ok(())
	}

	fn rotate(
		&self,
		source: &TokenId,
		replacement: TokenEntry,
		now: OffsetDateTime,
		skew: Duration,
	) -> Result<RotateOutcome, StoreError> {
		Ok(self.0.write().rotate(source, replacement, now, skew))
	}

	fn len(&self) -> usize {
		self.0.read().len()
	}
}
