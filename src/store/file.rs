//! Simple file-backed [`TokenRegistry`] whose state survives restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenId,
	store::{
		CancelOutcome, RegistryLookup, RegistrySnapshot, RegistryState, RotateOutcome,
		StoreError, TokenEntry, TokenRegistry,
	},
};

/// Persists registry state to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileRegistry {
	path: PathBuf,
	inner: Arc<RwLock<RegistryState>>,
}
impl FileRegistry {
	/// Opens (or creates) a registry at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let state = RegistryState::from_snapshot(Self::load_snapshot(&path)?);

		Ok(Self { path, inner: Arc::new(RwLock::new(state)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<RegistrySnapshot, StoreError> {
		if !path.exists() {
			return Ok(RegistrySnapshot::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(RegistrySnapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create registry directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	/// Applies `change` to a copy of the state and publishes it only once a dirty copy is on disk.
	fn commit<T>(
		&self,
		change: impl FnOnce(&mut RegistryState) -> (T, bool),
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();
		let (outcome, dirty) = change(&mut next);

		if dirty {
			self.persist_locked(&next)?;
		}

		*guard = next;

		Ok(outcome)
	}

	fn persist_locked(&self, state: &RegistryState) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&state.snapshot()).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize registry snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenRegistry for FileRegistry {
	fn insert(&self, entry: TokenEntry) -> Result<(), StoreError> {
		self.commit(|state| {
			state.insert(entry);

			((), true)
		})
	}

	fn lookup(&self, id: &TokenId) -> RegistryLookup {
		self.inner.read().lookup(id)
	}

	fn cancel(&self, id: &TokenId, instant: OffsetDateTime) -> Result<CancelOutcome, StoreError> {
		self.commit(|state| {
			let outcome = state.cancel(id, instant);

			(outcome, outcome == CancelOutcome::Cancelled)
		})
	}

	fn mark_expired(&self, id: &TokenId, instant: OffsetDateTime) -> Result<bool, StoreError> {
		self.commit(|state| {
			let changed = state.mark_expired(id, instant);

			(changed, changed)
		})
	}

	fn remember_cancelled(&self, id: &TokenId, instant: OffsetDateTime) -> Result<(), StoreError> {
		self.commit(|state| ((), state.remember_cancelled(id, instant)))
	}

	fn rotate(
		&self,
		source: &TokenId,
		replacement: TokenEntry,
		now: OffsetDateTime,
		skew: Duration,
	) -> Result<RotateOutcome, StoreError> {
		self.commit(|state| {
			let outcome = state.rotate(source, replacement, now, skew);
			let dirty = matches!(outcome, RotateOutcome::Rotated | RotateOutcome::Expired);

			(outcome, dirty)
		})
	}

	fn len(&self) -> usize {
		self.inner.read().len()
	}
}
