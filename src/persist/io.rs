//! Envelope encoding and the persistence gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::data::{PersistentGameState, STATE_VERSION, STORAGE_KEY};
use super::store::{KeyValueStore, StoreError};

/// Envelope around the stored state to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct StateEnvelope {
    /// Format version.
    version: u32,
    /// When the record was written.
    saved_at: DateTime<Utc>,
    /// SHA256 checksum of the compact JSON of `state`.
    checksum: String,
    /// The actual state.
    state: PersistentGameState,
}

/// Why a stored record was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorruptState {
    /// Not a valid envelope.
    #[error("unparseable record: {0}")]
    Parse(String),

    /// The state does not match its checksum.
    #[error("integrity check failed: checksum mismatch")]
    ChecksumMismatch,

    /// Written by an unknown format version.
    #[error("unsupported record version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version in the record.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },
}

fn checksum(state: &PersistentGameState) -> Result<String, serde_json::Error> {
    // Always hash the compact form; decode re-serializes the same way.
    let json = serde_json::to_string(state)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Serialize `state` into a checksummed envelope.
pub fn encode(state: &PersistentGameState) -> Result<String, StoreError> {
    let envelope = StateEnvelope {
        version: STATE_VERSION,
        saved_at: Utc::now(),
        checksum: checksum(state)?,
        state: state.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse and verify an envelope.
pub fn decode(text: &str) -> Result<PersistentGameState, CorruptState> {
    let envelope: StateEnvelope =
        serde_json::from_str(text).map_err(|e| CorruptState::Parse(e.to_string()))?;

    if envelope.version != STATE_VERSION {
        return Err(CorruptState::UnsupportedVersion {
            found: envelope.version,
            expected: STATE_VERSION,
        });
    }

    let calculated = checksum(&envelope.state).map_err(|e| CorruptState::Parse(e.to_string()))?;
    if calculated != envelope.checksum {
        return Err(CorruptState::ChecksumMismatch);
    }

    Ok(envelope.state)
}

/// Outcome of [`PersistenceGateway::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// A valid record.
    Found(PersistentGameState),
    /// Nothing stored.
    NotFound,
    /// A record was present but rejected; it has been removed.
    Corrupt(CorruptState),
}

/// Reads and writes the single game record.
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    /// Gateway over `store` using the standard key.
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    /// Gateway over `store` using a custom key.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Replace the stored record.
    pub fn save(&mut self, state: &PersistentGameState) -> Result<(), StoreError> {
        let text = encode(state)?;
        self.store.set(&self.key, &text)?;
        log::debug!(
            "Saved game state: {} scanned, in progress: {}",
            state.scanned_count(),
            state.mission_in_progress
        );
        Ok(())
    }

    /// Read the stored record. A corrupt record is removed before returning.
    pub fn load(&mut self) -> Result<LoadResult, StoreError> {
        let Some(text) = self.store.get(&self.key)? else {
            return Ok(LoadResult::NotFound);
        };
        match decode(&text) {
            Ok(state) => Ok(LoadResult::Found(state)),
            Err(reason) => {
                log::warn!("Discarding stored game state: {}", reason);
                self.store.remove(&self.key)?;
                Ok(LoadResult::Corrupt(reason))
            }
        }
    }

    /// Remove the stored record.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }

    /// The backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The backend, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give the backend back.
    pub fn into_inner(self) -> S {
        self.store
    }
}
