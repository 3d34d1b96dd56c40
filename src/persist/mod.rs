//! Persistence gateway for the durable game record.
//!
//! Only three facts survive a restart: the trainee's name, the scanned
//! targets with their data, and whether a mission is in progress. They are
//! stored as one JSON record under a single key of a [`KeyValueStore`].
//!
//! # Features
//!
//! * **Integrity**: the record is wrapped in an envelope carrying a SHA-256
//!   checksum of the state.
//! * **Versioning**: envelopes from an unknown format version are rejected.
//! * **Recovery**: a record that fails any check is removed and reported as
//!   [`LoadResult::Corrupt`], so the game can start fresh.
//!
//! # Architecture
//!
//! * [`data`]: the serializable state.
//! * [`io`]: envelope encoding and the [`PersistenceGateway`].
//! * [`store`]: key-value backends (in-memory and SQLite).

pub mod data;
pub mod io;
pub mod store;

pub use data::{PersistentGameState, ScanRecord, STATE_VERSION, STORAGE_KEY};
pub use io::{decode, encode, CorruptState, LoadResult, PersistenceGateway};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
