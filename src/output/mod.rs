//! Plain-text and JSON output for non-interactive commands.
//!
//! # Example
//!
//! ```no_run
//! use starscan::config::Config;
//! use starscan::output::StatusReport;
//! use starscan::persist::{MemoryStore, PersistenceGateway};
//!
//! let mut gateway = PersistenceGateway::new(MemoryStore::new());
//! let loaded = gateway.load().unwrap();
//! let report = StatusReport::from_load(&loaded, &Config::default());
//! println!("{}", report.to_json_pretty().unwrap());
//! ```

pub mod status;

pub use status::{StatusReport, SystemStatus};
