//! Namespaced, TTL-aware key-value facade over scanning backends.
//!
//! Several subsystems can share one key-value backend without key
//! collisions: a [`NamespacedStore`] prefixes every key with its namespace
//! on the way in and strips it on the way out.
//!
//! - [`store`] - the façade: batched get/set/delete, uniform TTL, key scans
//! - [`backend`] - the [`BackendClient`] trait plus memory and redb backends
//! - [`config`] - TOML-loadable construction parameters
//! - [`error`] - typed errors (`Configuration`, `BackendUnavailable`)

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod store;

pub use backend::{BackendClient, MemoryBackend, RedbBackend, ScanCursor, ScanPage};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{KeyScan, NamespacedStore, StoreBuilder};
