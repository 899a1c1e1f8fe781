//! Scanning key-value backends.
//!
//! The store talks to its backend only through the [`BackendClient`] trait.
//! Two implementations ship with the crate:
//!
//! - **MemoryBackend**: Fast, non-persistent storage (testing/embedding)
//! - **RedbBackend**: Persistent storage with ACID guarantees
//!
//! # Custom Backends
//!
//! Implement the `BackendClient` trait to use custom storage:
//!
//! ```ignore
//! use nskv::backend::BackendClient;
//! use nskv::NamespacedStore;
//!
//! struct RedisBackend { /* ... */ }
//! impl BackendClient for RedisBackend { /* ... */ }
//!
//! let store = NamespacedStore::builder()
//!     .backend(Arc::new(RedisBackend::new()))
//!     .namespace("results")
//!     .build()
//!     .await?;
//! ```

mod client;
mod connect;
mod memory;
pub mod pattern;
mod redb;

pub use client::{BackendClient, ScanCursor, ScanPage};
pub use connect::{BackendUrl, connect};
pub use memory::MemoryBackend;
pub use self::redb::RedbBackend;
