//! Namespaced key-value store over a scanning backend.
//!
//! Lets independent subsystems share one backend by prefixing every key with
//! a namespace:
//!
//! - batched `get_many` / `set_many` / `delete_many`
//! - one optional TTL applied to every write
//! - resumable cursor scans that strip the namespace back out
//!
//! # Example
//!
//! ```ignore
//! use nskv::NamespacedStore;
//!
//! let store = NamespacedStore::builder()
//!     .url("memory://")
//!     .namespace("results")
//!     .build()
//!     .await?;
//!
//! store.set_many([("a", b"1".to_vec())]).await?;
//! let keys = store.scan_keys(None).collect_keys().await?;
//! ```

mod keys;
mod namespaced;
mod scan;

#[cfg(test)]
mod tests;

pub use keys::{KeySpace, SEPARATOR};
pub use namespaced::{NamespacedStore, StoreBuilder};
pub use scan::KeyScan;
