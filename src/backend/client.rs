//! Backend client trait for the namespaced store.
//!
//! Defines the capability set every scanning key-value backend must offer:
//! batched get, batched set with optional expiry, batched delete, a
//! cursor-based key scan, and close.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Opaque scan progress token handed out by a backend.
///
/// `"0"` is both the initial and the terminal value. An empty token is
/// treated as terminal as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanCursor(String);

impl ScanCursor {
    /// Raw value of the initial and terminal cursor.
    pub const START: &'static str = "0";

    /// Cursor that starts a new enumeration.
    #[must_use]
    pub fn start() -> Self {
        Self(Self::START.to_string())
    }

    /// Wraps a backend-provided token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns true if the backend reported the end of the enumeration.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.0.is_empty() || self.0 == Self::START
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScanCursor {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for ScanCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a cursor scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next `scan_page` call.
    pub cursor: ScanCursor,
    /// Physical keys matched on this page. May be empty mid-scan.
    pub keys: Vec<String>,
}

/// Scanning key-value backend.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Keys handed to a backend are physical keys: namespacing is applied
/// by the store before the call.
///
/// Batches are not required to be atomic. A backend that only guarantees
/// per-key atomicity may fail halfway through `set_many` or `delete_many`.
#[async_trait]
pub trait BackendClient: Send + Sync + 'static {
    /// Reads every key in one round trip.
    ///
    /// Returns one slot per input key, in input order. A missing or expired
    /// key is `None`; a stored empty value is `Some(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve the read.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Writes every entry in one round trip.
    ///
    /// With `ttl` set, each entry expires after that duration. With `None`,
    /// entries never expire and any expiry left on an overwritten key is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve the write. Some entries
    /// may already be stored when this happens.
    async fn set_many(&self, entries: Vec<(String, Vec<u8>)>, ttl: Option<Duration>)
    -> Result<()>;

    /// Removes every key in one round trip. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve the delete.
    async fn delete_many(&self, keys: &[String]) -> Result<()>;

    /// Returns the next page of keys matching a glob `pattern`.
    ///
    /// `page_size` is a hint for how much work a single page may do. A page
    /// can hold fewer keys than the hint, or none, without ending the scan.
    /// The scan ends when the returned cursor is terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve the scan or the cursor
    /// is not one it handed out.
    async fn scan_page(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        page_size: usize,
    ) -> Result<ScanPage>;

    /// Releases the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is already closed.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_cursor_is_terminal() {
        assert!(ScanCursor::start().is_terminal());
        assert!(ScanCursor::new("").is_terminal());
        assert!(!ScanCursor::new("6b6579").is_terminal());
    }
}
