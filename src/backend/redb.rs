//! Redb-backed scanning backend.
//!
//! Provides persistent key-value storage using redb with ACID guarantees.
//! Every batch runs inside a single redb transaction, and scans walk the
//! table in key order from the cursor position.

use super::client::{BackendClient, ScanCursor, ScanPage};
use super::pattern::{self, KeyMatcher};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, TableDefinition};
use serde::{Deserialize, Serialize};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Table name for key-value pairs with expiration metadata
pub(crate) const KV_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("kv");

/// Value as persisted in the table.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: Vec<u8>,
    /// Unix timestamp (seconds) after which the entry is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl StoredEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>, now: i64) -> Result<Self> {
        let expires_at = match ttl {
            Some(ttl) => {
                let secs = i64::try_from(ttl.as_secs()).context("TTL out of range")?;
                Some(now.checked_add(secs).context("TTL out of range")?)
            },
            None => None,
        };
        Ok(Self { value, expires_at })
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Redb-backed scanning backend.
///
/// Suitable where keys must survive restarts. Expired entries read as
/// absent and are skipped by scans. Reads and scans that run into an
/// expired entry delete it afterwards in a separate write transaction.
///
/// # Thread Safety
///
/// `RedbBackend` is `Clone` and can be shared across threads. The underlying
/// database handles concurrent access safely.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    closed: Arc<AtomicBool>,
}

impl RedbBackend {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened or created (permissions, disk full, etc.)
    /// - Initialization transaction fails to begin or commit
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create KV directory: {}", parent.display()))?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open KV database: {}", path.display()))?;

        // Initialize table on first open to ensure it exists for reads
        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to initialize KV table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        tracing::debug!(path = %path.display(), "Opened redb backend");

        Ok(Self {
            db: Arc::new(db),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            bail!("Redb backend connection is closed");
        }
        Ok(())
    }

    fn get_many_sync(&self, keys: &[String], now: i64) -> Result<Vec<Option<Vec<u8>>>> {
        self.ensure_open()?;
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(KV_TABLE)
            .context("Failed to open KV table")?;

        let mut values = Vec::with_capacity(keys.len());
        let mut expired_keys = Vec::new();
        for key in keys {
            let stored = table
                .get(key.as_str())
                .with_context(|| format!("Failed to read key '{key}'"))?;

            let value = match stored {
                Some(guard) => {
                    let entry: StoredEntry = serde_json::from_slice(guard.value())
                        .with_context(|| format!("Failed to deserialize entry for key '{key}'"))?;
                    if entry.is_expired(now) {
                        expired_keys.push(key.clone());
                        None
                    } else {
                        Some(entry.value)
                    }
                },
                None => None,
            };
            values.push(value);
        }

        // Drop read transaction before starting write
        drop(table);
        drop(read_txn);
        self.cleanup_expired(&expired_keys, now);

        Ok(values)
    }

    /// Deletes `keys` that are still expired at `now`.
    ///
    /// Entries overwritten since they were seen expired are put back
    /// untouched. Returns how many entries were removed.
    fn remove_expired_sync(&self, keys: &[String], now: i64) -> Result<usize> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        let mut removed = 0;
        {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to open KV table")?;

            for key in keys {
                let old = table
                    .remove(key.as_str())
                    .with_context(|| format!("Failed to remove key '{key}'"))?
                    .map(|guard| guard.value().to_vec());
                let Some(bytes) = old else { continue };

                let still_expired = serde_json::from_slice::<StoredEntry>(&bytes)
                    .is_ok_and(|entry| entry.is_expired(now));
                if still_expired {
                    removed += 1;
                } else {
                    table
                        .insert(key.as_str(), bytes.as_slice())
                        .with_context(|| format!("Failed to restore key '{key}'"))?;
                }
            }
        }

        write_txn
            .commit()
            .context("Failed to commit expiry cleanup transaction")?;

        Ok(removed)
    }

    /// Best-effort removal of expired entries seen by a read.
    fn cleanup_expired(&self, keys: &[String], now: i64) {
        if keys.is_empty() {
            return;
        }
        match self.remove_expired_sync(keys, now) {
            Ok(removed) => tracing::debug!(removed, "Removed expired entries"),
            Err(e) => tracing::warn!(error = %e, "Failed to remove expired entries"),
        }
    }

    fn set_many_sync(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
        now: i64,
    ) -> Result<()> {
        self.ensure_open()?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to open KV table")?;

            for (key, value) in entries {
                let entry = StoredEntry::new(value, ttl, now)?;
                let json =
                    serde_json::to_vec(&entry).context("Failed to serialize entry to JSON")?;
                table
                    .insert(key.as_str(), json.as_slice())
                    .with_context(|| format!("Failed to insert key '{key}'"))?;
            }
        }

        write_txn
            .commit()
            .context("Failed to commit set transaction")?;

        Ok(())
    }

    fn delete_many_sync(&self, keys: &[String]) -> Result<()> {
        self.ensure_open()?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;

        {
            let mut table = write_txn
                .open_table(KV_TABLE)
                .context("Failed to open KV table")?;

            for key in keys {
                table
                    .remove(key.as_str())
                    .with_context(|| format!("Failed to remove key '{key}'"))?;
            }
        }

        write_txn
            .commit()
            .context("Failed to commit delete transaction")?;

        Ok(())
    }

    fn scan_page_sync(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        page_size: usize,
        now: i64,
    ) -> Result<ScanPage> {
        self.ensure_open()?;
        let matcher = KeyMatcher::new(pattern)?;
        let resume = pattern::resume_key(cursor)?;

        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;
        let table = read_txn
            .open_table(KV_TABLE)
            .context("Failed to open KV table")?;

        let lower = match resume.as_deref() {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let mut range = table
            .range::<&str>((lower, Bound::Unbounded))
            .context("Failed to iterate KV table")?;

        let mut keys = Vec::new();
        let mut expired_keys = Vec::new();
        let mut last_examined = None;

        for item in range.by_ref().take(page_size.max(1)) {
            let (key, value) = item.context("Failed to read KV entry")?;
            let key = key.value().to_string();

            let entry: StoredEntry = serde_json::from_slice(value.value())
                .with_context(|| format!("Failed to deserialize entry for key '{key}'"))?;
            if entry.is_expired(now) {
                expired_keys.push(key.clone());
            } else if matcher.matches(&key) {
                keys.push(key.clone());
            }
            last_examined = Some(key);
        }

        let more = range.next().is_some();
        let cursor = match last_examined {
            Some(last) if more => pattern::resume_after(&last),
            _ => ScanCursor::start(),
        };

        drop(range);
        drop(table);
        drop(read_txn);
        self.cleanup_expired(&expired_keys, now);

        Ok(ScanPage { cursor, keys })
    }
}

#[async_trait]
impl BackendClient for RedbBackend {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let backend = self.clone();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || backend.get_many_sync(&keys, unix_now()))
            .await
            .context("Task join error")?
    }

    async fn set_many(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.set_many_sync(entries, ttl, unix_now()))
            .await
            .context("Task join error")?
    }

    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        let backend = self.clone();
        let keys = keys.to_vec();
        tokio::task::spawn_blocking(move || backend.delete_many_sync(&keys))
            .await
            .context("Task join error")?
    }

    async fn scan_page(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        page_size: usize,
    ) -> Result<ScanPage> {
        let backend = self.clone();
        let cursor = cursor.clone();
        let pattern = pattern.to_string();
        tokio::task::spawn_blocking(move || {
            backend.scan_page_sync(&cursor, &pattern, page_size, unix_now())
        })
        .await
        .context("Task join error")?
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            bail!("Redb backend connection is already closed");
        }
        tracing::debug!("Closed redb backend");
        Ok(())
    }
}
