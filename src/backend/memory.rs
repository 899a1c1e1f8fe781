//! In-memory scanning backend.
//!
//! Provides a fast, non-persistent backend using an ordered map, so scans
//! can resume from a key-based cursor. Expiry is measured on the tokio
//! clock, which lets tests pause and advance time instead of sleeping.

use super::client::{BackendClient, ScanCursor, ScanPage};
use super::pattern::{self, KeyMatcher};
use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Entry stored in the memory backend with optional expiration.
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory scanning backend.
///
/// All data is lost when the backend is dropped. Ideal for:
/// - Testing and development
/// - Single-process caches
///
/// Expired entries read as absent and are skipped by scans. Reads and scans
/// that run into an expired entry remove it; [`MemoryBackend::purge_expired`]
/// clears the ones nothing has touched.
///
/// # Example
///
/// ```ignore
/// use nskv::backend::{BackendClient, MemoryBackend};
///
/// let backend = MemoryBackend::new();
/// backend.set_many(vec![("key".into(), b"value".to_vec())], None).await?;
/// ```
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<String, MemoryEntry>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries (including expired).
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns true once `close` has succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        before - data.len()
    }

    /// Removes `keys` that are still expired at `now`.
    fn remove_expired(&self, keys: &[String], now: Instant) {
        if keys.is_empty() {
            return;
        }
        let mut data = self.data.write();
        for key in keys {
            if data.get(key).is_some_and(|entry| entry.is_expired(now)) {
                data.remove(key);
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            bail!("Memory backend connection is closed");
        }
        Ok(())
    }
}

#[async_trait]
impl BackendClient for MemoryBackend {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut expired_keys = Vec::new();

        let values: Vec<Option<Vec<u8>>> = {
            let data = self.data.read();
            keys.iter()
                .map(|key| match data.get(key) {
                    Some(entry) if entry.is_expired(now) => {
                        expired_keys.push(key.clone());
                        None
                    },
                    Some(entry) => Some(entry.value.clone()),
                    None => None,
                })
                .collect()
        };

        self.remove_expired(&expired_keys, now);
        Ok(values)
    }

    async fn set_many(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.ensure_open()?;
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert(key, MemoryEntry::new(value, ttl));
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        self.ensure_open()?;
        let mut data = self.data.write();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    async fn scan_page(
        &self,
        cursor: &ScanCursor,
        pattern: &str,
        page_size: usize,
    ) -> Result<ScanPage> {
        self.ensure_open()?;
        let matcher = KeyMatcher::new(pattern)?;
        let lower = match pattern::resume_key(cursor)? {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };

        let now = Instant::now();
        let mut keys = Vec::new();
        let mut expired_keys = Vec::new();

        let cursor = {
            let data = self.data.read();
            let mut range = data.range::<String, _>((lower, Bound::Unbounded));
            let mut last_examined = None;

            for (key, entry) in range.by_ref().take(page_size.max(1)) {
                if entry.is_expired(now) {
                    expired_keys.push(key.clone());
                } else if matcher.matches(key) {
                    keys.push(key.clone());
                }
                last_examined = Some(key);
            }

            match (last_examined, range.next()) {
                (Some(last), Some(_)) => pattern::resume_after(last),
                _ => ScanCursor::start(),
            }
        };

        self.remove_expired(&expired_keys, now);
        Ok(ScanPage { cursor, keys })
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            bail!("Memory backend connection is already closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| (*k).to_string()).collect()
    }

    async fn drain(backend: &MemoryBackend, pattern: &str, page_size: usize) -> Vec<String> {
        let mut cursor = ScanCursor::start();
        let mut found = Vec::new();
        loop {
            let page = backend.scan_page(&cursor, pattern, page_size).await.unwrap();
            found.extend(page.keys);
            if page.cursor.is_terminal() {
                break;
            }
            cursor = page.cursor;
        }
        found
    }

    #[tokio::test]
    async fn test_get_many_preserves_order_and_absence() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                vec![("b".into(), b"2".to_vec()), ("empty".into(), Vec::new())],
                None,
            )
            .await
            .unwrap();

        let values = backend.get_many(&keys(&["missing", "b", "empty"])).await.unwrap();
        assert_eq!(values, vec![None, Some(b"2".to_vec()), Some(Vec::new())]);
    }

    #[tokio::test]
    async fn test_delete_many_ignores_missing() {
        let backend = MemoryBackend::new();
        backend
            .set_many(vec![("a".into(), b"1".to_vec())], None)
            .await
            .unwrap();

        backend.delete_many(&keys(&["a", "nope"])).await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_scan_pages_through_all_matches() {
        let backend = MemoryBackend::new();
        let entries: Vec<(String, Vec<u8>)> = (0..25)
            .map(|i| (format!("ns:{i:02}"), Vec::new()))
            .chain(std::iter::once(("other:1".to_string(), Vec::new())))
            .collect();
        backend.set_many(entries, None).await.unwrap();

        let mut found = drain(&backend, "ns:*", 4).await;
        found.sort();
        assert_eq!(found.len(), 25);
        assert_eq!(found[0], "ns:00");
        assert_eq!(found[24], "ns:24");
    }

    #[tokio::test]
    async fn test_scan_page_can_be_empty_mid_scan() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                vec![
                    ("a:1".into(), Vec::new()),
                    ("a:2".into(), Vec::new()),
                    ("b:1".into(), Vec::new()),
                ],
                None,
            )
            .await
            .unwrap();

        let page = backend.scan_page(&ScanCursor::start(), "b:*", 2).await.unwrap();
        assert!(page.keys.is_empty());
        assert!(!page.cursor.is_terminal());

        let page = backend.scan_page(&page.cursor, "b:*", 2).await.unwrap();
        assert_eq!(page.keys, keys(&["b:1"]));
        assert!(page.cursor.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                vec![("expiring".into(), b"value".to_vec())],
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        let value = backend.get_many(&keys(&["expiring"])).await.unwrap();
        assert!(value[0].is_some());

        tokio::time::advance(Duration::from_secs(2)).await;

        let value = backend.get_many(&keys(&["expiring"])).await.unwrap();
        assert!(value[0].is_none());
        assert!(drain(&backend, "*", 10).await.is_empty());
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_removed_on_read_and_scan() {
        let backend = MemoryBackend::new();
        let entries: Vec<(String, Vec<u8>)> =
            (0..50).map(|i| (format!("k{i:02}"), Vec::new())).collect();
        backend
            .set_many(entries, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        backend
            .set_many(vec![("live".into(), b"v".to_vec())], None)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        let values = backend.get_many(&keys(&["k00", "k01"])).await.unwrap();
        assert_eq!(values, vec![None, None]);
        assert_eq!(backend.len(), 49);

        assert_eq!(drain(&backend, "*", 100).await, keys(&["live"]));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_clears_untouched_entries() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                vec![("a".into(), Vec::new()), ("b".into(), Vec::new())],
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        backend
            .set_many(vec![("c".into(), Vec::new())], None)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(backend.purge_expired(), 2);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_without_ttl_clears_expiry() {
        let backend = MemoryBackend::new();
        backend
            .set_many(vec![("k".into(), b"v1".to_vec())], Some(Duration::from_secs(1)))
            .await
            .unwrap();
        backend
            .set_many(vec![("k".into(), b"v2".to_vec())], None)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        let value = backend.get_many(&keys(&["k"])).await.unwrap();
        assert_eq!(value, vec![Some(b"v2".to_vec())]);
    }

    #[tokio::test]
    async fn test_close_twice_fails() {
        let backend = MemoryBackend::new();
        backend.close().await.unwrap();
        assert!(backend.is_closed());
        assert!(backend.close().await.is_err());
        assert!(backend.get_many(&keys(&["a"])).await.is_err());
    }
}
