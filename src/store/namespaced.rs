//! `NamespacedStore` and its builder.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::keys::KeySpace;
use super::scan::KeyScan;
use crate::backend::{self, BackendClient};
use crate::config::StoreConfig;
use crate::constants;
use crate::error::{Error, Result};

/// Who is responsible for closing the backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ownership {
    /// Built from a URL by the store; closed by [`NamespacedStore::close`].
    Owned,
    /// Supplied by the caller; never closed by the store.
    Borrowed,
}

/// Namespaced, TTL-aware view over a scanning backend.
///
/// Every logical key is stored as `namespace:key`, so independent
/// subsystems can share one backend without collisions. Reads and scans
/// strip the prefix again.
///
/// # Batches
///
/// `get_many`, `set_many` and `delete_many` each issue exactly one backend
/// request. Batches are best effort, not transactions: when a write batch
/// fails, some of its keys may already be stored. Callers that need
/// all-or-nothing semantics must build them on top.
///
/// # Expiry
///
/// A TTL fixed at construction applies to every write. Without one, writes
/// never expire and overwriting a key clears any expiry it had.
///
/// # Lifecycle
///
/// [`close`](Self::close) consumes the store. Share a store across tasks
/// behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// let store = NamespacedStore::builder()
///     .url("redb:///var/lib/app/kv.redb")
///     .namespace("results")
///     .ttl_seconds(3600)
///     .build()
///     .await?;
///
/// store.set_many([("job:1", b"done".to_vec())]).await?;
/// let values = store.get_many(&["job:1", "job:2"]).await?;
/// store.close().await?;
/// ```
pub struct NamespacedStore {
    pub(super) backend: Arc<dyn BackendClient>,
    pub(super) keys: KeySpace,
    pub(super) scan_page_size: usize,
    ttl: Option<Duration>,
    ownership: Ownership,
}

impl NamespacedStore {
    /// Starts building a store.
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Creates a store over a caller-owned backend handle.
    ///
    /// The store never closes `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero TTL or a namespace
    /// containing the separator.
    pub fn new(
        backend: Arc<dyn BackendClient>,
        namespace: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<Self> {
        let keys = KeySpace::new(namespace)?;
        let ttl = ttl_from_seconds(ttl_seconds)?;
        Ok(Self {
            backend,
            keys,
            scan_page_size: constants::DEFAULT_SCAN_PAGE_SIZE,
            ttl,
            ownership: Ownership::Borrowed,
        })
    }

    /// Builds a store from loaded configuration, connecting to its URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is unusable and
    /// [`Error::BackendUnavailable`] if the backend cannot be opened.
    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .namespace(&config.namespace)
            .scan_page_size(config.scan_page_size);
        if let Some(url) = &config.url {
            builder = builder.url(url);
        }
        if let Some(ttl) = config.ttl_seconds {
            builder = builder.ttl_seconds(ttl);
        }
        builder.build().await
    }

    /// Returns the namespace (empty when keys are not prefixed).
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    /// Returns the expiry applied to every write.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns true if `close` releases the backend connection.
    #[must_use]
    pub fn owns_backend(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    /// Reads a batch of keys in one backend round trip.
    ///
    /// The result has one slot per key, in input order. Missing keys are
    /// `None`; a stored empty value is `Some(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the backend fails. A missing
    /// key is never an error.
    pub async fn get_many<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let physical = self.keys.to_physical_all(keys);
        let values = self
            .backend
            .get_many(&physical)
            .await
            .map_err(|e| Error::backend("get_many", e))?;

        if values.len() != physical.len() {
            return Err(Error::backend(
                "get_many",
                anyhow::anyhow!(
                    "backend returned {} values for {} keys",
                    values.len(),
                    physical.len()
                ),
            ));
        }

        debug!(
            namespace = self.namespace(),
            count = physical.len(),
            hits = values.iter().filter(|v| v.is_some()).count(),
            "get_many"
        );
        Ok(values)
    }

    /// Writes a batch of entries in one backend round trip.
    ///
    /// An empty batch makes no backend call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the backend fails. Part of
    /// the batch may have been written when this happens.
    pub async fn set_many<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Vec<u8>>,
    {
        let entries: Vec<(String, Vec<u8>)> = entries
            .into_iter()
            .map(|(key, value)| (self.keys.to_physical(key.as_ref()), value.into()))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        let count = entries.len();
        self.backend
            .set_many(entries, self.ttl)
            .await
            .map_err(|e| Error::backend("set_many", e))?;

        debug!(
            namespace = self.namespace(),
            count,
            ttl_secs = self.ttl.map(|t| t.as_secs()),
            "set_many"
        );
        Ok(())
    }

    /// Deletes a batch of keys in one backend round trip.
    ///
    /// An empty batch makes no backend call. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the backend fails.
    pub async fn delete_many<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let physical = self.keys.to_physical_all(keys);
        self.backend
            .delete_many(&physical)
            .await
            .map_err(|e| Error::backend("delete_many", e))?;

        debug!(namespace = self.namespace(), count = physical.len(), "delete_many");
        Ok(())
    }

    /// Enumerates logical keys, optionally restricted to a logical prefix.
    ///
    /// Nothing is fetched until the returned scan is polled. Every call
    /// starts a new, independent enumeration.
    #[must_use]
    pub fn scan_keys(&self, prefix: Option<&str>) -> KeyScan<'_> {
        KeyScan::new(self, self.keys.scan_pattern(prefix))
    }

    /// Closes the store.
    ///
    /// Releases the backend connection if the store opened it. A handle
    /// supplied by the caller is left open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the backend fails to close.
    pub async fn close(self) -> Result<()> {
        match self.ownership {
            Ownership::Owned => {
                self.backend
                    .close()
                    .await
                    .map_err(|e| Error::backend("close", e))?;
                debug!(namespace = self.namespace(), "Closed owned backend connection");
            },
            Ownership::Borrowed => {
                debug!(namespace = self.namespace(), "Released borrowed backend handle");
            },
        }
        Ok(())
    }
}

impl fmt::Debug for NamespacedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespacedStore")
            .field("namespace", &self.namespace())
            .field("ttl", &self.ttl)
            .field("scan_page_size", &self.scan_page_size)
            .field("ownership", &self.ownership)
            .finish_non_exhaustive()
    }
}

fn ttl_from_seconds(ttl_seconds: Option<u64>) -> Result<Option<Duration>> {
    match ttl_seconds {
        Some(0) => Err(Error::configuration("ttl_seconds must be a positive integer")),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}

/// Builder for [`NamespacedStore`].
///
/// Either [`backend`](Self::backend) or [`url`](Self::url) must be set. If
/// both are, the handle wins and the URL is ignored.
pub struct StoreBuilder {
    backend: Option<Arc<dyn BackendClient>>,
    url: Option<String>,
    namespace: String,
    ttl_seconds: Option<u64>,
    scan_page_size: usize,
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            backend: None,
            url: None,
            namespace: String::new(),
            ttl_seconds: None,
            scan_page_size: constants::DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

impl StoreBuilder {
    /// Uses a caller-owned backend handle. The store will not close it.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn BackendClient>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Connects to the backend at `url` on build. The store owns and closes
    /// that connection.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace. Empty (the default) disables prefixing.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the expiry applied to every write, in seconds.
    #[must_use]
    pub fn ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    /// Sets how many keys each scan page may examine.
    #[must_use]
    pub fn scan_page_size(mut self, scan_page_size: usize) -> Self {
        self.scan_page_size = scan_page_size;
        self
    }

    /// Validates the configuration and builds the store.
    ///
    /// Namespace, TTL and page size are checked before any connection is
    /// attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if:
    /// - neither a backend handle nor a URL was given
    /// - the TTL is zero
    /// - the namespace contains the separator
    /// - the scan page size is zero
    /// - the URL is malformed or names an unsupported backend
    ///
    /// Returns [`Error::BackendUnavailable`] if connecting fails.
    pub async fn build(self) -> Result<NamespacedStore> {
        let keys = KeySpace::new(&self.namespace)?;
        let ttl = ttl_from_seconds(self.ttl_seconds)?;
        if self.scan_page_size == 0 {
            return Err(Error::configuration("scan_page_size must be at least 1"));
        }

        let (backend, ownership) = match (self.backend, self.url) {
            (Some(handle), url) => {
                if let Some(url) = url {
                    debug!(url = %url, "Backend handle supplied; ignoring connection URL");
                }
                (handle, Ownership::Borrowed)
            },
            (None, Some(url)) => (backend::connect(&url).await?, Ownership::Owned),
            (None, None) => {
                return Err(Error::configuration(
                    "either a backend handle or a connection URL is required",
                ));
            },
        };

        debug!(
            namespace = keys.namespace(),
            ttl_secs = ttl.map(|t| t.as_secs()),
            owned = ownership == Ownership::Owned,
            "Namespaced store ready"
        );

        Ok(NamespacedStore {
            backend,
            keys,
            scan_page_size: self.scan_page_size,
            ttl,
            ownership,
        })
    }
}
