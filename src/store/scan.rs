//! Cursor-driven key enumeration.

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, warn};

use super::NamespacedStore;
use crate::backend::ScanCursor;
use crate::error::{Error, Result};

/// Lazy enumeration of logical keys in one namespace.
///
/// Each call to [`NamespacedStore::scan_keys`] returns a fresh `KeyScan`
/// that starts from the initial cursor. Pages are fetched one at a time with
/// [`KeyScan::next_batch`] until the backend hands back the terminal cursor.
///
/// This is not a snapshot. Keys written or removed while the scan runs may
/// be missed or reported twice; keys present for the whole scan are reported
/// at least once.
pub struct KeyScan<'s> {
    store: &'s NamespacedStore,
    pattern: String,
    cursor: ScanCursor,
    finished: bool,
}

impl<'s> KeyScan<'s> {
    pub(super) fn new(store: &'s NamespacedStore, pattern: String) -> Self {
        Self {
            store,
            pattern,
            cursor: ScanCursor::start(),
            finished: false,
        }
    }

    /// Backend match pattern this scan uses.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Cursor the next page will be requested with.
    #[must_use]
    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    /// Returns true once the backend has reported the end of the scan.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetches the next page of logical keys.
    ///
    /// Returns `Ok(None)` once the scan is complete. A page may be empty
    /// while the scan continues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the page request fails. The
    /// cursor is left unchanged, so the same page can be requested again.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .store
            .backend
            .scan_page(&self.cursor, &self.pattern, self.store.scan_page_size)
            .await
            .map_err(|e| Error::backend("scan_keys", e))?;

        debug!(
            namespace = self.store.namespace(),
            cursor = %self.cursor,
            next = %page.cursor,
            count = page.keys.len(),
            "Scanned key page"
        );

        let keys = page
            .keys
            .into_iter()
            .map(|physical| match self.store.keys.to_logical(&physical) {
                Ok(logical) => logical.to_string(),
                Err(_) => {
                    warn!(
                        namespace = self.store.namespace(),
                        key = %physical,
                        "Backend returned a key outside the namespace"
                    );
                    physical
                },
            })
            .collect();

        self.finished = page.cursor.is_terminal();
        self.cursor = page.cursor;
        Ok(Some(keys))
    }

    /// Drains the scan into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first backend failure.
    pub async fn collect_keys(mut self) -> Result<Vec<String>> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            all.extend(batch);
        }
        Ok(all)
    }

    /// Converts the scan into a stream of logical keys.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<String>> + 's {
        stream::try_unfold(self, |mut scan| async move {
            Ok::<_, Error>(scan.next_batch().await?.map(|batch| (batch, scan)))
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
    }
}
