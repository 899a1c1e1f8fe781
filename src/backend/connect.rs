//! Building backends from connection URLs.
//!
//! Supported schemes:
//!
//! - `memory://` - a fresh [`MemoryBackend`]
//! - `redb:///absolute/path.redb` or `redb:relative/path.redb` - a [`RedbBackend`]

use std::path::PathBuf;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use url::Url;

use super::client::BackendClient;
use super::memory::MemoryBackend;
use super::redb::RedbBackend;
use crate::error::{Error, Result};

/// Parsed backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendUrl {
    /// Process-local memory backend.
    Memory,
    /// Redb database file.
    Redb(PathBuf),
}

impl BackendUrl {
    /// Parses a connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the URL is malformed, uses an
    /// unsupported scheme, or a redb URL names no file.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| Error::configuration(format!("invalid backend URL '{raw}': {e}")))?;

        match url.scheme() {
            "memory" => Ok(Self::Memory),
            "redb" => {
                // Relative paths arrive in the host for `redb://dir/file` and
                // in the path for `redb:dir/file`.
                let mut path = String::new();
                if let Some(host) = url.host_str() {
                    path.push_str(host);
                }
                path.push_str(url.path());

                if path.is_empty() || path.ends_with('/') {
                    return Err(Error::configuration(format!(
                        "backend URL '{raw}' does not name a database file"
                    )));
                }
                let path = percent_decode_str(&path).decode_utf8().map_err(|e| {
                    Error::configuration(format!("backend URL '{raw}' has an invalid path: {e}"))
                })?;
                Ok(Self::Redb(PathBuf::from(path.as_ref())))
            },
            other => Err(Error::configuration(format!(
                "unsupported backend scheme '{other}' in '{raw}' (expected memory or redb)"
            ))),
        }
    }

    /// Opens a connection to this backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the backend cannot be opened.
    pub async fn connect(&self) -> Result<Arc<dyn BackendClient>> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryBackend::new())),
            Self::Redb(path) => {
                let path = path.clone();
                let backend = tokio::task::spawn_blocking(move || RedbBackend::open(path))
                    .await
                    .map_err(|e| Error::backend("connect", e))?
                    .map_err(|e| Error::backend("connect", e))?;
                Ok(Arc::new(backend))
            },
        }
    }
}

/// Parses `raw` and opens the backend it names.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for unusable URLs and
/// [`Error::BackendUnavailable`] if the backend cannot be opened.
pub async fn connect(raw: &str) -> Result<Arc<dyn BackendClient>> {
    let target = BackendUrl::parse(raw)?;
    tracing::debug!(url = raw, "Connecting backend");
    target.connect().await
}
