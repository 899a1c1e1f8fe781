//! Configuration for building a [`NamespacedStore`](crate::NamespacedStore).
//!
//! Settings can come from a TOML file:
//!
//! ```toml
//! url = "redb:///var/lib/app/kv.redb"
//! namespace = "results"
//! ttl_seconds = 3600
//! scan_page_size = 100
//! ```
//!
//! Every field is optional. A missing `url` means the caller must supply a
//! backend handle (or, for the CLI, a `--url` flag).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::backend::BackendUrl;
use crate::constants;
use crate::store::SEPARATOR;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Store construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend connection URL (`memory://`, `redb://<path>`).
    #[serde(default)]
    pub url: Option<String>,
    /// Namespace prefix; empty disables prefixing.
    #[serde(default)]
    pub namespace: String,
    /// Expiry applied to every write.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    /// Keys examined per scan page.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

fn default_scan_page_size() -> usize {
    constants::DEFAULT_SCAN_PAGE_SIZE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            namespace: String::new(),
            ttl_seconds: None,
            scan_page_size: default_scan_page_size(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types or are unknown
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Unparseable or unsupported backend URL
    /// - Namespace containing the separator
    /// - Zero TTL or zero scan page size
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Backend URL
        match &self.url {
            Some(url) => {
                if let Err(e) = BackendUrl::parse(url) {
                    errors.push(e.to_string());
                }
            },
            None => warnings.push(
                "No backend url configured\n  \
                 A backend handle must be supplied in code"
                    .to_string(),
            ),
        }

        // 2. Namespace
        if self.namespace.contains(SEPARATOR) {
            errors.push(format!(
                "namespace '{}' must not contain '{SEPARATOR}'",
                self.namespace
            ));
        }
        if self.namespace.is_empty() {
            warnings.push(
                "namespace is empty; keys are stored without a prefix\n  \
                 Recommendation: set a namespace when the backend is shared"
                    .to_string(),
            );
        }

        // 3. Expiry
        if self.ttl_seconds == Some(0) {
            errors.push("ttl_seconds cannot be 0. Omit it to disable expiry".to_string());
        }

        // 4. Scan page size
        if self.scan_page_size == 0 {
            errors.push(format!(
                "scan_page_size cannot be 0 (default: {})",
                constants::DEFAULT_SCAN_PAGE_SIZE
            ));
        } else if self.scan_page_size > constants::LARGE_SCAN_PAGE_SIZE {
            warnings.push(format!(
                "scan_page_size {} is very large\n  \
                 Each scan call may block the backend for a long time",
                self.scan_page_size
            ));
        }

        if !errors.is_empty() {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
        }

        Ok(ValidationResult { warnings })
    }
}
