//! Logical to physical key translation.

use std::borrow::Cow;

use crate::backend::pattern;
use crate::error::{Error, Result};

/// Separator between a namespace and a logical key.
pub const SEPARATOR: char = ':';

/// The namespace half of the key mapping.
///
/// With a namespace `ns`, logical key `k` is stored as `ns:k`. With an empty
/// namespace keys are stored unchanged.
///
/// Namespaces may not contain the separator: `a` + `b:c` and `a:b` + `c`
/// would otherwise name the same physical key. Logical keys are not
/// restricted, since stripping a fixed `ns:` prefix is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// Creates the key space for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the namespace contains the separator.
    pub fn new(namespace: &str) -> Result<Self> {
        if namespace.contains(SEPARATOR) {
            return Err(Error::configuration(format!(
                "namespace '{namespace}' must not contain '{SEPARATOR}'"
            )));
        }

        let prefix = if namespace.is_empty() {
            String::new()
        } else {
            format!("{namespace}{SEPARATOR}")
        };
        Ok(Self { prefix })
    }

    /// Returns the namespace without the separator.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.prefix.strip_suffix(SEPARATOR).unwrap_or("")
    }

    /// Maps a logical key to the key stored in the backend.
    #[must_use]
    pub fn to_physical(&self, key: &str) -> String {
        let mut physical = String::with_capacity(self.prefix.len() + key.len());
        physical.push_str(&self.prefix);
        physical.push_str(key);
        physical
    }

    /// Maps a batch of logical keys, preserving order.
    #[must_use]
    pub fn to_physical_all<S: AsRef<str>>(&self, keys: &[S]) -> Vec<String> {
        keys.iter().map(|k| self.to_physical(k.as_ref())).collect()
    }

    /// Strips the namespace prefix from a backend key.
    ///
    /// A key outside the namespace comes back unchanged as `Err`, so callers
    /// can still surface it.
    pub fn to_logical<'k>(&self, physical: &'k str) -> std::result::Result<&'k str, &'k str> {
        physical.strip_prefix(self.prefix.as_str()).ok_or(physical)
    }

    /// Builds the backend match pattern for keys whose logical form starts
    /// with `prefix`.
    #[must_use]
    pub fn scan_pattern(&self, prefix: Option<&str>) -> String {
        let literal: Cow<'_, str> = match prefix {
            Some(p) => Cow::Owned(self.to_physical(p)),
            None => Cow::Borrowed(&self.prefix),
        };
        format!("{}*", pattern::escape(&literal))
    }
}
