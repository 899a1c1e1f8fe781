//! Scan pattern and cursor helpers shared by the bundled backends.
//!
//! Match patterns are globs (`*`, `?`, `[...]`). Literal text is escaped by
//! wrapping metacharacters in brackets (`*` becomes `[*]`), which means the
//! same thing to Redis-style matchers.
//!
//! Ordered backends encode their cursor as `k` followed by the hex form of
//! the last examined key, so a live cursor can never collide with the
//! terminal `"0"` or the empty string.

use anyhow::{Context, Result};
use glob::Pattern;

use super::client::ScanCursor;

const CURSOR_TAG: char = 'k';

/// Escapes `literal` so it only matches itself inside a glob pattern.
#[must_use]
pub fn escape(literal: &str) -> String {
    Pattern::escape(literal)
}

/// Compiled scan match pattern.
#[derive(Debug, Clone)]
pub struct KeyMatcher {
    pattern: Pattern,
}

impl KeyMatcher {
    /// Compiles a glob match pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid glob.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("Invalid scan match pattern '{pattern}'"))?;
        Ok(Self { pattern })
    }

    /// Returns true if `key` matches the pattern.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches(key)
    }
}

/// Builds the cursor that resumes a scan after `last_key`.
#[must_use]
pub fn resume_after(last_key: &str) -> ScanCursor {
    ScanCursor::new(format!("{CURSOR_TAG}{}", hex::encode(last_key)))
}

/// Decodes a cursor into the key to resume after.
///
/// Returns `None` for the start cursor.
///
/// # Errors
///
/// Returns an error if the cursor was not produced by [`resume_after`].
pub fn resume_key(cursor: &ScanCursor) -> Result<Option<String>> {
    if cursor.is_terminal() {
        return Ok(None);
    }

    let encoded = cursor
        .as_str()
        .strip_prefix(CURSOR_TAG)
        .with_context(|| format!("Unknown scan cursor '{cursor}'"))?;
    let bytes =
        hex::decode(encoded).with_context(|| format!("Malformed scan cursor '{cursor}'"))?;
    let key = String::from_utf8(bytes)
        .with_context(|| format!("Scan cursor '{cursor}' does not hold a UTF-8 key"))?;

    Ok(Some(key))
}
