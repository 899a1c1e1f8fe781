//! Shared defaults.

/// Keys examined per backend scan page unless configured otherwise.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

/// Page sizes above this make single scan calls slow on large keyspaces.
pub const LARGE_SCAN_PAGE_SIZE: usize = 10_000;
