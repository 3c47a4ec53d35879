//! Defaults shared by the data set explorer.

/// Rows shown per preview page.
pub const PAGE_SIZE: u64 = 15;

/// Requests allowed in flight at once, so the database is not hit by too many parallel queries.
pub const MAX_CONCURRENT_REQUESTS: usize = 3;

/// Quiet period after the last keystroke before a typed filter value is applied.
pub const FILTER_INPUT_DEBOUNCE_MS: u64 = 2000;

/// Shown in place of content when there is nothing to show.
pub const NO_DATA_MARKER: &str = "∅";
