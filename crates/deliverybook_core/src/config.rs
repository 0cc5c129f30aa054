//! Fixed tuning constants for the directory.
//!
//! The values are compile-time defaults; [`DirectoryConfig`] only exists so
//! tests and embedders can shorten the idle grace period or page size.

use std::time::Duration;

/// Minimum query length (in characters) that activates search.
pub const MIN_QUERY_LENGTH: usize = 3;
/// Rows per search page.
pub const PAGE_SIZE: u32 = 20;
/// Recency entries shown on the contact list screen.
pub const RECENT_LIMIT: u32 = 30;
/// Recency limit used when a caller does not specify one.
pub const DEFAULT_RECENT_LIMIT: u32 = 10;
/// How long live scans keep running after their last subscriber leaves.
pub const SUBSCRIPTION_GRACE: Duration = Duration::from_secs(5);
/// Database file name used when no path is given.
pub const DB_FILE_NAME: &str = "delivery_book.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub min_query_length: usize,
    pub page_size: u32,
    pub recent_limit: u32,
    pub subscription_grace: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            min_query_length: MIN_QUERY_LENGTH,
            page_size: PAGE_SIZE,
            recent_limit: RECENT_LIMIT,
            subscription_grace: SUBSCRIPTION_GRACE,
        }
    }
}

impl DirectoryConfig {
    /// Whether `query` is long enough to reach the store.
    pub fn is_search_active(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_length
    }
}

#[cfg(test)]
mod tests {
    use super::DirectoryConfig;

    #[test]
    fn activation_threshold_counts_characters() {
        let config = DirectoryConfig::default();
        assert!(!config.is_search_active("Jo"));
        assert!(config.is_search_active("Jor"));
        // Two characters, four bytes.
        assert!(!config.is_search_active("ñü"));
        assert!(config.is_search_active("ñüé"));
    }
}
