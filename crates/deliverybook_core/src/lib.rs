//! Core of the DeliveryBook contact directory.
//!
//! A keyed contact store with per-contact neighbor lists, a recency list,
//! paged "latest query wins" substring search, and a composer that joins the
//! list screen's live state into one snapshot.

pub mod clock;
pub mod composer;
pub mod config;
pub mod db;
pub mod directory;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use composer::list_model::ContactsListModel;
pub use composer::snapshot::{StateComposer, UiSnapshot};
pub use config::DirectoryConfig;
pub use directory::Directory;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{Contact, ContactId, ContactValidationError};
pub use repo::contact_repo::{
    ContactPage, ContactRepository, ContactSearch, RepoError, RepoResult, SearchCursor,
    SqliteContactRepository,
};
pub use search::pipeline::{PageSource, SearchPipeline, SearchResults, SearchStatus};
pub use service::contact_service::{ContactDraft, ContactService};
pub use service::neighbor_service::NeighborService;
pub use service::recency_service::RecencyService;
pub use store::{
    settled, ContactStore, LiveValue, MutationOutcome, Shared, SkipReason, StoreError,
    StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
