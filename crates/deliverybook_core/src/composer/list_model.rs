//! Intent handling for the contact list screen.
//!
//! # Responsibility
//! - Feed query text into the snapshot and the search pipeline.
//! - Route recency intents to the recency service and toggle edit mode.
//!
//! # Invariants
//! - Edit mode only leaves `true` through an explicit exit or a successful
//!   clear of the whole recency list.
//! - The search pipeline follows the same query cell the snapshot shows.

use crate::composer::snapshot::{StateComposer, UiSnapshot};
use crate::config::DirectoryConfig;
use crate::search::pipeline::{SearchPipeline, SearchResults};
use crate::service::recency_service::RecencyService;
use crate::store::{ContactStore, MutationOutcome, StoreResult};
use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// State holder behind the contact list screen.
pub struct ContactsListModel {
    composer: StateComposer,
    search: SearchPipeline,
    recency: RecencyService,
    query_follower: JoinHandle<()>,
}

impl ContactsListModel {
    /// Wires the model over `store`. Must be called within a tokio runtime.
    pub fn new(store: ContactStore, recency: RecencyService, config: DirectoryConfig) -> Self {
        let composer = StateComposer::new(
            config.clone(),
            recency.list(config.recent_limit),
            store.observe_count(config.subscription_grace),
        );
        let search = SearchPipeline::new(store, config);
        let query_follower = search.follow(composer.queries());
        Self {
            composer,
            search,
            recency,
            query_follower,
        }
    }

    pub fn snapshot(&self) -> watch::Receiver<UiSnapshot> {
        self.composer.subscribe()
    }

    pub fn search_results(&self) -> watch::Receiver<SearchResults> {
        self.search.subscribe()
    }

    /// Requests the next search page; see [`SearchPipeline::load_more`].
    pub fn load_more(&self) -> bool {
        self.search.load_more()
    }

    /// Re-runs the current query from its first page.
    pub fn refresh(&self) -> u64 {
        self.search.refresh()
    }

    pub fn on_query_change(&self, text: impl Into<String>) {
        self.composer.set_query(text);
    }

    /// A search result was opened: it moves to the top of the recency list.
    pub async fn on_contact_clicked(&self, id: &str) -> StoreResult<MutationOutcome> {
        self.recency.mark_accessed(id).await
    }

    pub fn on_recent_long_press(&self) {
        debug!("event=recent_edit_mode module=composer status=ok enabled=true");
        self.composer.set_edit_mode(true);
    }

    pub fn on_exit_recent_edit_mode(&self) {
        debug!("event=recent_edit_mode module=composer status=ok enabled=false");
        self.composer.set_edit_mode(false);
    }

    pub async fn on_remove_from_recent(&self, id: &str) -> StoreResult<MutationOutcome> {
        self.recency.remove(id).await
    }

    /// Clears every recency entry and leaves edit mode on success.
    ///
    /// On failure edit mode is kept so the user can retry.
    pub async fn on_clear_all_recents(&self) -> StoreResult<usize> {
        let cleared = self.recency.clear_all().await?;
        self.composer.set_edit_mode(false);
        Ok(cleared)
    }
}

impl Drop for ContactsListModel {
    fn drop(&mut self) {
        self.query_follower.abort();
    }
}
