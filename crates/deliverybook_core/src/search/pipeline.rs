//! Paged, cancelable search pipeline ("latest query wins").
//!
//! # Responsibility
//! - Track the current query and the pages loaded for it.
//! - Fetch pages on demand through a [`PageSource`].
//! - Cancel superseded fetches and discard anything they might still return.
//!
//! # Invariants
//! - Every query change bumps the generation; a page is only published when
//!   its generation is still current, checked under the state lock.
//! - Queries shorter than the activation threshold never reach the source.
//! - At most one page fetch is in flight at a time.
//! - A failed page, including the first one, is re-requested by the next
//!   `load_more`.

use crate::config::DirectoryConfig;
use crate::model::contact::Contact;
use crate::repo::contact_repo::{ContactPage, ContactSearch, SearchCursor};
use crate::store::{ContactStore, StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// Anything that can serve one page of substring matches.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    async fn fetch_page(&self, search: ContactSearch) -> StoreResult<ContactPage>;
}

#[async_trait]
impl PageSource for ContactStore {
    async fn fetch_page(&self, search: ContactSearch) -> StoreResult<ContactPage> {
        self.search(search).await
    }
}

/// Where the current query's result set stands.
#[derive(Debug, Clone)]
pub enum SearchStatus {
    /// The query is below the activation threshold; results are empty and
    /// final.
    Idle,
    /// A page fetch is in flight.
    Loading,
    /// Loaded pages are shown and more can be requested.
    MoreAvailable,
    /// Every matching contact has been loaded.
    Complete,
    /// The last page fetch hit a storage fault.
    Failed(Arc<StoreError>),
}

impl SearchStatus {
    /// Whether no further pages will arrive without a new request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle | Self::Complete | Self::Failed(_))
    }
}

/// Published view of the current query's results.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Generation of the query these results belong to.
    pub generation: u64,
    pub query: String,
    pub items: Vec<Contact>,
    pub status: SearchStatus,
}

impl SearchResults {
    fn idle() -> Self {
        Self {
            generation: 0,
            query: String::new(),
            items: Vec::new(),
            status: SearchStatus::Idle,
        }
    }
}

struct PipelineState {
    generation: u64,
    query: String,
    items: Vec<Contact>,
    next_cursor: Option<SearchCursor>,
    status: SearchStatus,
    in_flight: Option<AbortHandle>,
    /// Position of the page whose fetch failed; `Some(None)` is the first page.
    failed_page: Option<Option<SearchCursor>>,
}

impl PipelineState {
    fn results(&self) -> SearchResults {
        SearchResults {
            generation: self.generation,
            query: self.query.clone(),
            items: self.items.clone(),
            status: self.status.clone(),
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

struct PipelineInner<S> {
    source: S,
    config: DirectoryConfig,
    state: Mutex<PipelineState>,
    results: watch::Sender<SearchResults>,
}

/// Search pipeline over a page source (the store by default).
pub struct SearchPipeline<S: PageSource = ContactStore> {
    inner: Arc<PipelineInner<S>>,
}

impl<S: PageSource> Clone for SearchPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PageSource> SearchPipeline<S> {
    pub fn new(source: S, config: DirectoryConfig) -> Self {
        let (results, _rx) = watch::channel(SearchResults::idle());
        Self {
            inner: Arc::new(PipelineInner {
                source,
                config,
                state: Mutex::new(PipelineState {
                    generation: 0,
                    query: String::new(),
                    items: Vec::new(),
                    next_cursor: None,
                    status: SearchStatus::Idle,
                    in_flight: None,
                    failed_page: None,
                }),
                results,
            }),
        }
    }

    /// Live result stream; always holds the newest query's state.
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.inner.results.subscribe()
    }

    pub fn current(&self) -> SearchResults {
        self.inner.results.borrow().clone()
    }

    /// Switches to `query`, superseding any earlier one.
    ///
    /// Repeating the current query is a no-op. Returns the generation that
    /// now owns the result stream. Must be called within a tokio runtime.
    pub fn set_query(&self, query: impl Into<String>) -> u64 {
        let query = query.into();
        let mut state = self.inner.lock_state();
        if query == state.query && state.generation > 0 {
            return state.generation;
        }
        self.inner.restart(&mut state, query)
    }

    /// Re-runs the current query from its first page.
    pub fn refresh(&self) -> u64 {
        let mut state = self.inner.lock_state();
        let query = state.query.clone();
        self.inner.restart(&mut state, query)
    }

    /// Requests the next page of the current query, or retries the page
    /// that failed last.
    ///
    /// Returns `false` when nothing was requested: a fetch is already in
    /// flight, the result set is complete, or search is idle.
    pub fn load_more(&self) -> bool {
        let generation = self.inner.lock_state().generation;
        self.load_more_for(generation)
    }

    /// Requests the next page only if `generation` is still current.
    pub fn load_more_for(&self, generation: u64) -> bool {
        let mut state = self.inner.lock_state();
        if state.generation != generation || state.in_flight.is_some() {
            return false;
        }
        let after = match state.failed_page.take() {
            Some(after) => after,
            None => match state.next_cursor.clone() {
                Some(cursor) => Some(cursor),
                None => return false,
            },
        };
        state.status = SearchStatus::Loading;
        self.inner.publish(&state);
        self.inner.spawn_fetch(&mut state, after);
        true
    }

    /// Drives the pipeline from a stream of query text until it closes.
    pub fn follow(&self, mut queries: watch::Receiver<String>) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            loop {
                let query = queries.borrow_and_update().clone();
                pipeline.set_query(query);
                if queries.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

impl<S: PageSource> PipelineInner<S> {
    fn lock_state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn restart(self: &Arc<Self>, state: &mut PipelineState, query: String) -> u64 {
        state.cancel_in_flight();
        state.generation += 1;
        state.items.clear();
        state.next_cursor = None;
        state.failed_page = None;

        let active = self.config.is_search_active(&query);
        state.query = query;
        if active {
            state.status = SearchStatus::Loading;
            self.publish(state);
            self.spawn_fetch(state, None);
        } else {
            state.status = SearchStatus::Idle;
            self.publish(state);
        }
        debug!(
            "event=search_query module=search status=ok generation={} active={}",
            state.generation, active
        );
        state.generation
    }

    fn spawn_fetch(self: &Arc<Self>, state: &mut PipelineState, after: Option<SearchCursor>) {
        let generation = state.generation;
        let search = ContactSearch {
            text: state.query.clone(),
            after: after.clone(),
            page_size: self.config.page_size,
        };
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let page = inner.source.fetch_page(search).await;
            inner.deliver(generation, after, page);
        });
        state.in_flight = Some(handle.abort_handle());
    }

    fn deliver(
        &self,
        generation: u64,
        after: Option<SearchCursor>,
        page: StoreResult<ContactPage>,
    ) {
        let mut state = self.lock_state();
        if state.generation != generation {
            debug!(
                "event=search_page module=search status=discarded generation={generation} current={}",
                state.generation
            );
            return;
        }
        state.in_flight = None;

        match page {
            Ok(page) => {
                debug!(
                    "event=search_page module=search status=ok generation={generation} rows={}",
                    page.items.len()
                );
                state.items.extend(page.items);
                state.status = if page.next_cursor.is_some() {
                    SearchStatus::MoreAvailable
                } else {
                    SearchStatus::Complete
                };
                state.next_cursor = page.next_cursor;
            }
            Err(err) => {
                debug!("event=search_page module=search status=error generation={generation}");
                state.failed_page = Some(after);
                state.status = SearchStatus::Failed(Arc::new(err));
            }
        }
        self.publish(&state);
    }

    fn publish(&self, state: &PipelineState) {
        self.results.send_replace(state.results());
    }
}
