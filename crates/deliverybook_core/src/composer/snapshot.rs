//! Broadcast join of the list screen's state sources.
//!
//! # Invariants
//! - Every emitted snapshot carries the latest value of all four sources,
//!   including the ones that did not just change.
//! - `search_active` is derived from the query length, never stored.
//! - Storage faults surface as `storage_fault`, separate from an empty list.

use crate::config::DirectoryConfig;
use crate::model::contact::Contact;
use crate::store::{LiveValue, Shared};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable view of the list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiSnapshot {
    pub query_text: String,
    pub recent_contacts: Vec<Contact>,
    pub search_active: bool,
    pub edit_mode: bool,
    pub total_count: u64,
    /// Message of the latest storage fault seen by a live source.
    pub storage_fault: Option<String>,
}

impl UiSnapshot {
    /// Builds a snapshot from the latest value of every source.
    pub fn compose(
        config: &DirectoryConfig,
        query_text: String,
        recent: &LiveValue<Vec<Contact>>,
        edit_mode: bool,
        count: &LiveValue<u64>,
    ) -> Self {
        let storage_fault = recent
            .fault()
            .or_else(|| count.fault())
            .map(|err| err.to_string());
        Self {
            search_active: config.is_search_active(&query_text),
            query_text,
            recent_contacts: recent.ready().cloned().unwrap_or_default(),
            edit_mode,
            total_count: count.ready().copied().unwrap_or(0),
            storage_fault,
        }
    }
}

/// Owns the query and edit-mode cells and publishes joined snapshots.
#[derive(Clone)]
pub struct StateComposer {
    query: Arc<watch::Sender<String>>,
    edit_mode: Arc<watch::Sender<bool>>,
    snapshot: Shared<UiSnapshot>,
}

impl StateComposer {
    /// `recent` and `count` are subscribed only while the snapshot itself
    /// has subscribers.
    pub fn new(
        config: DirectoryConfig,
        recent: Shared<LiveValue<Vec<Contact>>>,
        count: Shared<LiveValue<u64>>,
    ) -> Self {
        let query = Arc::new(watch::channel(String::new()).0);
        let edit_mode = Arc::new(watch::channel(false).0);
        let grace = config.subscription_grace;

        let sources = (Arc::clone(&query), Arc::clone(&edit_mode), recent, count);
        let snapshot = Shared::new("ui_snapshot", UiSnapshot::default(), grace, move |tx| {
            let (query, edit_mode, recent, count) = sources.clone();
            let config = config.clone();
            async move {
                let mut query = query.subscribe();
                let mut edit_mode = edit_mode.subscribe();
                let mut recent = recent.subscribe();
                let mut count = count.subscribe();
                loop {
                    let query_text = query.borrow_and_update().clone();
                    let editing = *edit_mode.borrow_and_update();
                    let recent_value = recent.borrow_and_update().clone();
                    let count_value = count.borrow_and_update().clone();
                    tx.send_replace(UiSnapshot::compose(
                        &config,
                        query_text,
                        &recent_value,
                        editing,
                        &count_value,
                    ));

                    let open = tokio::select! {
                        changed = query.changed() => changed.is_ok(),
                        changed = edit_mode.changed() => changed.is_ok(),
                        changed = recent.changed() => changed.is_ok(),
                        changed = count.changed() => changed.is_ok(),
                    };
                    if !open {
                        return;
                    }
                }
            }
        });

        Self {
            query,
            edit_mode,
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiSnapshot> {
        self.snapshot.subscribe()
    }

    /// Replaces the query text; unchanged text does not re-emit.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.query.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }

    /// Stream of query text, for driving the search pipeline.
    pub fn queries(&self) -> watch::Receiver<String> {
        self.query.subscribe()
    }

    pub fn set_edit_mode(&self, enabled: bool) {
        self.edit_mode.send_if_modified(|current| {
            let changed = *current != enabled;
            *current = enabled;
            changed
        });
    }

    pub fn edit_mode(&self) -> bool {
        *self.edit_mode.borrow()
    }
}
