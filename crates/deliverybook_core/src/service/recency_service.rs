//! Recently-searched contacts.
//!
//! # Responsibility
//! - Stamp contacts with the time they were opened from search.
//! - Remove single entries or clear the whole recency list.
//! - Expose the list as a live, shared subscription.
//!
//! # Invariants
//! - Removing from recents never deletes the contact itself.
//! - Unknown ids are a no-op for every mutation.

use crate::clock::Clock;
use crate::model::contact::Contact;
use crate::store::{ContactStore, LiveValue, MutationOutcome, Shared, StoreResult};
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// Recency tracker over the shared store.
#[derive(Clone)]
pub struct RecencyService {
    store: ContactStore,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

impl RecencyService {
    /// `grace` is how long a live list keeps running without subscribers.
    pub fn new(store: ContactStore, clock: Arc<dyn Clock>, grace: Duration) -> Self {
        Self {
            store,
            clock,
            grace,
        }
    }

    /// Marks `id` as accessed now, according to the injected clock.
    pub async fn mark_accessed(&self, id: &str) -> StoreResult<MutationOutcome> {
        self.mark_accessed_at(id, self.clock.now_millis()).await
    }

    /// Marks `id` as accessed at `timestamp_ms`.
    pub async fn mark_accessed_at(
        &self,
        id: &str,
        timestamp_ms: i64,
    ) -> StoreResult<MutationOutcome> {
        self.store.set_last_accessed(id, Some(timestamp_ms)).await
    }

    /// Drops `id` from the recency list; the contact itself survives.
    pub async fn remove(&self, id: &str) -> StoreResult<MutationOutcome> {
        self.store.set_last_accessed(id, None).await
    }

    /// Clears the whole recency list; returns how many entries were removed.
    pub async fn clear_all(&self) -> StoreResult<usize> {
        let cleared = self.store.clear_all_last_accessed().await?;
        info!("event=recent_clear module=service status=ok cleared={cleared}");
        Ok(cleared)
    }

    /// Live recency list, newest first, at most `limit` entries.
    pub fn list(&self, limit: u32) -> Shared<LiveValue<Vec<Contact>>> {
        self.store.observe_recent(limit, self.grace)
    }
}
