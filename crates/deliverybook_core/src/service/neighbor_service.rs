//! Index-addressed editing of a contact's neighbor list.
//!
//! # Responsibility
//! - Append, replace and remove neighbor entries by position.
//!
//! # Invariants
//! - Blank values are rejected before any store access.
//! - Every edit is one read-modify-write of the whole contact, serialized
//!   per id by the store, so concurrent edits never lose updates.
//! - Out-of-range indexes leave the contact untouched.

use crate::store::{ContactStore, MutationOutcome, SkipReason, StoreResult};
use log::debug;

/// Neighbor list editor backed by the shared store.
#[derive(Clone)]
pub struct NeighborService {
    store: ContactStore,
}

impl NeighborService {
    pub fn new(store: ContactStore) -> Self {
        Self { store }
    }

    /// Appends `value` (trimmed) to the end of the list.
    pub async fn add_neighbor(&self, id: &str, value: &str) -> StoreResult<MutationOutcome> {
        let Some(value) = normalize_neighbor(value) else {
            return Ok(skipped("neighbor_add", SkipReason::BlankValue));
        };
        let outcome = self
            .store
            .modify(id, move |contact| {
                contact.neighbors.push(value);
                Ok(())
            })
            .await?;
        Ok(logged("neighbor_add", outcome))
    }

    /// Replaces the entry at `index`, keeping every other position.
    pub async fn update_neighbor(
        &self,
        id: &str,
        index: usize,
        value: &str,
    ) -> StoreResult<MutationOutcome> {
        let Some(value) = normalize_neighbor(value) else {
            return Ok(skipped("neighbor_update", SkipReason::BlankValue));
        };
        let outcome = self
            .store
            .modify(id, move |contact| {
                let len = contact.neighbors.len();
                let slot = contact
                    .neighbors
                    .get_mut(index)
                    .ok_or(SkipReason::IndexOutOfRange { index, len })?;
                *slot = value;
                Ok(())
            })
            .await?;
        Ok(logged("neighbor_update", outcome))
    }

    /// Removes the entry at `index`; later entries shift down by one.
    pub async fn delete_neighbor(&self, id: &str, index: usize) -> StoreResult<MutationOutcome> {
        let outcome = self
            .store
            .modify(id, move |contact| {
                let len = contact.neighbors.len();
                if index >= len {
                    return Err(SkipReason::IndexOutOfRange { index, len });
                }
                contact.neighbors.remove(index);
                Ok(())
            })
            .await?;
        Ok(logged("neighbor_delete", outcome))
    }
}

/// Trims a neighbor value; `None` when nothing is left.
pub fn normalize_neighbor(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn skipped(event: &str, reason: SkipReason) -> MutationOutcome {
    logged(event, MutationOutcome::Skipped(reason))
}

fn logged(event: &str, outcome: MutationOutcome) -> MutationOutcome {
    match outcome.skip_reason() {
        None => debug!("event={event} module=service status=ok"),
        Some(reason) => debug!("event={event} module=service status=skipped reason={reason}"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::normalize_neighbor;

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(normalize_neighbor("  Marta  ").as_deref(), Some("Marta"));
        assert_eq!(normalize_neighbor(" \t\n"), None);
        assert_eq!(normalize_neighbor(""), None);
    }
}
