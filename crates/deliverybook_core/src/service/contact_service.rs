//! Contact editor use-cases.
//!
//! # Responsibility
//! - Validate and save the fields edited on the contact detail screen.
//! - Load and delete contacts by id.
//!
//! # Invariants
//! - Blank id, name or address never reaches the store.
//! - Saving an existing contact keeps its recency timestamp.

use crate::model::contact::{Contact, ContactId};
use crate::service::neighbor_service::normalize_neighbor;
use crate::store::{ContactStore, MutationOutcome, SkipReason, StoreResult};
use log::debug;

/// Editable fields of a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDraft {
    pub id: ContactId,
    pub name: String,
    pub address: String,
    pub neighbors: Vec<String>,
}

impl From<Contact> for ContactDraft {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            address: contact.address,
            neighbors: contact.neighbors,
        }
    }
}

impl ContactDraft {
    /// First blank required field, in screen order.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("id", &self.id),
            ("name", &self.name),
            ("address", &self.address),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// Contact editor over the shared store.
#[derive(Clone)]
pub struct ContactService {
    store: ContactStore,
}

impl ContactService {
    pub fn new(store: ContactStore) -> Self {
        Self { store }
    }

    pub async fn load(&self, id: &str) -> StoreResult<Option<Contact>> {
        self.store.get(id).await
    }

    /// Creates or updates a contact from a draft.
    ///
    /// Fields are trimmed and blank neighbor entries dropped. An existing
    /// contact keeps its `last_accessed`; a new one starts outside the
    /// recency list.
    pub async fn save(&self, draft: ContactDraft) -> StoreResult<MutationOutcome> {
        if let Some(field) = draft.missing_field() {
            debug!("event=contact_save module=service status=skipped field={field}");
            return Ok(MutationOutcome::Skipped(SkipReason::BlankField { field }));
        }

        let id = draft.id.trim().to_string();
        let next = Contact {
            id: id.clone(),
            name: draft.name.trim().to_string(),
            address: draft.address.trim().to_string(),
            neighbors: draft
                .neighbors
                .iter()
                .filter_map(|value| normalize_neighbor(value))
                .collect(),
            last_accessed: None,
        };

        self.store
            .replace_with(&id, move |current| {
                Ok(Contact {
                    last_accessed: current.and_then(|existing| existing.last_accessed),
                    ..next
                })
            })
            .await
    }

    /// Deletes a contact; unknown ids are a no-op.
    pub async fn delete(&self, id: &str) -> StoreResult<MutationOutcome> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::ContactDraft;

    #[test]
    fn missing_field_reports_first_blank_in_order() {
        let mut draft = ContactDraft {
            id: "1".into(),
            name: "  ".into(),
            address: String::new(),
            neighbors: Vec::new(),
        };
        assert_eq!(draft.missing_field(), Some("name"));

        draft.name = "Juan".into();
        assert_eq!(draft.missing_field(), Some("address"));

        draft.address = "Calle 1".into();
        assert_eq!(draft.missing_field(), None);
    }
}
