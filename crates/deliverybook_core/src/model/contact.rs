//! Contact domain model.
//!
//! # Responsibility
//! - Define the record owned by the store and copied everywhere else.
//! - Validate the invariants that must hold before persistence.
//!
//! # Invariants
//! - `id` is non-empty and never changes after creation.
//! - `neighbors` order is meaningful and duplicates are allowed.
//! - `last_accessed == None` keeps the contact out of the recency list.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key of a contact (the person's national id number).
pub type ContactId = String;

/// One person in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub address: String,
    /// Ordered free-form notes about who lives next door.
    pub neighbors: Vec<String>,
    /// Unix epoch milliseconds of the last time the contact was opened from
    /// search.
    pub last_accessed: Option<i64>,
}

/// Invariant violations detected before a contact reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyId,
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "contact id must not be empty"),
        }
    }
}

impl Error for ContactValidationError {}

impl Contact {
    /// Creates a contact with no neighbors that has never been searched.
    pub fn new(
        id: impl Into<ContactId>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            neighbors: Vec::new(),
            last_accessed: None,
        }
    }

    /// Builder-style helper that replaces the neighbor list.
    pub fn with_neighbors<I, S>(mut self, neighbors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.neighbors = neighbors.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the invariants required for persistence.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.id.is_empty() {
            return Err(ContactValidationError::EmptyId);
        }
        Ok(())
    }

    /// Whether this contact belongs in the recency list.
    pub fn is_recent(&self) -> bool {
        self.last_accessed.is_some()
    }

    /// Literal, case-sensitive containment over id, name and address.
    ///
    /// Mirrors the predicate the store evaluates in SQL.
    pub fn matches(&self, needle: &str) -> bool {
        self.id.contains(needle) || self.name.contains(needle) || self.address.contains(needle)
    }
}
