//! Presentation-facing state for the contact list screen.
//!
//! # Responsibility
//! - Join query text, recency list, edit mode and contact count into one
//!   immutable [`UiSnapshot`].
//! - Route list-screen intents to the services and the search pipeline.

pub mod list_model;
pub mod snapshot;
