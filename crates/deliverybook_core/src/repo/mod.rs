//! Repository layer over the SQLite `contacts` table.
//!
//! # Responsibility
//! - Define the synchronous storage contract used by the async store.
//! - Keep SQL and column encoding details out of the rest of the crate.
//!
//! # Invariants
//! - Writes call `Contact::validate()` before touching SQL.
//! - Rows that cannot be decoded are reported, never silently skipped.

pub mod contact_repo;
pub mod neighbors_codec;
