//! Domain model for the contact directory.
//!
//! # Invariants
//! - Every persisted contact has a non-empty, immutable `id`.
//! - Components outside the store only ever see owned snapshots.

pub mod contact;
