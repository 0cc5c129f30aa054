//! Use-case services layered on the shared store.
//!
//! # Responsibility
//! - Turn user intents into store mutations with domain-level no-op rules.
//! - Keep callers independent from SQL and worker-pool details.

pub mod contact_service;
pub mod neighbor_service;
pub mod recency_service;
