//! Incremental substring search over the contact store.
//!
//! # Responsibility
//! - Turn a stream of query text into a live, paginated result stream.
//! - Guarantee that only the newest query ever publishes results.

pub mod pipeline;
