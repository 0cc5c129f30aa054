//! Storage-fault taxonomy for the async store.
//!
//! Only faults live here. Unknown ids and rejected input are domain no-ops
//! and travel as [`MutationOutcome`](super::MutationOutcome) values instead.

use crate::db::DbError;
use crate::repo::contact_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// The durable engine failed or could not be reached.
#[derive(Debug)]
pub enum StoreError {
    /// The database could not be opened or migrated.
    Open(DbError),
    /// A repository call failed inside the engine.
    Repo(RepoError),
    /// The blocking worker or the connection lock is gone.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "contact storage could not be opened: {err}"),
            Self::Repo(err) => write!(f, "contact storage failed: {err}"),
            Self::Unavailable(reason) => write!(f, "contact storage unavailable: {reason}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Open(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
