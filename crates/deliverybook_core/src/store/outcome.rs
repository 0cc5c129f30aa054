//! Result values for mutations that may legitimately not proceed.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Why a mutation did not touch the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No contact with the requested id exists.
    UnknownId,
    /// The contact id was empty.
    EmptyId,
    /// An edit tried to change a contact's id.
    IdChanged,
    /// A neighbor value was blank after trimming.
    BlankValue,
    /// A neighbor index was outside `0..len`.
    IndexOutOfRange { index: usize, len: usize },
    /// A required editor field was blank.
    BlankField { field: &'static str },
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownId => write!(f, "unknown contact id"),
            Self::EmptyId => write!(f, "contact id is empty"),
            Self::IdChanged => write!(f, "contact id cannot change"),
            Self::BlankValue => write!(f, "value is blank"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for {len} neighbor(s)")
            }
            Self::BlankField { field } => write!(f, "required field `{field}` is blank"),
        }
    }
}

/// Outcome of a store mutation that did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied,
    Skipped(SkipReason),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Applied => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}
