//! Errors reported by a mining [`Session`](crate::session::Session).
//!
//! Every variant except [`MiningError::Internal`] is a usage or input error:
//! the offending call is rejected and the session stays usable.

use thiserror::Error;

use crate::{loader::ParseSmilesError, session::SessionState};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    /// A call made in a state that does not allow it, e.g. changing a setting
    /// after the first compound was added.
    #[error("{operation} is not allowed while the session is {state}")]
    WrongState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("compound {0} has no activity")]
    MissingActivity(u64),

    #[error("compound {0} has no weight, but weights were given for other compounds")]
    MissingWeight(u64),

    #[error("compound {id}: cannot read structure {pattern:?}: {source}")]
    MalformedStructure {
        id: u64,
        pattern: String,
        #[source]
        source: ParseSmilesError,
    },

    #[error("compound {0} has a self-loop or more than one bond between two atoms")]
    MalformedGraph(u64),

    #[error("compound {0} is already registered")]
    DuplicateCompound(u64),

    #[error("compound {0} is not registered")]
    UnknownCompound(u64),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("compound {id}: activity {value} is not a finite number")]
    InvalidActivity { id: u64, value: f64 },

    #[error("compound {id}: weight {value} must be a finite number of at least 1")]
    InvalidWeight { id: u64, value: f64 },

    #[error("root {index} does not exist (there are {count} roots)")]
    RootOutOfRange { index: usize, count: usize },

    #[error("root {0} has already been mined")]
    RootAlreadyMined(usize),

    #[error("no compounds registered")]
    NoCompounds,

    /// A broken invariant inside the miner; aborts the affected root only.
    #[error("internal error: {0}")]
    Internal(String),
}
