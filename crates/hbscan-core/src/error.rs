//! Error taxonomy for navigation and search.

use crate::models::Level;
use thiserror::Error;

/// A list or search call that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct FetchError {
    /// What was being fetched, e.g. `list cities`.
    pub operation: String,
    pub message: String,
}

impl FetchError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Failure reading or writing the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize stored value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors returned by navigation operations.
#[derive(Debug, Error)]
pub enum NavError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Id lookup against a list that does not contain it.
    #[error("facility {id} is not in the current list")]
    NotFound { id: i64 },
    #[error("invalid input: {0}")]
    Validation(String),
    /// Descent into a node whose parent is not the current selection.
    #[error("cannot open {level}: parent level is not selected")]
    LevelSkipped { level: Level },
    #[error("cannot {action} while {from}")]
    InvalidTransition { from: &'static str, action: &'static str },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// How an asynchronous navigation call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response was applied to state.
    Applied,
    /// The call failed; the error is retained and previous data kept.
    Failed,
    /// A newer call was issued before this one resolved; response dropped.
    Superseded,
}
