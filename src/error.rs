// src/error.rs
//! Error types for call detail sessions.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::block::BlockOperation;
use crate::models::CallMethodId;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Everything that can go wrong inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetailError {
    /// Fetch returned no usable records.
    #[error("call details could not be loaded: {0}")]
    FetchFailure(String),
    /// Neither a direct reference nor row ids were supplied.
    #[error("no call log entries to show")]
    NoReferences,
    #[error("no plugin registered for call method {0}")]
    PluginLookupMiss(CallMethodId),
    #[error("{operation} failed: {reason}")]
    ToggleFailure {
        operation: BlockOperation,
        reason: String,
    },
    #[error("delete failed: {0}")]
    DeleteFailure(String),
    #[error("action not available: {0}")]
    NotEligible(&'static str),
    #[error("call details are not loaded yet")]
    NotReady,
}

impl DetailError {
    /// Terminal errors end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DetailError::FetchFailure(_) | DetailError::NoReferences)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Transient user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    CallDetailError,
    BlockFailed { operation: BlockOperation },
    DeleteFailed,
}

impl DetailError {
    /// Notice to show the user, if this error is user-visible.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            DetailError::FetchFailure(_) | DetailError::NoReferences => Some(Notice::CallDetailError),
            DetailError::ToggleFailure { operation, .. } => Some(Notice::BlockFailed {
                operation: *operation,
            }),
            DetailError::DeleteFailure(_) => Some(Notice::DeleteFailed),
            DetailError::PluginLookupMiss(_) | DetailError::NotEligible(_) | DetailError::NotReady => None,
        }
    }
}
