//! Typed error definitions for zos_transfer.
//! Fatal errors abort a whole run before any transfer starts; per-item errors
//! are recorded on the item's outcome and never escape the scheduler.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an upload or download as a whole.
#[derive(Debug, Error)]
pub enum TransferEngineError {
    #[error("Malformed attributes file {path} (line {line}): {message}")]
    RuleSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot read attributes file {path}: {message}")]
    AttributesUnreadable { path: PathBuf, message: String },

    #[error("Candidate discovery failed: {0}")]
    CandidateDiscovery(String),

    #[error("Cannot walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Invalid {name} filter '{value}': {reason}")]
    InvalidFilter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Cannot prepare destination {path}: {message}")]
    Destination { path: PathBuf, message: String },

    #[error("Failed to start transfer workers: {0}")]
    WorkerPool(String),

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl TransferEngineError {
    /// Stable kind string used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            TransferEngineError::RuleSyntax { .. } => "rule_syntax",
            TransferEngineError::AttributesUnreadable { .. } => "attributes_unreadable",
            TransferEngineError::CandidateDiscovery(_) => "candidate_discovery",
            TransferEngineError::Walk { .. } => "walk",
            TransferEngineError::InvalidFilter { .. } => "invalid_filter",
            TransferEngineError::Destination { .. } => "destination",
            TransferEngineError::WorkerPool(_) => "worker_pool",
            TransferEngineError::Interrupted => "interrupted",
        }
    }
}

/// Failure of a single item. Cloneable so outcomes stay plain values.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransferError {
    #[error("Destination already exists: {0} (use --replace to overwrite)")]
    AlreadyExists(String),

    #[error("{context}: {message}")]
    Io { context: String, message: String },

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Refusing path that leaves the destination: {0}")]
    UnsafePath(String),
}

impl TransferError {
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::AlreadyExists(_) => "already_exists",
            TransferError::Io { .. } => "io",
            TransferError::Remote(_) => "remote",
            TransferError::UnsafePath(_) => "unsafe_path",
        }
    }
}

impl From<anyhow::Error> for TransferError {
    fn from(e: anyhow::Error) -> Self {
        TransferError::Remote(format!("{e:#}"))
    }
}
