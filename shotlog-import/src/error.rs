//! Error types for shotlog-import
//!
//! Attempt-level failures (`Parse`, `Validation`) never touch the store.
//! `Durability` means rows were applied in memory but the snapshot was not
//! saved; the caller should retry the save only.

use crate::models::{ErrorSeverity, ImportState};
use thiserror::Error;

/// Malformed CSV input
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV input is empty")]
    Empty,

    #[error("Unbalanced quote: quote opened on line {line} is never closed")]
    UnbalancedQuote { line: usize },

    #[error("Header does not match the shot export format, missing columns: {}", missing.join(", "))]
    HeaderMismatch { missing: Vec<String> },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Store operation failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Game '{name}' on {date} already exists")]
    DuplicateGame { name: String, date: String },

    #[error("Game {0} not found")]
    GameNotFound(i64),

    /// First failing row of an atomic batch; the whole batch was rolled back
    #[error("Row {index} rejected, batch rolled back: {reason}")]
    RowRejected { index: usize, reason: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<shotlog_common::Error> for PersistenceError {
    fn from(err: shotlog_common::Error) -> Self {
        match err {
            shotlog_common::Error::Database(e) => PersistenceError::Database(e),
            shotlog_common::Error::Io(e) => PersistenceError::Io(e),
            other => PersistenceError::Snapshot(other.to_string()),
        }
    }
}

/// Durable save failure after the in-memory commit succeeded
#[derive(Debug, Clone, Error)]
pub enum DurabilityError {
    #[error("Snapshot export failed: {0}")]
    Export(String),

    #[error("Durable save rejected: {0}")]
    Rejected(String),

    #[error("Durable save endpoint unreachable: {0}")]
    Transport(String),

    #[error("Durable save I/O failed: {0}")]
    Io(String),
}

/// Import attempt failure
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Import applied but not saved: {0}")]
    Durability(#[from] DurabilityError),

    #[error("Cannot {operation} while import is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ImportState,
    },
}

impl ImportError {
    /// Error code used in structured log entries
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::Parse(_) => "PARSE_ERROR",
            ImportError::Validation(_) => "VALIDATION_ERROR",
            ImportError::Persistence(_) => "PERSISTENCE_ERROR",
            ImportError::Durability(_) => "DURABILITY_ERROR",
            ImportError::InvalidState { .. } => "INVALID_STATE",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ImportError::Validation(_) | ImportError::InvalidState { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Critical,
        }
    }

    /// True when rows are in the store but not yet durable
    pub fn is_unsaved(&self) -> bool {
        matches!(self, ImportError::Durability(_))
    }
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
