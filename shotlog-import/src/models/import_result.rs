//! Per-row import issues
//!
//! Row-level problems never abort an import; they are collected on the
//! session and reported alongside the outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorSeverity {
    /// Row imported with a coerced value
    Warning,
    /// Row could not be stored, import continues
    Skip,
    /// Import cannot continue
    Critical,
}

/// Issue attached to one CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
    /// Row index in the parsed file (the header is row 0)
    pub row_index: usize,

    /// Error code (e.g. "COERCED_NUMERIC", "ROW_REJECTED")
    pub error_code: String,

    pub error_message: String,

    pub severity: ErrorSeverity,

    pub occurred_at: DateTime<Utc>,
}

impl ImportIssue {
    pub fn warning(row_index: usize, error_code: &str, error_message: String) -> Self {
        Self {
            row_index,
            error_code: error_code.to_string(),
            error_message,
            severity: ErrorSeverity::Warning,
            occurred_at: Utc::now(),
        }
    }

    pub fn skip(row_index: usize, error_code: &str, error_message: String) -> Self {
        Self {
            row_index,
            error_code: error_code.to_string(),
            error_message,
            severity: ErrorSeverity::Skip,
            occurred_at: Utc::now(),
        }
    }
}

/// Count issues of one severity
pub fn count_by_severity(issues: &[ImportIssue], severity: ErrorSeverity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}
