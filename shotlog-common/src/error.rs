//! Errors shared by the shotlog crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the shared store, configuration and log sinks
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable or unwritable TOML configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client for a log endpoint could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
