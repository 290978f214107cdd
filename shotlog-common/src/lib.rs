//! # Shotlog Common Library
//!
//! Shared code for the shotlog crates including:
//! - Database bootstrap and Game/Shot row models
//! - Structured log entries and log sinks
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{LogEntry, LogLevel, LogSink};
