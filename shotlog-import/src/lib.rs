//! shotlog-import library interface
//!
//! Merges CSV shot exports into the game/shot store without duplicating
//! shots already recorded for the same game.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::db::PersistenceStore;
pub use crate::error::{ImportError, ImportResult};
pub use crate::models::{GameTarget, ImportMode, ImportOutcome, ImportPlan, ImportReport, ImportSession, ImportState};
pub use crate::services::ImportCoordinator;
