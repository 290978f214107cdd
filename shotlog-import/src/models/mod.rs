//! Data models for shotlog-import
//!
//! - Import session state machine
//! - Import plan, target game and outcome
//! - Parsed shot candidates and per-row issues

pub mod import_plan;
pub mod import_result;
pub mod import_session;
pub mod shot_candidate;

pub use import_plan::{GameTarget, ImportMode, ImportOutcome, ImportPlan, ImportReport};
pub use import_result::{ErrorSeverity, ImportIssue};
pub use import_session::{ImportSession, ImportState, StateTransition};
pub use shot_candidate::ShotCandidate;
