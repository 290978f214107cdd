//! Import workflow state machine
//!
//! IDLE → PARSED → CHECKED → (AWAITING_CONFIRMATION | COMMITTING) → DONE | FAILED

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::{GameTarget, ImportIssue, ImportPlan, ImportReport, ShotCandidate};
use crate::services::game_lease::GameLease;

/// Import workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportState {
    /// Nothing parsed yet
    Idle,
    /// CSV parsed into candidates
    Parsed,
    /// Duplicates detected and plan built against the target game
    Checked,
    /// Duplicates found, waiting for a forced import
    AwaitingConfirmation,
    /// Writing game and shots, then saving the snapshot
    Committing,
    /// Rows committed and snapshot saved
    Done,
    /// Import failed; see `last_error`
    Failed,
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: ImportState,
    pub new_state: ImportState,
    pub transitioned_at: DateTime<Utc>,
}

/// One import attempt (in-memory state)
#[derive(Debug)]
pub struct ImportSession {
    pub session_id: Uuid,

    pub state: ImportState,

    /// Header row as read from the file
    pub header: Vec<String>,

    /// Data rows mapped to shots, in file order
    pub candidates: Vec<ShotCandidate>,

    /// Validated target game, set by the check step
    pub target: Option<GameTarget>,

    /// Positions in `candidates` flagged as duplicates
    pub duplicates: BTreeSet<usize>,

    pub plan: Option<ImportPlan>,

    /// Set once the rows are in the store, even if the save failed
    pub report: Option<ImportReport>,

    /// True while committed rows are not yet durable
    pub unsaved: bool,

    pub issues: Vec<ImportIssue>,

    pub last_error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub ended_at: Option<DateTime<Utc>>,

    /// Held from the check step until the commit finishes
    pub(crate) lease: Option<GameLease>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: ImportState::Idle,
            header: Vec::new(),
            candidates: Vec::new(),
            target: None,
            duplicates: BTreeSet::new(),
            plan: None,
            report: None,
            unsaved: false,
            issues: Vec::new(),
            last_error: None,
            started_at: Utc::now(),
            ended_at: None,
            lease: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: ImportState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        match new_state {
            ImportState::Done | ImportState::Failed => {
                self.ended_at = Some(Utc::now());
                self.lease = None;
            }
            ImportState::AwaitingConfirmation => {
                self.lease = None;
            }
            _ => {}
        }

        transition
    }

    /// Candidates not flagged as duplicates, in file order
    pub fn unique_candidates(&self) -> impl Iterator<Item = &ShotCandidate> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.duplicates.contains(i))
            .map(|(_, c)| c)
    }

    pub fn add_issue(&mut self, issue: ImportIssue) {
        self.issues.push(issue);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ImportState::Done | ImportState::Failed)
    }

    pub fn holds_lease(&self) -> bool {
        self.lease.is_some()
    }
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}
