//! Import coordinator
//!
//! Drives one `ImportSession` through parse, check, commit and durable save:
//!
//! ```text
//! IDLE → PARSED → CHECKED → AWAITING_CONFIRMATION → (confirm) → COMMITTING
//!                         ↘ COMMITTING → DONE | FAILED
//! ```
//!
//! A per-game lease is taken in the check step and held until the session
//! reaches DONE, FAILED or AWAITING_CONFIRMATION, so concurrent imports of
//! the same game see each other's rows.

use serde_json::json;
use shotlog_common::config::BatchMode;
use shotlog_common::events::{LogEntry, LogLevel, LogSink, TracingLogSink};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db::PersistenceStore;
use crate::error::{DurabilityError, ImportError, ImportResult, PersistenceError};
use crate::models::{
    GameTarget, ImportIssue, ImportMode, ImportOutcome, ImportPlan, ImportReport, ImportSession,
    ImportState,
};
use crate::services::csv_ingestor;
use crate::services::duplicate_detector;
use crate::services::game_lease::{GameLease, GameLeases};
use crate::services::import_planner;
use crate::services::snapshot_sink::{SaveReceipt, SnapshotSink};

const LOG_CATEGORY: &str = "import";

/// Runs imports against one store and one durable-save destination
#[derive(Clone)]
pub struct ImportCoordinator {
    store: PersistenceStore,
    sink: Arc<dyn SnapshotSink>,
    log: Arc<dyn LogSink>,
    leases: GameLeases,
    batch_mode: BatchMode,
}

impl ImportCoordinator {
    pub fn new(store: PersistenceStore, sink: Arc<dyn SnapshotSink>) -> Self {
        Self {
            store,
            sink,
            log: Arc::new(TracingLogSink),
            leases: GameLeases::new(),
            batch_mode: BatchMode::default(),
        }
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Share leases with another coordinator over the same store
    pub fn with_leases(mut self, leases: GameLeases) -> Self {
        self.leases = leases;
        self
    }

    pub fn with_batch_mode(mut self, batch_mode: BatchMode) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }

    pub fn leases(&self) -> &GameLeases {
        &self.leases
    }

    /// Parse, check and commit in one go
    ///
    /// Without an explicit target the game is suggested from the first data
    /// row. Returns `AwaitingConfirmation` when duplicates are found and
    /// `mode` is `Standard`.
    pub async fn run(
        &self,
        session: &mut ImportSession,
        text: &str,
        target: Option<GameTarget>,
        mode: ImportMode,
    ) -> ImportResult<ImportOutcome> {
        self.parse(session, text).await?;

        let target = match target.or_else(|| GameTarget::suggest(&session.candidates)) {
            Some(target) => target,
            None => {
                let err = ImportError::Validation(
                    "No game given and none could be derived from the first row".to_string(),
                );
                self.reject(session, &err).await;
                return Err(err);
            }
        };

        self.check(session, &target).await?;
        self.commit(session, mode).await
    }

    /// IDLE → PARSED, or FAILED on malformed input
    pub async fn parse(&self, session: &mut ImportSession, text: &str) -> ImportResult<usize> {
        self.require(session, "parse", &[ImportState::Idle])?;

        let ingested = match csv_ingestor::ingest(text) {
            Ok(ingested) => ingested,
            Err(e) => return Err(self.fail(session, e.into()).await),
        };

        for candidate in &ingested.candidates {
            for field in &candidate.coerced_fields {
                session.add_issue(ImportIssue::warning(
                    candidate.row_index,
                    "COERCED_NUMERIC",
                    format!("Column '{}' is not numeric, stored as 0", field),
                ));
            }
        }

        let rows = ingested.candidates.len();
        session.header = ingested.header;
        session.candidates = ingested.candidates;

        self.transition(
            session,
            ImportState::Parsed,
            json!({ "rows": rows, "named_columns": ingested.binding.is_named() }),
        )
        .await;

        Ok(rows)
    }

    /// PARSED → CHECKED
    ///
    /// An invalid target is a validation error and leaves the session in
    /// PARSED. Otherwise the game lease is taken and held until commit.
    pub async fn check(&self, session: &mut ImportSession, target: &GameTarget) -> ImportResult<ImportPlan> {
        self.require(session, "check", &[ImportState::Parsed])?;

        let target = match target.validated() {
            Ok(target) => target,
            Err(err) => {
                self.reject(session, &err).await;
                return Err(err);
            }
        };

        let lease = self.leases.acquire(&target).await;
        let plan = self.detect(session, target, lease).await?;

        self.transition(
            session,
            ImportState::Checked,
            json!({
                "total": plan.total,
                "unique": plan.unique_count,
                "duplicates": plan.duplicate_count,
                "new_game": plan.target_is_new_game,
            }),
        )
        .await;

        Ok(plan)
    }

    /// CHECKED → COMMITTING → DONE, or CHECKED → AWAITING_CONFIRMATION
    pub async fn commit(&self, session: &mut ImportSession, mode: ImportMode) -> ImportResult<ImportOutcome> {
        self.require(session, "commit", &[ImportState::Checked])?;

        let plan = match &session.plan {
            Some(plan) => plan.clone(),
            None => {
                return Err(ImportError::InvalidState {
                    operation: "commit",
                    state: session.state,
                })
            }
        };

        if plan.has_conflicts() && mode == ImportMode::Standard {
            self.transition(
                session,
                ImportState::AwaitingConfirmation,
                json!({ "duplicates": plan.duplicate_count }),
            )
            .await;
            return Ok(ImportOutcome::AwaitingConfirmation(plan));
        }

        self.apply(session).await
    }

    /// AWAITING_CONFIRMATION → COMMITTING as a forced import
    ///
    /// Duplicates are detected again first, since the store may have changed
    /// while waiting.
    pub async fn confirm(&self, session: &mut ImportSession) -> ImportResult<ImportOutcome> {
        self.require(session, "confirm", &[ImportState::AwaitingConfirmation])?;

        let target = match &session.target {
            Some(target) => target.clone(),
            None => {
                return Err(ImportError::InvalidState {
                    operation: "confirm",
                    state: session.state,
                })
            }
        };

        let lease = self.leases.acquire(&target).await;
        let plan = self.detect(session, target, lease).await?;
        info!(
            session_id = %session.session_id,
            duplicates = plan.duplicate_count,
            "Forced import confirmed"
        );

        self.apply(session).await
    }

    /// Save the store again after a durability failure
    ///
    /// Rows are not re-imported; only the snapshot is written.
    pub async fn retry_save(&self, session: &mut ImportSession) -> ImportResult<ImportReport> {
        if session.state != ImportState::Failed || !session.unsaved {
            return Err(ImportError::InvalidState {
                operation: "retry save",
                state: session.state,
            });
        }

        let report = match &session.report {
            Some(report) => report.clone(),
            None => {
                return Err(ImportError::InvalidState {
                    operation: "retry save",
                    state: session.state,
                })
            }
        };

        match self.save_snapshot().await {
            Ok(receipt) => {
                session.unsaved = false;
                session.last_error = None;
                self.transition(
                    session,
                    ImportState::Done,
                    json!({ "retried_save": true, "bytes": receipt.bytes }),
                )
                .await;
                Ok(report)
            }
            Err(e) => Err(self.fail(session, e.into()).await),
        }
    }

    /// Compare the session's candidates with the target game's shots
    async fn detect(
        &self,
        session: &mut ImportSession,
        target: GameTarget,
        lease: GameLease,
    ) -> ImportResult<ImportPlan> {
        session.lease = Some(lease);

        let found = async {
            let game_id = self.store.game_exists(&target.name, &target.date).await?;
            let existing = match game_id {
                Some(id) => self.store.shots_for_game(id).await?,
                None => Vec::new(),
            };
            Ok::<_, PersistenceError>((game_id, existing))
        }
        .await;

        let (game_id, existing) = match found {
            Ok(found) => found,
            Err(e) => return Err(self.fail(session, e.into()).await),
        };

        let duplicates = duplicate_detector::find_duplicates(&session.candidates, &existing);
        let plan = import_planner::build_plan(&session.candidates, &duplicates, game_id);

        session.target = Some(target);
        session.duplicates = duplicates;
        session.plan = Some(plan.clone());

        Ok(plan)
    }

    /// COMMITTING: write rows, then save the snapshot
    async fn apply(&self, session: &mut ImportSession) -> ImportResult<ImportOutcome> {
        let (target, plan) = match (&session.target, &session.plan) {
            (Some(target), Some(plan)) => (target.clone(), plan.clone()),
            _ => {
                return Err(ImportError::InvalidState {
                    operation: "commit",
                    state: session.state,
                })
            }
        };

        self.transition(session, ImportState::Committing, json!({ "rows": plan.unique_count }))
            .await;

        let rows: Vec<usize> = session.unique_candidates().map(|c| c.row_index).collect();
        let records: Vec<_> = session.unique_candidates().map(|c| c.record.clone()).collect();
        let row_of = |index: usize| rows.get(index).copied().unwrap_or(index);

        let summary = match self.store.commit_import(&target, &records, self.batch_mode).await {
            Ok(summary) => summary,
            Err(PersistenceError::RowRejected { index, reason }) => {
                let err = PersistenceError::RowRejected {
                    index: row_of(index),
                    reason,
                };
                return Err(self.fail(session, err.into()).await);
            }
            Err(e) => return Err(self.fail(session, e.into()).await),
        };
        session.unsaved = true;

        for rejection in &summary.batch.rejected {
            session.add_issue(ImportIssue::skip(
                row_of(rejection.index),
                "ROW_REJECTED",
                rejection.reason.clone(),
            ));
        }

        let report = ImportReport {
            session_id: session.session_id,
            game_id: summary.game_id,
            game_created: summary.game_created,
            plan,
            inserted: summary.batch.inserted_count,
            skipped: summary.batch.skipped_count,
            game_shot_count: summary.game_shot_count,
        };
        session.report = Some(report.clone());

        info!(
            session_id = %session.session_id,
            game_id = report.game_id,
            inserted = report.inserted,
            skipped = report.skipped,
            "Rows committed to store"
        );

        match self.save_snapshot().await {
            Ok(receipt) => {
                session.unsaved = false;
                self.transition(
                    session,
                    ImportState::Done,
                    json!({
                        "game_id": report.game_id,
                        "inserted": report.inserted,
                        "skipped": report.skipped,
                        "bytes": receipt.bytes,
                    }),
                )
                .await;
                Ok(ImportOutcome::Committed(report))
            }
            Err(e) => Err(self.fail(session, e.into()).await),
        }
    }

    async fn save_snapshot(&self) -> Result<SaveReceipt, DurabilityError> {
        let snapshot = self
            .store
            .export_snapshot()
            .await
            .map_err(|e| DurabilityError::Export(e.to_string()))?;

        self.sink.save(snapshot).await
    }

    fn require(&self, session: &ImportSession, operation: &'static str, allowed: &[ImportState]) -> ImportResult<()> {
        if allowed.contains(&session.state) {
            Ok(())
        } else {
            Err(ImportError::InvalidState {
                operation,
                state: session.state,
            })
        }
    }

    async fn transition(&self, session: &mut ImportSession, state: ImportState, data: serde_json::Value) {
        let transition = session.transition_to(state);
        info!(
            session_id = %transition.session_id,
            from = ?transition.old_state,
            to = ?transition.new_state,
            "Import state changed"
        );

        let entry = LogEntry::new(LogLevel::Info, LOG_CATEGORY, format!("Import {:?}", state)).with_data(json!({
            "session_id": transition.session_id,
            "from": transition.old_state,
            "to": transition.new_state,
            "details": data,
        }));
        self.log.append(entry).await;
    }

    /// Record an error that leaves the session where it is
    async fn reject(&self, session: &mut ImportSession, err: &ImportError) {
        warn!(session_id = %session.session_id, error = %err, "Import rejected");
        session.last_error = Some(err.to_string());

        let entry = LogEntry::new(LogLevel::Warn, LOG_CATEGORY, err.to_string()).with_data(json!({
            "session_id": session.session_id,
            "code": err.code(),
            "state": session.state,
        }));
        self.log.append(entry).await;
    }

    /// Move the session to FAILED and hand the error back
    async fn fail(&self, session: &mut ImportSession, err: ImportError) -> ImportError {
        if err.is_unsaved() {
            error!(session_id = %session.session_id, error = %err, "Import applied but not saved");
        } else {
            error!(session_id = %session.session_id, error = %err, "Import failed");
        }

        session.last_error = Some(err.to_string());
        let transition = session.transition_to(ImportState::Failed);

        let entry = LogEntry::new(LogLevel::Error, LOG_CATEGORY, err.to_string()).with_data(json!({
            "session_id": session.session_id,
            "code": err.code(),
            "from": transition.old_state,
            "unsaved": session.unsaved,
        }));
        self.log.append(entry).await;

        err
    }
}
