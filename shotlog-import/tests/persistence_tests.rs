//! Store persistence tests: batch modes and snapshot files

mod helpers;

use helpers::csv_fixture::{csv_text, numbered_rows};
use helpers::sinks::ScriptedSnapshotSink;
use shotlog_common::config::BatchMode;
use shotlog_common::db::ShotRecord;
use shotlog_import::error::{ImportError, PersistenceError};
use shotlog_import::services::{csv_ingestor, load_store_file, FileSnapshotSink};
use shotlog_import::{GameTarget, ImportCoordinator, ImportMode, ImportOutcome, ImportSession, ImportState, PersistenceStore};
use std::sync::Arc;
use tempfile::TempDir;

fn records(n: usize) -> Vec<ShotRecord> {
    csv_ingestor::ingest(&csv_text(&numbered_rows(n)))
        .unwrap()
        .candidates
        .into_iter()
        .map(|c| c.record)
        .collect()
}

#[tokio::test]
async fn test_atomic_batch_into_missing_game_writes_nothing() {
    let store = PersistenceStore::open_in_memory().await.unwrap();
    let game_id = store.insert_game("Team A vs Team B", "2024-01-01").await.unwrap();

    let err = store
        .insert_shots_batch(game_id + 1, &records(3), BatchMode::Atomic)
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::RowRejected { index: 0, .. }));

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shots")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_best_effort_batch_counts_skips() {
    let store = PersistenceStore::open_in_memory().await.unwrap();
    let game_id = store.insert_game("Team A vs Team B", "2024-01-01").await.unwrap();

    let batch = store
        .insert_shots_batch(game_id + 1, &records(3), BatchMode::BestEffort)
        .await
        .unwrap();
    assert_eq!(batch.inserted_count, 0);
    assert_eq!(batch.skipped_count, 3);
    assert_eq!(batch.rejected.len(), 3);

    let batch = store
        .insert_shots_batch(game_id, &records(3), BatchMode::BestEffort)
        .await
        .unwrap();
    assert_eq!(batch.inserted_count, 3);
    assert_eq!(batch.skipped_count, 0);
}

#[tokio::test]
async fn test_file_sink_snapshot_bootstraps_next_run() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("shotlog.db");
    let target = GameTarget::new("Team A vs Team B", "2024-01-01");

    assert!(load_store_file(&store_path).await.unwrap().is_none());

    let coordinator = ImportCoordinator::new(
        PersistenceStore::open_in_memory().await.unwrap(),
        Arc::new(FileSnapshotSink::new(&store_path)),
    );
    let mut session = ImportSession::new();
    coordinator
        .run(&mut session, &csv_text(&numbered_rows(4)), Some(target.clone()), ImportMode::Standard)
        .await
        .unwrap();

    // Next run starts from the saved file and sees the rows
    let bytes = load_store_file(&store_path).await.unwrap().unwrap();
    let reloaded = ImportCoordinator::new(
        PersistenceStore::from_snapshot(&bytes).await.unwrap(),
        Arc::new(FileSnapshotSink::new(&store_path)),
    );

    let mut again = ImportSession::new();
    let outcome = reloaded
        .run(&mut again, &csv_text(&numbered_rows(6)), Some(target), ImportMode::Standard)
        .await
        .unwrap();
    match outcome {
        ImportOutcome::AwaitingConfirmation(plan) => {
            assert_eq!(plan.duplicate_count, 4);
            assert_eq!(plan.unique_count, 2);
        }
        other => panic!("Expected confirmation request, got {:?}", other),
    }
}

#[tokio::test]
async fn test_corrupt_store_file_is_rejected() {
    let err = PersistenceStore::from_snapshot(b"definitely not sqlite")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, PersistenceError::Snapshot(_)));
}

#[tokio::test]
async fn test_best_effort_coordinator_reports_no_skips_on_clean_rows() {
    let coordinator = ImportCoordinator::new(
        PersistenceStore::open_in_memory().await.unwrap(),
        Arc::new(ScriptedSnapshotSink::new()),
    )
    .with_batch_mode(BatchMode::BestEffort);

    let mut session = ImportSession::new();
    let outcome = coordinator
        .run(
            &mut session,
            &csv_text(&numbered_rows(3)),
            Some(GameTarget::new("Team A vs Team B", "2024-01-01")),
            ImportMode::Standard,
        )
        .await
        .unwrap();

    match outcome {
        ImportOutcome::Committed(report) => {
            assert_eq!(report.inserted, 3);
            assert_eq!(report.skipped, 0);
        }
        other => panic!("Expected commit, got {:?}", other),
    }
    assert!(session.issues.is_empty());
}

#[tokio::test]
async fn test_invalid_date_is_validation_error() {
    let coordinator = ImportCoordinator::new(
        PersistenceStore::open_in_memory().await.unwrap(),
        Arc::new(ScriptedSnapshotSink::new()),
    );

    let mut session = ImportSession::new();
    let err = coordinator
        .run(
            &mut session,
            &csv_text(&numbered_rows(3)),
            Some(GameTarget::new("Team A vs Team B", "not a date")),
            ImportMode::Standard,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Validation(_)));
    assert_eq!(session.state, ImportState::Parsed);
    assert!(coordinator.store().list_games().await.unwrap().is_empty());
}
