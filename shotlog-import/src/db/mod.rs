//! Persistence store for games and shots
//!
//! `PersistenceStore` is a cloneable handle over the in-memory SQLite pool.
//! The free functions in the submodules run on a single connection so they
//! can be combined inside one transaction.

pub mod games;
pub mod shots;
pub mod snapshot;

pub use shots::{BatchInsert, RowRejection};

use serde::Serialize;
use shotlog_common::config::BatchMode;
use shotlog_common::db::{open_memory_pool, Game, Shot, ShotRecord};
use sqlx::SqlitePool;

use crate::error::PersistenceError;
use crate::models::GameTarget;
use crate::utils::begin_monitored;

/// What a committed import wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub game_id: i64,
    pub game_created: bool,
    pub batch: BatchInsert,
    /// Shots stored for the game once the batch is in
    pub game_shot_count: i64,
}

/// Handle to the shot store
#[derive(Clone)]
pub struct PersistenceStore {
    pool: SqlitePool,
}

impl PersistenceStore {
    /// Empty store
    pub async fn open_in_memory() -> Result<Self, PersistenceError> {
        let pool = open_memory_pool().await?;
        Ok(Self { pool })
    }

    /// Store seeded from a previously exported snapshot
    pub async fn from_snapshot(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let store = Self::open_in_memory().await?;
        store.load_snapshot(bytes).await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Id of the game named `name` (trimmed, case-insensitive) on `date`
    pub async fn game_exists(&self, name: &str, date: &str) -> Result<Option<i64>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        games::game_exists(&mut conn, name, date).await
    }

    pub async fn insert_game(&self, name: &str, date: &str) -> Result<i64, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        games::insert_game(&mut conn, name, date).await
    }

    pub async fn game_by_id(&self, id: i64) -> Result<Game, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        games::game_by_id(&mut conn, id).await
    }

    pub async fn list_games(&self) -> Result<Vec<Game>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        games::list_games(&mut conn).await
    }

    /// Insert shots into an existing game
    ///
    /// In atomic mode a failing row rolls back the whole batch and is
    /// reported as `RowRejected`. In best-effort mode failing rows are
    /// skipped and counted.
    pub async fn insert_shots_batch(
        &self,
        game_id: i64,
        records: &[ShotRecord],
        mode: BatchMode,
    ) -> Result<BatchInsert, PersistenceError> {
        let mut tx = begin_monitored(&self.pool, "store::insert_shots_batch").await?;

        match shots::insert_shots(tx.conn(), game_id, records, mode).await {
            Ok(batch) => {
                tx.commit().await?;
                tracing::debug!(
                    game_id,
                    inserted = batch.inserted_count,
                    skipped = batch.skipped_count,
                    "Shot batch committed"
                );
                Ok(batch)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Create the target game if needed and insert `records`, all in one
    /// transaction
    pub async fn commit_import(
        &self,
        target: &GameTarget,
        records: &[ShotRecord],
        mode: BatchMode,
    ) -> Result<CommitSummary, PersistenceError> {
        let mut tx = begin_monitored(&self.pool, "store::commit_import").await?;

        let staged = async {
            let (game_id, game_created) =
                match games::game_exists(tx.conn(), &target.name, &target.date).await? {
                    Some(id) => (id, false),
                    None => (games::insert_game(tx.conn(), &target.name, &target.date).await?, true),
                };
            let batch = shots::insert_shots(tx.conn(), game_id, records, mode).await?;
            let game_shot_count = shots::count_shots(tx.conn(), game_id).await?;
            Ok::<_, PersistenceError>(CommitSummary {
                game_id,
                game_created,
                batch,
                game_shot_count,
            })
        }
        .await;

        match staged {
            Ok(summary) => {
                tx.commit().await?;
                Ok(summary)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Shots of a game in insertion order
    pub async fn shots_for_game(&self, game_id: i64) -> Result<Vec<Shot>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        shots::shots_for_game(&mut conn, game_id).await
    }

    pub async fn count_shots(&self, game_id: i64) -> Result<i64, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        shots::count_shots(&mut conn, game_id).await
    }

    /// Serialize the whole store
    pub async fn export_snapshot(&self) -> Result<Vec<u8>, PersistenceError> {
        snapshot::export_snapshot(&self.pool).await
    }

    /// Replace the store contents with a snapshot
    pub async fn load_snapshot(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        snapshot::load_snapshot(&self.pool, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotlog_common::db::{ShotResult, ShotType};

    fn record(time: &str, shooter: &str) -> ShotRecord {
        ShotRecord {
            date: "2024-01-01".to_string(),
            team1: "Lions".to_string(),
            team2: "Tigers".to_string(),
            time: time.to_string(),
            shooting_team: "Lions".to_string(),
            result: ShotResult::Goal,
            shot_type: ShotType::Turnover(Box::new(ShotType::OneTimer)),
            xg: 0.31,
            shooter: shooter.to_string(),
            pp: true,
            distance: 9.5,
            angle: -12.25,
            player_team1: 5,
            player_team2: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_game_exists_ignores_case_and_whitespace() {
        let store = PersistenceStore::open_in_memory().await.unwrap();
        let id = store.insert_game(" team a vs team b ", "2024-01-01").await.unwrap();

        let found = store.game_exists("Team A vs Team B", "2024-01-01").await.unwrap();
        assert_eq!(found, Some(id));
        assert_eq!(store.game_exists("Team A vs Team B", "2024-01-02").await.unwrap(), None);

        let game = store.game_by_id(id).await.unwrap();
        assert_eq!(game.name, "team a vs team b");
    }

    #[tokio::test]
    async fn test_insert_game_twice_is_duplicate_game() {
        let store = PersistenceStore::open_in_memory().await.unwrap();
        store.insert_game("A vs B", "2024-01-01").await.unwrap();

        let err = store.insert_game("a vs b", "2024-01-01").await.unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateGame { .. }));
    }

    #[tokio::test]
    async fn test_shots_round_trip_in_order() {
        let store = PersistenceStore::open_in_memory().await.unwrap();
        let game_id = store.insert_game("Lions vs Tigers", "2024-01-01").await.unwrap();

        let records = vec![record("01:00", "Smith"), record("02:00", "Jones")];
        let batch = store
            .insert_shots_batch(game_id, &records, BatchMode::Atomic)
            .await
            .unwrap();
        assert_eq!(batch.inserted_count, 2);

        let shots = store.shots_for_game(game_id).await.unwrap();
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].record, records[0]);
        assert_eq!(shots[1].record, records[1]);
        assert_eq!(store.count_shots(game_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_atomic_batch_rolls_back() {
        let store = PersistenceStore::open_in_memory().await.unwrap();

        let err = store
            .insert_shots_batch(404, &[record("01:00", "Smith")], BatchMode::Atomic)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::RowRejected { index: 0, .. }));
        assert_eq!(store.count_shots(404).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_best_effort_batch_skips_failures() {
        let store = PersistenceStore::open_in_memory().await.unwrap();

        let records = vec![record("01:00", "Smith"), record("02:00", "Jones")];
        let batch = store
            .insert_shots_batch(404, &records, BatchMode::BestEffort)
            .await
            .unwrap();
        assert_eq!(batch.inserted_count, 0);
        assert_eq!(batch.skipped_count, 2);
        assert_eq!(batch.rejected[1].index, 1);
    }

    #[tokio::test]
    async fn test_commit_import_creates_game_once() {
        let store = PersistenceStore::open_in_memory().await.unwrap();
        let target = GameTarget::new("Lions vs Tigers", "2024-01-01");

        let first = store
            .commit_import(&target, &[record("01:00", "Smith")], BatchMode::Atomic)
            .await
            .unwrap();
        assert!(first.game_created);

        let second = store
            .commit_import(&target, &[record("02:00", "Jones")], BatchMode::Atomic)
            .await
            .unwrap();
        assert!(!second.game_created);
        assert_eq!(second.game_id, first.game_id);
        assert_eq!(first.game_shot_count, 1);
        assert_eq!(second.game_shot_count, 2);
        assert_eq!(store.count_shots(first.game_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let store = PersistenceStore::open_in_memory().await.unwrap();
        let target = GameTarget::new("Lions vs Tigers", "2024-01-01");
        let summary = store
            .commit_import(&target, &[record("01:00", "Smith"), record("02:00", "Jones")], BatchMode::Atomic)
            .await
            .unwrap();

        let bytes = store.export_snapshot().await.unwrap();
        let restored = PersistenceStore::from_snapshot(&bytes).await.unwrap();

        assert_eq!(
            restored.game_exists("lions vs tigers", "2024-01-01").await.unwrap(),
            Some(summary.game_id)
        );
        assert_eq!(
            restored.shots_for_game(summary.game_id).await.unwrap(),
            store.shots_for_game(summary.game_id).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_load_snapshot_replaces_contents() {
        let source = PersistenceStore::open_in_memory().await.unwrap();
        source.insert_game("A vs B", "2024-01-01").await.unwrap();
        let bytes = source.export_snapshot().await.unwrap();

        let target = PersistenceStore::open_in_memory().await.unwrap();
        target.insert_game("C vs D", "2024-02-02").await.unwrap();
        target.load_snapshot(&bytes).await.unwrap();

        let games = target.list_games().await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].name, "A vs B");
    }

    #[tokio::test]
    async fn test_invalid_snapshot_leaves_store_untouched() {
        let store = PersistenceStore::open_in_memory().await.unwrap();
        store.insert_game("A vs B", "2024-01-01").await.unwrap();

        assert!(store.load_snapshot(b"not a database").await.is_err());
        assert_eq!(store.list_games().await.unwrap().len(), 1);
    }
}
