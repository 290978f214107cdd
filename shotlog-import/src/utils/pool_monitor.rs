//! Transaction timing for the shot store
//!
//! The in-memory store has exactly one connection, so a concurrent import
//! waits in `begin_monitored` until the other transaction finishes. Wait and
//! hold times are logged to make that contention visible.

use sqlx::{Acquire, Sqlite, SqliteConnection, Transaction};
use std::time::Instant;

use crate::error::PersistenceError;

/// Transaction wrapper that logs how long the connection was held
pub struct MonitoredTransaction<'c> {
    tx: Transaction<'c, Sqlite>,
    caller: &'static str,
    acquired_at: Instant,
}

impl<'c> MonitoredTransaction<'c> {
    pub async fn commit(self) -> Result<(), PersistenceError> {
        let held_ms = self.acquired_at.elapsed().as_millis();
        self.tx.commit().await?;

        if held_ms > 2000 {
            tracing::warn!(caller = self.caller, held_ms, "Long transaction held the store connection");
        } else if held_ms > 1000 {
            tracing::info!(caller = self.caller, held_ms, "Transaction held longer than expected (>1s)");
        } else {
            tracing::debug!(caller = self.caller, held_ms, "Store connection released (commit)");
        }

        Ok(())
    }

    pub async fn rollback(self) -> Result<(), PersistenceError> {
        let held_ms = self.acquired_at.elapsed().as_millis();
        self.tx.rollback().await?;

        tracing::debug!(caller = self.caller, held_ms, "Store connection released (rollback)");
        Ok(())
    }

    /// Connection to run statements on
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

/// Begin a transaction on a pool or an already acquired connection, logging
/// how long the connection took to become free
pub async fn begin_monitored<'c, A>(
    conn: A,
    caller: &'static str,
) -> Result<MonitoredTransaction<'c>, PersistenceError>
where
    A: Acquire<'c, Database = Sqlite>,
{
    let start = Instant::now();
    let tx = conn.begin().await?;
    let wait_ms = start.elapsed().as_millis();

    if wait_ms > 1000 {
        tracing::warn!(caller, wait_ms, "Slow store acquisition, another import holds the connection");
    } else if wait_ms > 500 {
        tracing::info!(caller, wait_ms, "Store acquisition slower than expected (>500ms)");
    } else {
        tracing::debug!(caller, wait_ms, "Store connection acquired");
    }

    Ok(MonitoredTransaction {
        tx,
        caller,
        acquired_at: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotlog_common::db::open_memory_pool;

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let pool = open_memory_pool().await.unwrap();

        let mut tx = begin_monitored(&pool, "test").await.unwrap();
        sqlx::query("INSERT INTO games (name, name_key, date, created_at) VALUES ('a', 'a', '2024-01-01', '')")
            .execute(tx.conn())
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_commit_keeps_writes() {
        let pool = open_memory_pool().await.unwrap();

        let mut tx = begin_monitored(&pool, "test").await.unwrap();
        sqlx::query("INSERT INTO games (name, name_key, date, created_at) VALUES ('a', 'a', '2024-01-01', '')")
            .execute(tx.conn())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
