//! Shot database operations

use serde::Serialize;
use shotlog_common::config::BatchMode;
use shotlog_common::db::{OnIce, Shot, ShotRecord, ShotResult, ShotType, SHOT_DATA_COLUMNS};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::error::PersistenceError;

/// Bound values per inserted shot: game_id, the data columns and created_at
const INSERT_PARAMS: usize = 33;

/// A row the store refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    /// Position in the submitted batch
    pub index: usize,
    pub reason: String,
}

/// Result of a batch insert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchInsert {
    pub inserted_count: usize,
    pub skipped_count: usize,
    /// Skipped rows with their causes (best-effort mode only)
    pub rejected: Vec<RowRejection>,
}

fn insert_sql() -> String {
    let placeholders = vec!["?"; INSERT_PARAMS].join(", ");
    format!(
        "INSERT INTO shots (game_id, {}, created_at) VALUES ({})",
        SHOT_DATA_COLUMNS, placeholders
    )
}

async fn insert_shot(
    conn: &mut SqliteConnection,
    sql: &str,
    game_id: i64,
    record: &ShotRecord,
    created_at: &str,
) -> Result<(), sqlx::Error> {
    let t1 = &record.team1_on_ice;
    let t2 = &record.team2_on_ice;

    sqlx::query(sql)
        .bind(game_id)
        .bind(&record.date)
        .bind(&record.team1)
        .bind(&record.team2)
        .bind(&record.time)
        .bind(&record.shooting_team)
        .bind(record.result.as_str())
        .bind(record.shot_type.to_string())
        .bind(record.xg)
        .bind(record.xgot)
        .bind(&record.shooter)
        .bind(&record.passer)
        .bind(&t1.lw)
        .bind(&t1.c)
        .bind(&t1.rw)
        .bind(&t1.ld)
        .bind(&t1.rd)
        .bind(&t1.g)
        .bind(&t2.lw)
        .bind(&t2.c)
        .bind(&t2.rw)
        .bind(&t2.ld)
        .bind(&t2.rd)
        .bind(&t2.g)
        .bind(record.pp)
        .bind(record.sh)
        .bind(record.distance)
        .bind(record.angle)
        .bind(record.player_team1)
        .bind(record.player_team2)
        .bind(record.x)
        .bind(record.y)
        .bind(created_at)
        .execute(conn)
        .await?;

    Ok(())
}

/// Insert `records` into `game_id` on a connection inside a transaction
///
/// Atomic mode stops at the first failing row and returns `RowRejected`;
/// the caller must roll back. Best-effort mode relies on SQLite undoing
/// only the failed statement, so the remaining rows still go in.
pub async fn insert_shots(
    conn: &mut SqliteConnection,
    game_id: i64,
    records: &[ShotRecord],
    mode: BatchMode,
) -> Result<BatchInsert, PersistenceError> {
    let sql = insert_sql();
    let created_at = chrono::Utc::now().to_rfc3339();
    let mut batch = BatchInsert::default();

    for (index, record) in records.iter().enumerate() {
        match insert_shot(conn, &sql, game_id, record, &created_at).await {
            Ok(()) => batch.inserted_count += 1,
            Err(e) => match mode {
                BatchMode::Atomic => {
                    return Err(PersistenceError::RowRejected {
                        index,
                        reason: e.to_string(),
                    });
                }
                BatchMode::BestEffort => {
                    tracing::warn!(game_id, index, error = %e, "Shot rejected, skipping");
                    batch.skipped_count += 1;
                    batch.rejected.push(RowRejection {
                        index,
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    Ok(batch)
}

/// Shots of a game in insertion order
pub async fn shots_for_game(
    conn: &mut SqliteConnection,
    game_id: i64,
) -> Result<Vec<Shot>, PersistenceError> {
    let sql = format!(
        "SELECT id, game_id, {} FROM shots WHERE game_id = ? ORDER BY id",
        SHOT_DATA_COLUMNS
    );

    let rows = sqlx::query(&sql).bind(game_id).fetch_all(conn).await?;
    Ok(rows.iter().map(row_to_shot).collect())
}

pub async fn count_shots(conn: &mut SqliteConnection, game_id: i64) -> Result<i64, PersistenceError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shots WHERE game_id = ?")
        .bind(game_id)
        .fetch_one(conn)
        .await?;

    Ok(count)
}

fn row_to_shot(row: &SqliteRow) -> Shot {
    let result: String = row.get("result");
    let shot_type: String = row.get("shot_type");

    Shot {
        id: row.get("id"),
        game_id: row.get("game_id"),
        record: ShotRecord {
            date: row.get("date"),
            team1: row.get("team1"),
            team2: row.get("team2"),
            time: row.get("time"),
            shooting_team: row.get("shooting_team"),
            result: ShotResult::parse(&result),
            shot_type: ShotType::parse(&shot_type),
            xg: row.get("xg"),
            xgot: row.get("xgot"),
            shooter: row.get("shooter"),
            passer: row.get("passer"),
            team1_on_ice: OnIce {
                lw: row.get("t1_lw"),
                c: row.get("t1_c"),
                rw: row.get("t1_rw"),
                ld: row.get("t1_ld"),
                rd: row.get("t1_rd"),
                g: row.get("t1_g"),
            },
            team2_on_ice: OnIce {
                lw: row.get("t2_lw"),
                c: row.get("t2_c"),
                rw: row.get("t2_rw"),
                ld: row.get("t2_ld"),
                rd: row.get("t2_rd"),
                g: row.get("t2_g"),
            },
            pp: row.get("pp"),
            sh: row.get("sh"),
            distance: row.get("distance"),
            angle: row.get("angle"),
            player_team1: row.get("player_team1"),
            player_team2: row.get("player_team2"),
            x: row.get("x"),
            y: row.get("y"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql_binds_every_column() {
        let sql = insert_sql();
        let columns = SHOT_DATA_COLUMNS.split(',').count() + 2;
        assert_eq!(columns, INSERT_PARAMS);
        assert_eq!(sql.matches('?').count(), INSERT_PARAMS);
    }
}
