//! Game database operations

use chrono::{DateTime, Utc};
use shotlog_common::db::{normalize_game_name, Game};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::error::PersistenceError;

/// Id of the game with this name and date, if any
///
/// The name is compared trimmed and case-insensitively; the date exactly.
pub async fn game_exists(
    conn: &mut SqliteConnection,
    name: &str,
    date: &str,
) -> Result<Option<i64>, PersistenceError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM games WHERE name_key = ? AND date = ?")
        .bind(normalize_game_name(name))
        .bind(date)
        .fetch_optional(conn)
        .await?;

    Ok(id)
}

/// Insert a game, failing with `DuplicateGame` if it already exists
pub async fn insert_game(
    conn: &mut SqliteConnection,
    name: &str,
    date: &str,
) -> Result<i64, PersistenceError> {
    let name = name.trim();

    let result = sqlx::query(
        "INSERT INTO games (name, name_key, date, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(normalize_game_name(name))
    .bind(date)
    .bind(Utc::now().to_rfc3339())
    .execute(conn)
    .await;

    match result {
        Ok(done) => {
            let id = done.last_insert_rowid();
            tracing::debug!(game_id = id, game = %name, date = %date, "Inserted game");
            Ok(id)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(PersistenceError::DuplicateGame {
                name: name.to_string(),
                date: date.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn game_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Game, PersistenceError> {
    let row = sqlx::query("SELECT id, name, date, created_at FROM games WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(row) => row_to_game(&row),
        None => Err(PersistenceError::GameNotFound(id)),
    }
}

/// All games, newest date first
pub async fn list_games(conn: &mut SqliteConnection) -> Result<Vec<Game>, PersistenceError> {
    let rows = sqlx::query("SELECT id, name, date, created_at FROM games ORDER BY date DESC, id")
        .fetch_all(conn)
        .await?;

    rows.iter().map(row_to_game).collect()
}

fn row_to_game(row: &SqliteRow) -> Result<Game, PersistenceError> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| PersistenceError::InvalidRow(format!("game created_at '{}': {}", created_at_str, e)))?
        .with_timezone(&Utc);

    Ok(Game {
        id: row.get("id"),
        name: row.get("name"),
        date: row.get("date"),
        created_at,
    })
}
