//! Database initialization
//!
//! The store lives in process memory; durability comes from full snapshots
//! written elsewhere. The pool therefore holds exactly one connection that is
//! never reaped, since dropping it would discard the database.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::debug;

/// Shot columns in table order, excluding `id`, `game_id` and `created_at`
pub const SHOT_DATA_COLUMNS: &str = "date, team1, team2, time, shooting_team, result, shot_type, \
     xg, xgot, shooter, passer, \
     t1_lw, t1_c, t1_rw, t1_ld, t1_rd, t1_g, \
     t2_lw, t2_c, t2_rw, t2_ld, t2_rd, t2_g, \
     pp, sh, distance, angle, player_team1, player_team2, x, y";

/// Open an empty in-memory database with the Game/Shot schema
pub async fn open_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    debug!("Opened in-memory shot store");

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_games_table(pool).await?;
    create_shots_table(pool).await?;
    Ok(())
}

/// Create the games table
///
/// `name_key` is the trimmed, lower-cased name; together with `date` it is
/// unique.
pub async fn create_games_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (name_key, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the shots table
pub async fn create_shots_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            date TEXT NOT NULL DEFAULT '',
            team1 TEXT NOT NULL DEFAULT '',
            team2 TEXT NOT NULL DEFAULT '',
            time TEXT NOT NULL DEFAULT '',
            shooting_team TEXT NOT NULL DEFAULT '',
            result TEXT NOT NULL DEFAULT '',
            shot_type TEXT NOT NULL DEFAULT '',
            xg REAL NOT NULL DEFAULT 0,
            xgot REAL NOT NULL DEFAULT 0,
            shooter TEXT NOT NULL DEFAULT '',
            passer TEXT NOT NULL DEFAULT '',
            t1_lw TEXT NOT NULL DEFAULT '',
            t1_c TEXT NOT NULL DEFAULT '',
            t1_rw TEXT NOT NULL DEFAULT '',
            t1_ld TEXT NOT NULL DEFAULT '',
            t1_rd TEXT NOT NULL DEFAULT '',
            t1_g TEXT NOT NULL DEFAULT '',
            t2_lw TEXT NOT NULL DEFAULT '',
            t2_c TEXT NOT NULL DEFAULT '',
            t2_rw TEXT NOT NULL DEFAULT '',
            t2_ld TEXT NOT NULL DEFAULT '',
            t2_rd TEXT NOT NULL DEFAULT '',
            t2_g TEXT NOT NULL DEFAULT '',
            pp INTEGER NOT NULL DEFAULT 0,
            sh INTEGER NOT NULL DEFAULT 0,
            distance REAL NOT NULL DEFAULT 0,
            angle REAL NOT NULL DEFAULT 0,
            player_team1 INTEGER NOT NULL DEFAULT 0,
            player_team2 INTEGER NOT NULL DEFAULT 0,
            x REAL NOT NULL DEFAULT 0,
            y REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_shots_game ON shots(game_id)")
        .execute(pool)
        .await?;

    Ok(())
}
