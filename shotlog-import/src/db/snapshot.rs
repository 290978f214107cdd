//! Full-store snapshots
//!
//! A snapshot is an ordinary SQLite database file with the store schema.
//! The in-memory store cannot open files itself, so both directions go
//! through a separate file-backed connection on a scratch file and copy the
//! rows table by table.

use shotlog_common::db::create_schema;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqliteConnection, SqlitePool, TypeInfo, ValueRef};
use std::path::Path;

use crate::error::PersistenceError;
use crate::utils::begin_monitored;

/// First 16 bytes of every SQLite database file
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Size of the SQLite file header
const SQLITE_HEADER_LEN: usize = 100;

/// Tables in foreign-key order
const TABLES: [&str; 2] = ["games", "shots"];

/// Serialize the whole store
pub async fn export_snapshot(pool: &SqlitePool) -> Result<Vec<u8>, PersistenceError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("snapshot.db");

    let file = open_snapshot_file(&path, true).await?;
    create_schema(&file).await?;

    let copied = async {
        let mut source = pool.acquire().await?;
        let mut dest = file.acquire().await?;
        let mut tx = begin_monitored(&mut *dest, "snapshot::export").await?;

        let mut rows = 0;
        for table in TABLES {
            rows += copy_table(&mut source, tx.conn(), table).await?;
        }
        tx.commit().await?;
        Ok::<_, PersistenceError>(rows)
    }
    .await;

    file.close().await;
    let rows = copied?;

    let bytes = tokio::fs::read(&path).await?;
    tracing::debug!(rows, bytes = bytes.len(), "Exported store snapshot");
    Ok(bytes)
}

/// Check that `bytes` look like an SQLite database image
pub fn validate_snapshot(bytes: &[u8]) -> Result<(), PersistenceError> {
    if bytes.len() < SQLITE_HEADER_LEN || !bytes.starts_with(SQLITE_HEADER) {
        return Err(PersistenceError::Snapshot(
            "Not an SQLite database image".to_string(),
        ));
    }
    Ok(())
}

/// Replace the store contents with those of a snapshot
pub async fn load_snapshot(pool: &SqlitePool, bytes: &[u8]) -> Result<(), PersistenceError> {
    validate_snapshot(bytes)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("snapshot.db");
    tokio::fs::write(&path, bytes).await?;

    let file = open_snapshot_file(&path, false)
        .await
        .map_err(|e| PersistenceError::Snapshot(format!("{}: {}", path.display(), e)))?;

    let copied = copy_from_file(pool, &file).await;
    file.close().await;

    let (games, shots) = copied?;
    tracing::info!(games, shots, "Loaded store snapshot");
    Ok(())
}

async fn open_snapshot_file(path: &Path, create: bool) -> Result<SqlitePool, PersistenceError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Delete)
        .foreign_keys(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

async fn copy_from_file(pool: &SqlitePool, file: &SqlitePool) -> Result<(u64, u64), PersistenceError> {
    let mut source = file.acquire().await?;

    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('games', 'shots')",
    )
    .fetch_one(&mut *source)
    .await
    .map_err(|e| PersistenceError::Snapshot(e.to_string()))?;

    if tables != 2 {
        return Err(PersistenceError::Snapshot(
            "Snapshot does not contain the games and shots tables".to_string(),
        ));
    }

    let mut tx = begin_monitored(pool, "snapshot::load").await?;

    let staged = async {
        sqlx::query("DELETE FROM shots").execute(tx.conn()).await?;
        sqlx::query("DELETE FROM games").execute(tx.conn()).await?;

        let games = copy_table(&mut source, tx.conn(), "games").await?;
        let shots = copy_table(&mut source, tx.conn(), "shots").await?;
        Ok::<_, PersistenceError>((games, shots))
    }
    .await;

    match staged {
        Ok(counts) => {
            tx.commit().await?;
            Ok(counts)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(PersistenceError::Snapshot(e.to_string()))
        }
    }
}

/// One stored value, by SQLite storage class
enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

fn read_cells(row: &SqliteRow) -> Result<Vec<Cell>, PersistenceError> {
    (0..row.len())
        .map(|i| -> Result<Cell, PersistenceError> {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                return Ok(Cell::Null);
            }
            let cell = match raw.type_info().name() {
                "TEXT" => Cell::Text(row.try_get(i)?),
                "REAL" => Cell::Real(row.try_get(i)?),
                "BLOB" => Cell::Blob(row.try_get(i)?),
                _ => Cell::Integer(row.try_get(i)?),
            };
            Ok(cell)
        })
        .collect()
}

/// Copy every row of `table`, keeping ids, by the source's column names
async fn copy_table(
    source: &mut SqliteConnection,
    dest: &mut SqliteConnection,
    table: &str,
) -> Result<u64, PersistenceError> {
    let rows = sqlx::query(&format!("SELECT * FROM {} ORDER BY id", table))
        .fetch_all(&mut *source)
        .await?;

    let Some(first) = rows.first() else {
        return Ok(0);
    };

    let columns: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    for row in &rows {
        let mut query = sqlx::query(&sql);
        for cell in read_cells(row)? {
            query = match cell {
                Cell::Null => query.bind(None::<String>),
                Cell::Integer(v) => query.bind(v),
                Cell::Real(v) => query.bind(v),
                Cell::Text(v) => query.bind(v),
                Cell::Blob(v) => query.bind(v),
            };
        }
        query.execute(&mut *dest).await?;
    }

    Ok(rows.len() as u64)
}
