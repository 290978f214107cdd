//! Durable save of store snapshots
//!
//! The store itself lives in memory; a commit only counts as durable once a
//! `SnapshotSink` has accepted the full snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DurabilityError, PersistenceError};

/// Acknowledgement of a durable save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    pub bytes: usize,
    /// File path or endpoint URL
    pub destination: String,
    pub saved_at: DateTime<Utc>,
}

/// Destination for full store snapshots
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn save(&self, snapshot: Vec<u8>) -> Result<SaveReceipt, DurabilityError>;
}

/// Writes snapshots to a local file, replacing it atomically
pub struct FileSnapshotSink {
    path: PathBuf,
}

impl FileSnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotSink for FileSnapshotSink {
    async fn save(&self, snapshot: Vec<u8>) -> Result<SaveReceipt, DurabilityError> {
        let io_err = |e: std::io::Error| DurabilityError::Io(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &snapshot).await.map_err(io_err)?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(io_err)?;

        debug!(path = %self.path.display(), bytes = snapshot.len(), "Snapshot written");

        Ok(SaveReceipt {
            bytes: snapshot.len(),
            destination: self.path.display().to_string(),
            saved_at: Utc::now(),
        })
    }
}

/// Reply from the durable-save endpoint
#[derive(Debug, Deserialize)]
struct SaveResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// POSTs snapshots to a remote durable-save endpoint
pub struct HttpSnapshotSink {
    http_client: Client,
    endpoint: String,
}

impl HttpSnapshotSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DurabilityError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DurabilityError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SnapshotSink for HttpSnapshotSink {
    async fn save(&self, snapshot: Vec<u8>) -> Result<SaveReceipt, DurabilityError> {
        let bytes = snapshot.len();

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(snapshot)
            .send()
            .await
            .map_err(|e| DurabilityError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let reply: SaveResponse = serde_json::from_str(&body).map_err(|e| {
            DurabilityError::Rejected(format!("HTTP {}: unreadable reply ({}): {}", status.as_u16(), e, body))
        })?;

        if !status.is_success() || !reply.success {
            let reason = reply
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(DurabilityError::Rejected(reason));
        }

        debug!(endpoint = %self.endpoint, bytes, "Snapshot accepted by endpoint");

        Ok(SaveReceipt {
            bytes,
            destination: self.endpoint.clone(),
            saved_at: Utc::now(),
        })
    }
}

/// Writes the local store file, then hands the snapshot to a remote sink
///
/// The next run bootstraps from the local file, so it is kept current even
/// when durability is owned by the remote side.
pub struct MirroredSnapshotSink {
    local: FileSnapshotSink,
    remote: Box<dyn SnapshotSink>,
}

impl MirroredSnapshotSink {
    pub fn new(local: FileSnapshotSink, remote: Box<dyn SnapshotSink>) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl SnapshotSink for MirroredSnapshotSink {
    async fn save(&self, snapshot: Vec<u8>) -> Result<SaveReceipt, DurabilityError> {
        self.local.save(snapshot.clone()).await?;
        self.remote.save(snapshot).await
    }
}

/// Read a previously saved snapshot, `None` when no file exists yet
pub async fn load_store_file(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            info!(path = %path.display(), bytes = bytes.len(), "Found saved store");
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
