//! Runtime settings for shotlog-import
//!
//! Combines command-line overrides with the shared TOML configuration and
//! builds the durable-save and log sinks they describe.

use shotlog_common::config::{resolve_store_path, BatchMode, TomlConfig};
use shotlog_common::events::{HttpLogSink, LogSink, TracingLogSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::DurabilityError;
use crate::services::{FileSnapshotSink, HttpSnapshotSink, MirroredSnapshotSink, SnapshotSink};

/// Resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    /// Snapshot file the store is loaded from and saved to
    pub store_path: PathBuf,
    pub save_endpoint: Option<String>,
    pub log_endpoint: Option<String>,
    pub batch_mode: BatchMode,
    pub request_timeout: Duration,
}

impl ImportSettings {
    /// Resolve settings; `store_arg` and `best_effort` come from the command line
    pub fn resolve(store_arg: Option<&Path>, best_effort: bool, config: &TomlConfig) -> Self {
        let batch_mode = if best_effort {
            BatchMode::BestEffort
        } else {
            config.batch_mode
        };

        Self {
            store_path: resolve_store_path(store_arg, config),
            save_endpoint: config.save_endpoint.clone().filter(|e| !e.trim().is_empty()),
            log_endpoint: config.log_endpoint.clone().filter(|e| !e.trim().is_empty()),
            batch_mode,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    /// Where committed snapshots go: always the store file, and the save
    /// endpoint too when one is configured
    pub fn snapshot_sink(&self) -> Result<Arc<dyn SnapshotSink>, DurabilityError> {
        match &self.save_endpoint {
            Some(endpoint) => {
                info!(endpoint = %endpoint, path = %self.store_path.display(), "Durable save via HTTP endpoint");
                let remote = HttpSnapshotSink::new(endpoint.clone(), self.request_timeout)?;
                Ok(Arc::new(MirroredSnapshotSink::new(
                    FileSnapshotSink::new(self.store_path.clone()),
                    Box::new(remote),
                )))
            }
            None => {
                info!(path = %self.store_path.display(), "Durable save to store file");
                Ok(Arc::new(FileSnapshotSink::new(self.store_path.clone())))
            }
        }
    }

    /// Structured log destination; falls back to tracing output
    pub fn log_sink(&self) -> Arc<dyn LogSink> {
        let Some(endpoint) = &self.log_endpoint else {
            return Arc::new(TracingLogSink);
        };

        match HttpLogSink::new(endpoint.clone(), self.request_timeout) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Log endpoint unusable, logging locally");
                Arc::new(TracingLogSink)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_store_and_best_effort_override_config() {
        let config = TomlConfig {
            store_path: Some(PathBuf::from("/from/toml.db")),
            batch_mode: BatchMode::Atomic,
            request_timeout_ms: 1500,
            ..TomlConfig::default()
        };

        let settings = ImportSettings::resolve(Some(Path::new("/from/cli.db")), true, &config);
        assert_eq!(settings.store_path, PathBuf::from("/from/cli.db"));
        assert_eq!(settings.batch_mode, BatchMode::BestEffort);
        assert_eq!(settings.request_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_blank_endpoints_are_ignored() {
        let config = TomlConfig {
            save_endpoint: Some("  ".to_string()),
            log_endpoint: Some(String::new()),
            ..TomlConfig::default()
        };

        let settings = ImportSettings::resolve(Some(Path::new("/tmp/x.db")), false, &config);
        assert!(settings.save_endpoint.is_none());
        assert!(settings.log_endpoint.is_none());
        assert_eq!(settings.batch_mode, BatchMode::Atomic);
    }

    #[tokio::test]
    async fn test_file_sink_used_without_endpoint() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        let settings = ImportSettings::resolve(Some(&path), false, &TomlConfig::default());

        let sink = settings.snapshot_sink().unwrap();
        let receipt = sink.save(b"snapshot".to_vec()).await.unwrap();
        assert_eq!(receipt.destination, path.display().to_string());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_endpoint_sink_still_writes_store_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        let config = TomlConfig {
            // Nothing listens here; the local file is written before the POST
            save_endpoint: Some("http://127.0.0.1:9/save".to_string()),
            request_timeout_ms: 500,
            ..TomlConfig::default()
        };
        let settings = ImportSettings::resolve(Some(&path), false, &config);

        let sink = settings.snapshot_sink().unwrap();
        assert!(sink.save(b"snapshot".to_vec()).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"snapshot");
    }
}
