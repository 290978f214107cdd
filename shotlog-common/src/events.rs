//! Structured log entries and log sinks
//!
//! Entries follow the shape accepted by the remote log endpoint:
//! `{timestamp, level, category, message, data?}`. Writing to a sink is
//! append-only and best-effort; a sink never reports failure to its caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Severity of a structured log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One structured log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Subsystem that produced the entry (e.g. `import`)
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category: category.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Destination for structured log entries
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append an entry. Failures are handled inside the sink.
    async fn append(&self, entry: LogEntry);
}

/// Re-emits entries through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    async fn append(&self, entry: LogEntry) {
        let data = entry
            .data
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();

        match entry.level {
            LogLevel::Debug => {
                tracing::debug!(category = %entry.category, data = %data, "{}", entry.message)
            }
            LogLevel::Info => {
                tracing::info!(category = %entry.category, data = %data, "{}", entry.message)
            }
            LogLevel::Warn => {
                tracing::warn!(category = %entry.category, data = %data, "{}", entry.message)
            }
            LogLevel::Error => {
                tracing::error!(category = %entry.category, data = %data, "{}", entry.message)
            }
        }
    }
}

/// POSTs entries as JSON to a remote log endpoint
pub struct HttpLogSink {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpLogSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl LogSink for HttpLogSink {
    async fn append(&self, entry: LogEntry) {
        let response = self.http_client.post(&self.endpoint).json(&entry).send().await;

        match response {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    status = resp.status().as_u16(),
                    "Log endpoint rejected entry"
                );
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Log endpoint unreachable");
            }
        }
    }
}

/// Keeps entries in memory; used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append(&self, entry: LogEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_without_data() {
        let entry = LogEntry::new(LogLevel::Info, "import", "Import started");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["level"], "info");
        assert_eq!(json["category"], "import");
        assert_eq!(json["message"], "Import started");
        assert!(json.get("data").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_entry_with_data() {
        let entry = LogEntry::new(LogLevel::Warn, "import", "Rows skipped")
            .with_data(serde_json::json!({ "skipped": 2 }));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["data"]["skipped"], 2);
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let sink = MemoryLogSink::new();
        sink.append(LogEntry::new(LogLevel::Info, "a", "first")).await;
        sink.append(LogEntry::new(LogLevel::Error, "b", "second")).await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn test_http_sink_swallows_connection_errors() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let sink = HttpLogSink::new("http://127.0.0.1:9/log", Duration::from_millis(200)).unwrap();
        sink.append(LogEntry::new(LogLevel::Info, "import", "unreachable")).await;
    }
}
