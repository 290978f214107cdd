//! Snapshot sinks for tests

use async_trait::async_trait;
use shotlog_import::error::DurabilityError;
use shotlog_import::services::{SaveReceipt, SnapshotSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps snapshots in memory and fails a set number of saves first
#[derive(Default)]
pub struct ScriptedSnapshotSink {
    failures_left: AtomicUsize,
    saved: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedSnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` saves
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn last_snapshot(&self) -> Option<Vec<u8>> {
        self.saved.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SnapshotSink for ScriptedSnapshotSink {
    async fn save(&self, snapshot: Vec<u8>) -> Result<SaveReceipt, DurabilityError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DurabilityError::Rejected("scripted failure".to_string()));
        }

        let bytes = snapshot.len();
        self.saved.lock().unwrap().push(snapshot);
        Ok(SaveReceipt {
            bytes,
            destination: "memory".to_string(),
            saved_at: chrono::Utc::now(),
        })
    }
}
