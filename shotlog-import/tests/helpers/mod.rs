//! Test helper utilities for shotlog-import

#![allow(dead_code)]

pub mod csv_fixture;
pub mod sinks;

use shotlog_import::{ImportCoordinator, PersistenceStore};
use sinks::ScriptedSnapshotSink;
use std::sync::Arc;

/// Coordinator over a fresh store, saving into `sink`
pub async fn coordinator_with(sink: Arc<ScriptedSnapshotSink>) -> ImportCoordinator {
    let store = PersistenceStore::open_in_memory().await.unwrap();
    ImportCoordinator::new(store, sink)
}
