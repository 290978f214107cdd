//! Import pipeline services
//!
//! CSV ingestion → duplicate detection → planning → coordinated commit →
//! durable save.

pub mod csv_ingestor;
pub mod duplicate_detector;
pub mod game_lease;
pub mod import_coordinator;
pub mod import_planner;
pub mod snapshot_sink;

pub use csv_ingestor::{ingest, map_row_to_shot, parse_csv, Column, ColumnBinding, IngestedCsv};
pub use duplicate_detector::{find_duplicates, DuplicateDetector, Fingerprint};
pub use game_lease::{GameLease, GameLeases};
pub use import_coordinator::ImportCoordinator;
pub use import_planner::build_plan;
pub use snapshot_sink::{
    load_store_file, FileSnapshotSink, HttpSnapshotSink, MirroredSnapshotSink, SaveReceipt, SnapshotSink,
};
