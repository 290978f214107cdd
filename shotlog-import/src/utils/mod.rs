//! Utility modules for shotlog-import

pub mod pool_monitor;

pub use pool_monitor::{begin_monitored, MonitoredTransaction};
