//! Periodic and user-triggered recomputation against a live chain source.

pub mod coordinator;

pub use coordinator::{CycleOutcome, PublishedReport, RefreshConfig, RefreshCoordinator, ReportReceiver};
