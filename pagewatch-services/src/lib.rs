//! Aggregation, selection and refresh services for the page fetch monitor
//!
//! This crate polls the page state sources of every data category on a
//! fixed cadence, reconciles them into one snapshot, keeps the selected page
//! resolved across snapshots, and feeds the results to the presentation layer.

pub mod aggregator;
pub mod config;
pub mod event_log;
pub mod feed;
pub mod monitor;
pub mod pipeline;
pub mod scheduler;
pub mod selection;
pub mod source;

pub use aggregator::{AggregatedSnapshot, Aggregator, CategorySummary, SnapshotSummary};
pub use config::MonitorConfig;
pub use event_log::EventLogStore;
pub use feed::{MonitorFeed, MonitorUpdate};
pub use monitor::PageMonitor;
pub use pipeline::MonitorPipeline;
pub use scheduler::{
    RefreshScheduler, SchedulerError, SchedulerState, SchedulerStats, TickHandler, TickOutcome,
};
pub use selection::{SelectionCoordinator, SelectionView};
pub use source::{PageRegistry, PageStateSource};
