//! Core types for the page fetch monitor
//!
//! This crate defines the shared data structures used across the monitor,
//! including page entities, lifecycle events, and the selection key.

pub mod error;
pub mod event;
pub mod page;
pub mod selection;

pub use error::{MonitorError, MonitorResult};
pub use event::{LogEvent, LogEventKind};
pub use page::{PageCategory, PageEntity, PageState, StateClass};
pub use selection::Selection;
