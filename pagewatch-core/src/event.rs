//! Lifecycle event records for the event log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::page::PageCategory;

/// What happened to a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEventKind {
    /// A source started tracking the page
    Tracked,
    /// The page moved to a new lifecycle state
    StateChanged,
    /// A fetch for the page failed
    Failed,
    /// The source stopped tracking the page
    Untracked,
    /// Free-form note from a producer
    Info,
}

impl fmt::Display for LogEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogEventKind::Tracked => "tracked",
            LogEventKind::StateChanged => "state",
            LogEventKind::Failed => "failed",
            LogEventKind::Untracked => "untracked",
            LogEventKind::Info => "info",
        };
        f.write_str(label)
    }
}

/// Immutable record of one discrete lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub category: PageCategory,
    pub page_key: String,
    pub kind: LogEventKind,
    pub message: String,
}

impl LogEvent {
    /// Create an event stamped with the current time
    pub fn new(
        category: PageCategory,
        page_key: impl Into<String>,
        kind: LogEventKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            page_key: page_key.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn is_for(&self, page_key: &str, category: &PageCategory) -> bool {
        &self.category == category && self.page_key == page_key
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}/{}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.kind,
            self.category,
            self.page_key,
            self.message
        )
    }
}
