//! Error types for the monitor

use thiserror::Error;

/// Monitor-wide error type
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl MonitorError {
    pub fn config(msg: impl Into<String>) -> Self {
        MonitorError::Config(msg.into())
    }

    pub fn scheduler(msg: impl Into<String>) -> Self {
        MonitorError::Scheduler(msg.into())
    }
}

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;
