//! Page entity definitions
//!
//! A page is one unit of fetched market data (e.g. a symbol/timeframe window of
//! candles) tracked by the source that owns its category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data kind a page belongs to. Each category has its own state source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageCategory {
    /// OHLCV candles / klines
    Candle,
    /// Funding rate history
    Funding,
    /// Open interest history
    OpenInterest,
    /// Aggregated trades
    AggTrades,
    /// Premium index klines
    PremiumIndex,
    /// Any category not known to this crate
    Custom(String),
}

impl PageCategory {
    /// All built-in categories, in their conventional display order
    pub const BUILTIN: [PageCategory; 5] = [
        PageCategory::Candle,
        PageCategory::Funding,
        PageCategory::OpenInterest,
        PageCategory::AggTrades,
        PageCategory::PremiumIndex,
    ];

    /// Get a short identifier for the category (for compact status lines)
    pub fn short_name(&self) -> &str {
        match self {
            PageCategory::Candle => "K",
            PageCategory::Funding => "F",
            PageCategory::OpenInterest => "OI",
            PageCategory::AggTrades => "AT",
            PageCategory::PremiumIndex => "PI",
            PageCategory::Custom(name) => name,
        }
    }

    /// Stable lowercase identifier
    pub fn as_str(&self) -> &str {
        match self {
            PageCategory::Candle => "candle",
            PageCategory::Funding => "funding",
            PageCategory::OpenInterest => "open_interest",
            PageCategory::AggTrades => "agg_trades",
            PageCategory::PremiumIndex => "premium_index",
            PageCategory::Custom(name) => name,
        }
    }
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PageCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "candle" | "candles" | "klines" => PageCategory::Candle,
            "funding" | "funding_rate" => PageCategory::Funding,
            "open_interest" | "oi" => PageCategory::OpenInterest,
            "agg_trades" | "aggtrades" => PageCategory::AggTrades,
            "premium_index" | "premium" => PageCategory::PremiumIndex,
            other => PageCategory::Custom(other.to_string()),
        })
    }
}

impl From<String> for PageCategory {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<PageCategory> for String {
    fn from(category: PageCategory) -> Self {
        category.to_string()
    }
}

/// How a state counts toward the snapshot summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// Being fetched or refreshed right now
    InFlight,
    /// Last fetch attempt failed
    Failed,
    /// Neither in flight nor failed (idle, ready, or unknown)
    Settled,
}

/// Lifecycle state of a page, as reported by its source.
///
/// The set is open: sources may report states this crate does not know
/// about, which are carried as [`PageState::Other`] and count as settled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageState {
    Idle,
    Loading,
    Updating,
    Ready,
    Error,
    Other(String),
}

impl PageState {
    pub fn class(&self) -> StateClass {
        match self {
            PageState::Loading | PageState::Updating => StateClass::InFlight,
            PageState::Error => StateClass::Failed,
            PageState::Idle | PageState::Ready | PageState::Other(_) => StateClass::Settled,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PageState::Idle => "idle",
            PageState::Loading => "loading",
            PageState::Updating => "updating",
            PageState::Ready => "ready",
            PageState::Error => "error",
            PageState::Other(name) => name,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PageState {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "idle" => PageState::Idle,
            "loading" => PageState::Loading,
            "updating" => PageState::Updating,
            "ready" => PageState::Ready,
            "error" => PageState::Error,
            other => PageState::Other(other.to_string()),
        }
    }
}

impl From<PageState> for String {
    fn from(state: PageState) -> Self {
        state.to_string()
    }
}

/// One page of fetched data, as seen by the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntity {
    /// Identifies the page within its category (e.g. "BTCUSDT-1h")
    pub key: String,
    pub category: PageCategory,
    pub state: PageState,
    pub last_updated: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
}

impl PageEntity {
    pub fn new(key: impl Into<String>, category: PageCategory, state: PageState) -> Self {
        Self {
            key: key.into(),
            category,
            state,
            last_updated: None,
            error_detail: None,
        }
    }

    pub fn with_last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }

    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }
}
