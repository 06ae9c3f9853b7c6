//! Simulated fetch workers
//!
//! Stand-in for the real download pipeline: moves pages of one category
//! through their lifecycle at random so the monitor has something to watch.

use std::sync::Arc;
use std::time::Duration;

use pagewatch_core::{PageCategory, PageState};
use pagewatch_services::PageRegistry;
use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::time::interval;
use tracing::debug;

const SYMBOLS: [&str; 4] = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT"];

/// How often a worker advances one of its pages
const STEP_INTERVAL_MS: u64 = 150;

/// Probability that a load attempt fails
const FAILURE_RATE: f64 = 0.15;

/// Probability that a ready page starts a refresh on a given step
const REFRESH_RATE: f64 = 0.3;

const FAILURE_DETAILS: [&str; 3] = [
    "HTTP 429 Too Many Requests",
    "HTTP 503 Service Unavailable",
    "connection reset by peer",
];

pub struct FetchSimulator {
    registry: Arc<PageRegistry>,
    keys: Vec<String>,
}

impl FetchSimulator {
    pub fn new(registry: Arc<PageRegistry>) -> Self {
        let keys = SYMBOLS
            .iter()
            .map(|symbol| Self::page_key(registry.category(), symbol))
            .collect();
        Self { registry, keys }
    }

    /// Page key convention per category
    pub fn page_key(category: &PageCategory, symbol: &str) -> String {
        match category {
            PageCategory::Candle => format!("{symbol}-1h"),
            PageCategory::OpenInterest => format!("{symbol}-5m"),
            PageCategory::PremiumIndex => format!("{symbol}-1m"),
            PageCategory::Funding | PageCategory::AggTrades | PageCategory::Custom(_) => {
                symbol.to_string()
            }
        }
    }

    pub async fn run(self) {
        for key in &self.keys {
            self.registry.track(key.clone());
        }
        debug!(
            "[Simulator] {} worker tracking {} pages",
            self.registry.category(),
            self.keys.len()
        );

        let mut ticker = interval(Duration::from_millis(STEP_INTERVAL_MS));
        loop {
            ticker.tick().await;
            self.step();
        }
    }

    /// Advance one random page by one lifecycle step
    fn step(&self) {
        let mut rng = rand::rng();
        let Some(key) = self.keys.choose(&mut rng) else {
            return;
        };
        let Some(page) = self.registry.get(key) else {
            return;
        };

        match page.state {
            PageState::Idle | PageState::Error => {
                self.registry.set_state(key, PageState::Loading);
            }
            PageState::Loading | PageState::Updating => {
                if rng.random_bool(FAILURE_RATE) {
                    let detail = FAILURE_DETAILS.choose(&mut rng).copied().unwrap_or("unknown");
                    self.registry.fail(key, detail);
                } else {
                    self.registry.set_state(key, PageState::Ready);
                }
            }
            PageState::Ready => {
                if rng.random_bool(REFRESH_RATE) {
                    self.registry.set_state(key, PageState::Updating);
                }
            }
            PageState::Other(_) => {
                self.registry.set_state(key, PageState::Idle);
            }
        }
    }
}
