//! Page Fetch Monitor
//!
//! Runs the status monitor over simulated fetch workers, one per data
//! category, and logs the aggregated status until Ctrl-C.

mod simulator;

use std::collections::HashSet;
use std::sync::Arc;

use pagewatch_core::PageCategory;
use pagewatch_services::{
    Aggregator, EventLogStore, MonitorConfig, MonitorUpdate, PageMonitor, PageRegistry,
    PageStateSource, SelectionView,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::simulator::FetchSimulator;

/// Log a full status line every this many ticks
const SUMMARY_EVERY_TICKS: u64 = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pagewatch_services=debug")),
        )
        .init();

    info!("Starting page fetch monitor");

    let config = MonitorConfig::from_env()?;
    let disabled = disabled_categories();
    let event_log = EventLogStore::shared();

    // One registry and simulated worker per enabled category
    let mut aggregator = Aggregator::new();
    let mut workers = Vec::new();
    for category in PageCategory::BUILTIN {
        if disabled.contains(&category) {
            info!("{} source disabled", category);
            aggregator.register(category, None);
            continue;
        }

        let registry = Arc::new(
            PageRegistry::new(category.clone()).with_event_log(Arc::clone(&event_log)),
        );
        let simulator = FetchSimulator::new(Arc::clone(&registry));
        workers.push(tokio::spawn(simulator.run()));
        aggregator.register(category, Some(registry as Arc<dyn PageStateSource>));
    }

    let monitor = PageMonitor::new(&config, aggregator, event_log)?;
    let selected_key = FetchSimulator::page_key(&PageCategory::Candle, "BTCUSDT");
    monitor.set_selection(selected_key, PageCategory::Candle);

    let reporter = tokio::spawn(report_updates(monitor.subscribe()));
    monitor.start()?;
    info!("Refreshing every {:?}, press Ctrl-C to stop", config.refresh_interval);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    monitor.stop().await;
    reporter.abort();
    for worker in workers {
        worker.abort();
    }

    let stats = monitor.stats();
    let latest = monitor.latest();
    info!(
        "Ran {} ticks ({} skipped); {} events logged; final summary: {}",
        stats.ticks_run,
        stats.ticks_skipped,
        monitor.log_events().len(),
        serde_json::to_string(&latest.snapshot.summary)?
    );

    Ok(())
}

/// Categories named in `PAGEWATCH_DISABLED_CATEGORIES` (comma separated)
fn disabled_categories() -> HashSet<PageCategory> {
    std::env::var("PAGEWATCH_DISABLED_CATEGORIES")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PageCategory::from(s.to_string()))
        .collect()
}

async fn report_updates(mut updates: broadcast::Receiver<Arc<MonitorUpdate>>) {
    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(RecvError::Lagged(missed)) => {
                warn!("Status reporter fell behind by {} updates", missed);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let selected = match update.selection {
            SelectionView::Idle => "none".to_string(),
            SelectionView::Live(ref page) => format!("{}/{} {}", page.category, page.key, page.state),
            SelectionView::Stale { ref selection, .. } => format!("{} (not tracked)", selection),
        };

        if update.tick % SUMMARY_EVERY_TICKS == 0 {
            let by_category: Vec<String> = update
                .snapshot
                .by_category
                .iter()
                .map(|c| {
                    if c.configured {
                        format!(
                            "{}={}/{}/{}",
                            c.category.short_name(),
                            c.counts.total,
                            c.counts.in_flight,
                            c.counts.failed
                        )
                    } else {
                        format!("{}=off", c.category.short_name())
                    }
                })
                .collect();

            info!(
                "Tick {}: {} pages, {} in flight, {} failed [{}]; selected {}",
                update.tick,
                update.snapshot.summary.total,
                update.snapshot.summary.in_flight,
                update.snapshot.summary.failed,
                by_category.join(" "),
                selected
            );
            for event in &update.detail_events {
                debug!("  {}", event);
            }
        }
    }
}
