//! End-to-end tests for the page monitor: real sources, real scheduler.

use std::sync::Arc;
use std::time::Duration;

use pagewatch_core::{LogEvent, LogEventKind, MonitorError, PageCategory, PageState};
use pagewatch_services::{
    Aggregator, EventLogStore, MonitorConfig, PageMonitor, PageRegistry, PageStateSource,
    SchedulerState, SelectionView, TickOutcome,
};

struct Fixture {
    monitor: PageMonitor,
    candles: Arc<PageRegistry>,
    funding: Arc<PageRegistry>,
    log: Arc<EventLogStore>,
}

fn fixture(refresh_ms: u64) -> Fixture {
    let log = EventLogStore::shared();
    let candles = Arc::new(PageRegistry::new(PageCategory::Candle).with_event_log(Arc::clone(&log)));
    let funding = Arc::new(PageRegistry::new(PageCategory::Funding).with_event_log(Arc::clone(&log)));

    let aggregator = Aggregator::new()
        .with_source(
            PageCategory::Candle,
            Some(Arc::clone(&candles) as Arc<dyn PageStateSource>),
        )
        .with_source(
            PageCategory::Funding,
            Some(Arc::clone(&funding) as Arc<dyn PageStateSource>),
        )
        .with_source(PageCategory::OpenInterest, None);

    let config = MonitorConfig {
        refresh_interval: Duration::from_millis(refresh_ms),
        ..MonitorConfig::default()
    };
    let monitor = PageMonitor::new(&config, aggregator, Arc::clone(&log)).unwrap();

    Fixture {
        monitor,
        candles,
        funding,
        log,
    }
}

/// Start the monitor and wait until the first scheduled tick has published
async fn start_and_settle(monitor: &PageMonitor) {
    let mut latest = monitor.watch_latest();
    monitor.start().unwrap();
    tokio::time::timeout(Duration::from_secs(2), latest.changed())
        .await
        .expect("first tick never arrived")
        .unwrap();
    // Let the first tick release the gate
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_source_summary() {
    let f = fixture(10_000);
    start_and_settle(&f.monitor).await;

    f.candles.track("BTCUSDT-1h");
    f.candles.set_state("BTCUSDT-1h", PageState::Loading);
    f.funding.track("BTCUSDT");
    f.funding.set_state("BTCUSDT", PageState::Ready);
    f.funding.track("ETHUSDT");
    f.funding.fail("ETHUSDT", "HTTP 429");

    assert_eq!(f.monitor.trigger_immediate_refresh(), TickOutcome::Ran);

    let update = f.monitor.latest();
    let summary = update.snapshot.summary;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.in_flight, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total, summary.in_flight + summary.failed + summary.settled);

    let oi = update.snapshot.category(&PageCategory::OpenInterest).unwrap();
    assert!(!oi.configured);

    f.monitor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_selection_resolves_once_page_appears() {
    let f = fixture(10_000);
    start_and_settle(&f.monitor).await;

    f.monitor.set_selection("BTCUSDT-1h", PageCategory::Candle);
    f.monitor.trigger_immediate_refresh();

    match f.monitor.latest().selection {
        SelectionView::Stale { ref last_known, .. } => assert!(last_known.is_none()),
        ref other => panic!("expected stale selection, got {other:?}"),
    }

    f.candles.track("BTCUSDT-1h");
    f.candles.set_state("BTCUSDT-1h", PageState::Loading);
    f.monitor.trigger_immediate_refresh();

    let update = f.monitor.latest();
    match update.selection {
        SelectionView::Live(ref page) => {
            assert_eq!(page.key, "BTCUSDT-1h");
            assert_eq!(page.category, PageCategory::Candle);
            assert_eq!(page.state, PageState::Loading);
        }
        ref other => panic!("expected live selection, got {other:?}"),
    }
    assert_eq!(f.monitor.selection_view(), update.selection);

    f.monitor.clear_selection();
    assert_eq!(f.monitor.selection_view(), SelectionView::Idle);

    f.monitor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_updates_are_pushed_every_tick() {
    let f = fixture(20);
    let mut updates = f.monitor.subscribe();
    f.monitor.start().unwrap();

    let mut last_tick = 0;
    for _ in 0..3 {
        let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("no update pushed")
            .unwrap();
        assert!(update.tick > last_tick);
        last_tick = update.tick;
    }

    f.monitor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_event_log_feed_and_clear() {
    let f = fixture(10_000);
    start_and_settle(&f.monitor).await;

    f.candles.track("BTCUSDT-1h");
    f.log.append(LogEvent::new(
        PageCategory::Candle,
        "BTCUSDT-1h",
        LogEventKind::Info,
        "backfill queued",
    ));
    f.monitor.trigger_immediate_refresh();

    let messages: Vec<_> = f.monitor.log_events().iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages, vec!["tracking started", "backfill queued"]);

    f.monitor.event_log().clear();
    f.monitor.trigger_immediate_refresh();
    assert!(f.monitor.log_events().is_empty());

    f.monitor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_twice_then_no_more_ticks() {
    let f = fixture(10);
    f.monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(f.monitor.stop().await);
    assert!(!f.monitor.stop().await);
    assert_eq!(f.monitor.state(), SchedulerState::Stopped);

    let ticks = f.monitor.stats().ticks_run;
    let published = f.monitor.latest().tick;
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(f.monitor.stats().ticks_run, ticks);
    assert_eq!(f.monitor.latest().tick, published);
    assert_eq!(f.monitor.trigger_immediate_refresh(), TickOutcome::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_ticks_after_monitor_dropped() {
    let f = fixture(10);
    let latest = f.monitor.watch_latest();
    f.monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    drop(f.monitor);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_drop = latest.borrow().tick;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(latest.borrow().tick, after_drop);
}

#[test]
fn test_oversized_feed_capacity_is_a_config_error() {
    let config = MonitorConfig {
        feed_capacity: usize::MAX,
        ..MonitorConfig::default()
    };

    let result = PageMonitor::new(&config, Aggregator::new(), EventLogStore::shared());
    assert!(matches!(result, Err(MonitorError::Config(_))));
}
