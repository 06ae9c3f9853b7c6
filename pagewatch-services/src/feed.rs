//! Presentation feed
//!
//! Delivers each tick's result to the presentation layer, both pull-based
//! (`latest`) and push-based (`subscribe`). The event log travels on its own
//! channel and is only republished when it changed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pagewatch_core::LogEvent;
use tokio::sync::{broadcast, watch};

use crate::aggregator::AggregatedSnapshot;
use crate::selection::SelectionView;

/// Everything the status view needs from one tick
#[derive(Debug, Clone)]
pub struct MonitorUpdate {
    /// Sequence number of the tick that produced this update (0 = none yet)
    pub tick: u64,
    pub published_at: DateTime<Utc>,
    pub snapshot: Arc<AggregatedSnapshot>,
    pub selection: SelectionView,
    /// Recent events of the selected page, oldest first
    pub detail_events: Vec<LogEvent>,
}

impl MonitorUpdate {
    /// Placeholder published before the first tick
    pub fn initial() -> Self {
        Self {
            tick: 0,
            published_at: Utc::now(),
            snapshot: Arc::new(AggregatedSnapshot::empty()),
            selection: SelectionView::Idle,
            detail_events: Vec::new(),
        }
    }
}

pub struct MonitorFeed {
    latest_tx: watch::Sender<Arc<MonitorUpdate>>,
    updates_tx: broadcast::Sender<Arc<MonitorUpdate>>,
    log_tx: watch::Sender<Arc<Vec<LogEvent>>>,
    /// Event log revision last published on `log_tx`
    log_revision: parking_lot::Mutex<Option<u64>>,
}

impl MonitorFeed {
    /// Create a new feed. `capacity` bounds how far a push subscriber may lag
    /// before it starts missing updates.
    pub fn new(capacity: usize) -> Self {
        let (latest_tx, _) = watch::channel(Arc::new(MonitorUpdate::initial()));
        let (updates_tx, _) = broadcast::channel(capacity.max(1));
        let (log_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            latest_tx,
            updates_tx,
            log_tx,
            log_revision: parking_lot::Mutex::new(None),
        }
    }

    pub fn publish(&self, update: Arc<MonitorUpdate>) {
        self.latest_tx.send_replace(Arc::clone(&update));
        // No subscribers is fine
        let _ = self.updates_tx.send(update);
    }

    /// Publish the event log if `revision` differs from the last one sent.
    ///
    /// Returns whether anything was published.
    pub fn publish_log(&self, revision: u64, events: Vec<LogEvent>) -> bool {
        let mut last = self.log_revision.lock();
        if *last == Some(revision) {
            return false;
        }
        *last = Some(revision);
        self.log_tx.send_replace(Arc::new(events));
        true
    }

    /// Revision of the event log last published, if any
    pub fn log_revision(&self) -> Option<u64> {
        *self.log_revision.lock()
    }

    pub fn latest(&self) -> Arc<MonitorUpdate> {
        Arc::clone(&self.latest_tx.borrow())
    }

    pub fn watch_latest(&self) -> watch::Receiver<Arc<MonitorUpdate>> {
        self.latest_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<MonitorUpdate>> {
        self.updates_tx.subscribe()
    }

    pub fn log_events(&self) -> Arc<Vec<LogEvent>> {
        Arc::clone(&self.log_tx.borrow())
    }

    pub fn watch_log(&self) -> watch::Receiver<Arc<Vec<LogEvent>>> {
        self.log_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::{LogEventKind, PageCategory};

    fn update(tick: u64) -> Arc<MonitorUpdate> {
        Arc::new(MonitorUpdate {
            tick,
            ..MonitorUpdate::initial()
        })
    }

    #[test]
    fn test_latest_starts_with_initial_update() {
        let feed = MonitorFeed::new(8);
        let latest = feed.latest();
        assert_eq!(latest.tick, 0);
        assert!(latest.snapshot.pages.is_empty());
        assert_eq!(latest.selection, SelectionView::Idle);
    }

    #[tokio::test]
    async fn test_publish_reaches_pull_and_push() {
        let feed = MonitorFeed::new(8);
        let mut rx = feed.subscribe();

        feed.publish(update(1));
        feed.publish(update(2));

        assert_eq!(feed.latest().tick, 2);
        assert_eq!(rx.recv().await.unwrap().tick, 1);
        assert_eq!(rx.recv().await.unwrap().tick, 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let feed = MonitorFeed::new(1);
        feed.publish(update(7));
        assert_eq!(feed.latest().tick, 7);
    }

    #[test]
    fn test_log_only_republished_on_new_revision() {
        let feed = MonitorFeed::new(8);
        let mut rx = feed.watch_log();
        let events = vec![LogEvent::new(
            PageCategory::Candle,
            "BTCUSDT-1h",
            LogEventKind::Info,
            "hello",
        )];

        assert!(feed.publish_log(1, events.clone()));
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        assert!(!feed.publish_log(1, events.clone()));
        assert!(!rx.has_changed().unwrap());

        assert!(feed.publish_log(2, Vec::new()));
        assert!(feed.log_events().is_empty());
        assert_eq!(feed.log_revision(), Some(2));
    }
}
