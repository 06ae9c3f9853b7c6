//! Monitor Pipeline
//!
//! One tick of the monitor: collect every source, re-resolve the selection,
//! publish the update, then republish the event log if it changed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::event_log::EventLogStore;
use crate::feed::{MonitorFeed, MonitorUpdate};
use crate::scheduler::TickHandler;
use crate::selection::SelectionCoordinator;

pub struct MonitorPipeline {
    aggregator: Aggregator,
    selection: SelectionCoordinator,
    event_log: Arc<EventLogStore>,
    feed: MonitorFeed,
    detail_event_limit: usize,
    ticks: AtomicU64,
}

impl MonitorPipeline {
    pub fn new(
        aggregator: Aggregator,
        event_log: Arc<EventLogStore>,
        feed_capacity: usize,
        detail_event_limit: usize,
    ) -> Self {
        Self {
            aggregator,
            selection: SelectionCoordinator::new(),
            event_log,
            feed: MonitorFeed::new(feed_capacity),
            detail_event_limit,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn feed(&self) -> &MonitorFeed {
        &self.feed
    }

    pub fn event_log(&self) -> &Arc<EventLogStore> {
        &self.event_log
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Run the whole pipeline once and return the published update
    pub fn run_tick(&self) -> Arc<MonitorUpdate> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;

        let generation = self.selection.generation();
        let snapshot = Arc::new(self.aggregator.collect());
        let selection = self.selection.update_at(&snapshot, generation);

        let detail_events = match selection.selection() {
            Some(s) => self
                .event_log
                .events_for(&s.page_key, &s.category, self.detail_event_limit),
            None => Vec::new(),
        };

        let summary = snapshot.summary;
        let update = Arc::new(MonitorUpdate {
            tick,
            published_at: Utc::now(),
            snapshot,
            selection,
            detail_events,
        });
        self.feed.publish(Arc::clone(&update));

        debug!(
            "[Monitor] Tick {}: total={} in_flight={} failed={}",
            tick, summary.total, summary.in_flight, summary.failed
        );

        // The log is read independently of the page snapshot
        if self.feed.log_revision() != Some(self.event_log.revision()) {
            let (revision, events) = self.event_log.snapshot_with_revision();
            self.feed.publish_log(revision, events);
        }

        update
    }
}

impl TickHandler for MonitorPipeline {
    fn on_tick(&self) {
        self.run_tick();
    }
}
