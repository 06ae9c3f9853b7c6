//! Page Monitor
//!
//! Facade handed to the presentation layer: owns the pipeline and the
//! scheduler that drives it. Dropping the monitor cancels ticking.

use std::sync::Arc;

use pagewatch_core::{LogEvent, MonitorError, MonitorResult, PageCategory};
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::aggregator::Aggregator;
use crate::config::MonitorConfig;
use crate::event_log::EventLogStore;
use crate::feed::MonitorUpdate;
use crate::pipeline::MonitorPipeline;
use crate::scheduler::{
    RefreshScheduler, SchedulerError, SchedulerState, SchedulerStats, TickHandler, TickOutcome,
};
use crate::selection::SelectionView;

impl From<SchedulerError> for MonitorError {
    fn from(e: SchedulerError) -> Self {
        MonitorError::scheduler(e.to_string())
    }
}

pub struct PageMonitor {
    pipeline: Arc<MonitorPipeline>,
    scheduler: RefreshScheduler,
}

impl PageMonitor {
    /// Create a new PageMonitor in the stopped state
    pub fn new(
        config: &MonitorConfig,
        aggregator: Aggregator,
        event_log: Arc<EventLogStore>,
    ) -> MonitorResult<Self> {
        config.validate()?;

        let pipeline = Arc::new(MonitorPipeline::new(
            aggregator,
            event_log,
            config.feed_capacity,
            config.detail_event_limit,
        ));
        let scheduler = RefreshScheduler::new(
            config.refresh_interval,
            Arc::clone(&pipeline) as Arc<dyn TickHandler>,
        )?;

        Ok(Self {
            pipeline,
            scheduler,
        })
    }

    /// Start periodic refresh. Returns `Ok(false)` if already running.
    pub fn start(&self) -> MonitorResult<bool> {
        let started = self.scheduler.start()?;
        if started {
            info!(
                "[Monitor] Watching {} sources every {:?}",
                self.pipeline.aggregator().source_count(),
                self.scheduler.period()
            );
        }
        Ok(started)
    }

    /// Stop periodic refresh. Returns `false` if already stopped.
    pub async fn stop(&self) -> bool {
        self.scheduler.stop().await
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Run one tick now, subject to the overlap-drop rule
    pub fn trigger_immediate_refresh(&self) -> TickOutcome {
        self.scheduler.trigger_immediate_refresh()
    }

    /// Most recent update (pull)
    pub fn latest(&self) -> Arc<MonitorUpdate> {
        self.pipeline.feed().latest()
    }

    /// Every update from now on (push)
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<MonitorUpdate>> {
        self.pipeline.feed().subscribe()
    }

    pub fn watch_latest(&self) -> watch::Receiver<Arc<MonitorUpdate>> {
        self.pipeline.feed().watch_latest()
    }

    pub fn set_selection(&self, key: impl Into<String>, category: PageCategory) {
        self.pipeline.selection().select(key, category);
    }

    pub fn clear_selection(&self) {
        self.pipeline.selection().clear();
    }

    pub fn selection_view(&self) -> SelectionView {
        self.pipeline.selection().view()
    }

    pub fn watch_selection(&self) -> watch::Receiver<SelectionView> {
        self.pipeline.selection().subscribe()
    }

    pub fn event_log(&self) -> &Arc<EventLogStore> {
        self.pipeline.event_log()
    }

    /// Event log as of the last tick
    pub fn log_events(&self) -> Arc<Vec<LogEvent>> {
        self.pipeline.feed().log_events()
    }

    pub fn watch_log(&self) -> watch::Receiver<Arc<Vec<LogEvent>>> {
        self.pipeline.feed().watch_log()
    }
}
