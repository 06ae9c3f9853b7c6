//! Refresh Scheduler
//!
//! Drives a tick handler on a fixed period. Ticks never overlap: a tick that
//! comes due while the previous one is still running is dropped, not queued.
//!
//! ## Cancellation
//!
//! Every tick checks the running flag while holding the tick gate, and
//! `stop()` clears the flag before waiting for the gate. Once `stop()`
//! returns, no handler invocation is in progress and none will start.
//! Dropping the scheduler clears the flag too, so no handler starts after
//! the owner is gone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Work executed on every tick
pub trait TickHandler: Send + Sync + 'static {
    fn on_tick(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Result of asking for a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The handler ran to completion
    Ran,
    /// Another tick was in flight; this one was dropped
    Skipped,
    /// The scheduler is not running
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub ticks_run: u64,
    pub ticks_skipped: u64,
    pub running: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("No Tokio runtime available to drive the scheduler")]
    NoRuntime,

    #[error("Refresh period must be greater than zero")]
    ZeroPeriod,
}

/// State shared between the scheduler handle and its tick loop
struct TickShared {
    handler: Arc<dyn TickHandler>,
    running: AtomicBool,
    /// Held for the whole duration of a tick
    gate: Arc<AsyncMutex<()>>,
    ticks_run: AtomicU64,
    ticks_skipped: AtomicU64,
}

impl TickShared {
    fn try_begin(&self) -> Option<OwnedMutexGuard<()>> {
        match Arc::clone(&self.gate).try_lock_owned() {
            Ok(guard) => Some(guard),
            Err(_) => {
                self.ticks_skipped.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    /// Run the handler. The caller must hold the gate.
    fn run_gated(&self, _gate: &OwnedMutexGuard<()>) -> TickOutcome {
        if !self.running.load(Ordering::SeqCst) {
            return TickOutcome::Stopped;
        }
        self.handler.on_tick();
        self.ticks_run.fetch_add(1, Ordering::SeqCst);
        TickOutcome::Ran
    }
}

struct LoopHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Periodic, non-overlapping tick driver with a `Stopped -> Running -> Stopped`
/// lifecycle. `start` and `stop` are both idempotent.
pub struct RefreshScheduler {
    period: Duration,
    shared: Arc<TickShared>,
    control: Mutex<Option<LoopHandle>>,
}

impl RefreshScheduler {
    /// Create a stopped scheduler
    pub fn new(period: Duration, handler: Arc<dyn TickHandler>) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }

        Ok(Self {
            period,
            shared: Arc::new(TickShared {
                handler,
                running: AtomicBool::new(false),
                gate: Arc::new(AsyncMutex::new(())),
                ticks_run: AtomicU64::new(0),
                ticks_skipped: AtomicU64::new(0),
            }),
            control: Mutex::new(None),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> SchedulerState {
        if self.shared.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks_run: self.shared.ticks_run.load(Ordering::SeqCst),
            ticks_skipped: self.shared.ticks_skipped.load(Ordering::SeqCst),
            running: self.shared.running.load(Ordering::SeqCst),
        }
    }

    /// Begin ticking on the current Tokio runtime. The first tick fires
    /// immediately.
    ///
    /// Returns `Ok(false)` if the scheduler was already running.
    pub fn start(&self) -> Result<bool, SchedulerError> {
        let mut control = self.control.lock();
        if control.is_some() {
            warn!("[Scheduler] start() called while already running");
            return Ok(false);
        }

        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        self.shared.running.store(true, Ordering::SeqCst);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(Self::run_loop(
            Arc::clone(&self.shared),
            self.period,
            shutdown_rx,
        ));

        *control = Some(LoopHandle { shutdown_tx, task });
        info!("[Scheduler] Started with {:?} period", self.period);
        Ok(true)
    }

    /// Cancel future ticks and wait for any tick in progress.
    ///
    /// Returns `false` if the scheduler was already stopped. Either way, no
    /// handler runs after this returns.
    pub async fn stop(&self) -> bool {
        let handle = {
            let mut control = self.control.lock();
            self.shared.running.store(false, Ordering::SeqCst);
            let handle = control.take();
            if let Some(ref h) = handle {
                let _ = h.shutdown_tx.send(true);
            }
            handle
        };

        let was_running = handle.is_some();
        if let Some(handle) = handle {
            if let Err(e) = handle.task.await {
                warn!("[Scheduler] Tick loop ended abnormally: {}", e);
            }
        }

        // Wait out any tick still holding the gate (e.g. an immediate refresh)
        drop(self.shared.gate.lock().await);

        if was_running {
            let stats = self.stats();
            info!(
                "[Scheduler] Stopped after {} ticks ({} skipped)",
                stats.ticks_run, stats.ticks_skipped
            );
        }
        was_running
    }

    /// Run one tick now, on the calling thread, outside the normal cadence.
    ///
    /// Subject to the same overlap rule as scheduled ticks: if a tick is in
    /// flight this returns `Skipped` without waiting.
    pub fn trigger_immediate_refresh(&self) -> TickOutcome {
        if !self.shared.running.load(Ordering::SeqCst) {
            return TickOutcome::Stopped;
        }
        match self.shared.try_begin() {
            Some(gate) => self.shared.run_gated(&gate),
            None => {
                debug!("[Scheduler] Immediate refresh dropped, tick in flight");
                TickOutcome::Skipped
            }
        }
    }

    async fn run_loop(
        shared: Arc<TickShared>,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<TickOutcome>> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let Some(gate) = shared.try_begin() else {
                debug!("[Scheduler] Tick dropped, previous tick still running");
                continue;
            };

            let tick_shared = Arc::clone(&shared);
            in_flight = Some(tokio::task::spawn_blocking(move || {
                tick_shared.run_gated(&gate)
            }));
        }

        if let Some(handle) = in_flight {
            if let Err(e) = handle.await {
                warn!("[Scheduler] Last tick failed: {}", e);
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.control.get_mut().take() {
            let _ = handle.shutdown_tx.send(true);
            handle.task.abort();
        }
    }
}
