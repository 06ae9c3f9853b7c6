//! Page State Sources
//!
//! A source owns the authoritative lifecycle state of the pages in one
//! category. Producers (fetch workers) mutate it in the background; the
//! monitor only ever reads point-in-time copies.

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use pagewatch_core::{LogEvent, LogEventKind, PageCategory, PageEntity, PageState};
use parking_lot::RwLock;
use tracing::debug;

use crate::event_log::EventLogStore;

/// Read side of a page state owner.
///
/// `active_pages` must return a consistent copy: no entity may be observed
/// half-updated. Implementations should be cheap and must not block on I/O,
/// since they are called from the refresh tick.
pub trait PageStateSource: Send + Sync {
    fn active_pages(&self) -> Vec<PageEntity>;
}

/// In-memory page state owner for a single category.
///
/// Pages are reported in the order they were first tracked.
pub struct PageRegistry {
    category: PageCategory,
    pages: RwLock<IndexMap<String, PageEntity>>,
    /// Optional sink for lifecycle events
    event_log: Option<Arc<EventLogStore>>,
}

impl PageRegistry {
    /// Create a new PageRegistry
    pub fn new(category: PageCategory) -> Self {
        Self {
            category,
            pages: RwLock::new(IndexMap::new()),
            event_log: None,
        }
    }

    /// Record every lifecycle change in the given event log
    pub fn with_event_log(mut self, event_log: Arc<EventLogStore>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn category(&self) -> &PageCategory {
        &self.category
    }

    /// Start tracking a page in the `Idle` state.
    ///
    /// Returns `false` if the page was already tracked.
    pub fn track(&self, key: impl Into<String>) -> bool {
        let key = key.into();
        {
            let mut pages = self.pages.write();
            if pages.contains_key(&key) {
                return false;
            }
            let page = PageEntity::new(key.clone(), self.category.clone(), PageState::Idle)
                .with_last_updated(Utc::now());
            pages.insert(key.clone(), page);
        }

        debug!("[{}] Now tracking page {}", self.category, key);
        self.record(&key, LogEventKind::Tracked, "tracking started".to_string());
        true
    }

    /// Move a tracked page to `state`.
    ///
    /// Returns `false` if the page is not tracked.
    pub fn set_state(&self, key: &str, state: PageState) -> bool {
        let previous = {
            let mut pages = self.pages.write();
            let Some(page) = pages.get_mut(key) else {
                return false;
            };
            let previous = std::mem::replace(&mut page.state, state.clone());
            if state != PageState::Error {
                page.error_detail = None;
            }
            page.last_updated = Some(Utc::now());
            previous
        };

        if previous != state {
            self.record(
                key,
                LogEventKind::StateChanged,
                format!("{} -> {}", previous, state),
            );
        }
        true
    }

    /// Mark a tracked page as failed with a detail message.
    ///
    /// Returns `false` if the page is not tracked.
    pub fn fail(&self, key: &str, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        {
            let mut pages = self.pages.write();
            let Some(page) = pages.get_mut(key) else {
                return false;
            };
            page.state = PageState::Error;
            page.error_detail = Some(detail.clone());
            page.last_updated = Some(Utc::now());
        }

        self.record(key, LogEventKind::Failed, detail);
        true
    }

    /// Stop tracking a page, returning its last state
    pub fn untrack(&self, key: &str) -> Option<PageEntity> {
        let removed = self.pages.write().shift_remove(key)?;

        debug!("[{}] Stopped tracking page {}", self.category, key);
        self.record(
            key,
            LogEventKind::Untracked,
            format!("tracking stopped in state {}", removed.state),
        );
        Some(removed)
    }

    pub fn get(&self, key: &str) -> Option<PageEntity> {
        self.pages.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }

    fn record(&self, key: &str, kind: LogEventKind, message: String) {
        if let Some(ref log) = self.event_log {
            log.append(LogEvent::new(self.category.clone(), key, kind, message));
        }
    }
}

impl PageStateSource for PageRegistry {
    fn active_pages(&self) -> Vec<PageEntity> {
        self.pages.read().values().cloned().collect()
    }
}
