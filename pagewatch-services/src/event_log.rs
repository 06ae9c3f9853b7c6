//! Event Log Store
//!
//! Append-only, in-memory history of page lifecycle events shared by every
//! producer and observer in the process. Growth is unbounded until `clear`.

use std::sync::Arc;

use pagewatch_core::{LogEvent, PageCategory};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct LogInner {
    events: Vec<LogEvent>,
    /// Bumped on every append and clear
    revision: u64,
}

/// Shared event log. Construct one per process (or per test) and hand out
/// clones of the `Arc`.
#[derive(Debug, Default)]
pub struct EventLogStore {
    inner: RwLock<LogInner>,
}

impl EventLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already wrapped for sharing
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Append one event. Insertion order is chronological order.
    pub fn append(&self, event: LogEvent) {
        let mut inner = self.inner.write();
        inner.events.push(event);
        inner.revision += 1;
    }

    /// Point-in-time copy of every event, oldest first
    pub fn snapshot(&self) -> Vec<LogEvent> {
        self.inner.read().events.clone()
    }

    /// Snapshot together with the revision it was taken at
    pub fn snapshot_with_revision(&self) -> (u64, Vec<LogEvent>) {
        let inner = self.inner.read();
        (inner.revision, inner.events.clone())
    }

    /// Drop all history atomically
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let dropped = inner.events.len();
        inner.events = Vec::new();
        inner.revision += 1;
        drop(inner);

        debug!("[EventLog] Cleared {} events", dropped);
    }

    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    /// Monotonic change counter; differs between two reads iff the log changed
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// The most recent `limit` events for one page, oldest first
    pub fn events_for(&self, page_key: &str, category: &PageCategory, limit: usize) -> Vec<LogEvent> {
        let inner = self.inner.read();
        let mut recent: Vec<LogEvent> = inner
            .events
            .iter()
            .rev()
            .filter(|e| e.is_for(page_key, category))
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::LogEventKind;
    use std::thread;

    fn event(key: &str, message: &str) -> LogEvent {
        LogEvent::new(PageCategory::Candle, key, LogEventKind::Info, message)
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let log = EventLogStore::new();
        log.append(event("BTCUSDT-1h", "E1"));
        log.append(event("BTCUSDT-1h", "E2"));
        log.append(event("ETHUSDT-1h", "E3"));

        let messages: Vec<_> = log.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["E1", "E2", "E3"]);
    }

    #[test]
    fn test_clear_empties_store() {
        let log = EventLogStore::new();
        log.append(event("BTCUSDT-1h", "E1"));
        log.append(event("BTCUSDT-1h", "E2"));

        log.clear();

        assert!(log.snapshot().is_empty());
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_revision_tracks_every_change() {
        let log = EventLogStore::new();
        let r0 = log.revision();

        log.append(event("BTCUSDT-1h", "E1"));
        let r1 = log.revision();
        assert!(r1 > r0);

        log.clear();
        assert!(log.revision() > r1);

        // Clearing an empty log is still a change
        let r2 = log.revision();
        log.clear();
        assert!(log.revision() > r2);
    }

    #[test]
    fn test_events_for_returns_latest_in_order() {
        let log = EventLogStore::new();
        for i in 0..5 {
            log.append(event("BTCUSDT-1h", &format!("btc-{i}")));
            log.append(event("ETHUSDT-1h", &format!("eth-{i}")));
        }
        log.append(LogEvent::new(
            PageCategory::Funding,
            "BTCUSDT-1h",
            LogEventKind::Info,
            "funding",
        ));

        let recent = log.events_for("BTCUSDT-1h", &PageCategory::Candle, 3);
        let messages: Vec<_> = recent.into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["btc-2", "btc-3", "btc-4"]);
    }

    #[test]
    fn test_concurrent_clear_is_never_partial() {
        let log = Arc::new(EventLogStore::new());
        for i in 0..100 {
            log.append(event("BTCUSDT-1h", &format!("old-{i}")));
        }

        let reader = {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let events = log.snapshot();
                    let old = events.iter().filter(|e| e.message.starts_with("old-")).count();
                    // Either the full pre-clear view or a post-clear view, never a mix
                    assert!(old == 0 || (old == 100 && events.len() == 100));
                    for (i, e) in events.iter().enumerate() {
                        if old == 0 {
                            assert_eq!(e.message, format!("new-{i}"));
                        }
                    }
                }
            })
        };

        let writer = {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                log.clear();
                for i in 0..100 {
                    log.append(event("BTCUSDT-1h", &format!("new-{i}")));
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(log.len(), 100);
    }
}
