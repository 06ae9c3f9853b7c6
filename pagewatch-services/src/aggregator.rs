//! Page State Aggregator
//!
//! Pulls a point-in-time copy from every registered page source, concatenates
//! them in registration order, and derives the summary counts shown by the
//! status view. Sources progress independently; no cross-source consistency
//! is assumed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pagewatch_core::{PageCategory, PageEntity, PageState, Selection, StateClass};
use serde::Serialize;
use tracing::trace;

use crate::source::PageStateSource;

/// Derived counts for a set of pages.
///
/// `total == in_flight + failed + settled` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub total: usize,
    pub in_flight: usize,
    pub failed: usize,
    pub settled: usize,
}

impl SnapshotSummary {
    fn record(&mut self, state: &PageState) {
        self.total += 1;
        match state.class() {
            StateClass::InFlight => self.in_flight += 1,
            StateClass::Failed => self.failed += 1,
            StateClass::Settled => self.settled += 1,
        }
    }

    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a PageEntity>) -> Self {
        let mut summary = Self::default();
        for page in pages {
            summary.record(&page.state);
        }
        summary
    }
}

/// Counts contributed by one registered source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: PageCategory,
    /// `false` when the slot has no source behind it
    pub configured: bool,
    pub counts: SnapshotSummary,
}

/// One tick's reconciled view of every source
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedSnapshot {
    /// Source registration order, then source-internal order
    pub pages: Vec<PageEntity>,
    pub summary: SnapshotSummary,
    pub by_category: Vec<CategorySummary>,
    pub collected_at: DateTime<Utc>,
}

impl AggregatedSnapshot {
    /// Snapshot with no pages, used before the first tick
    pub fn empty() -> Self {
        Self {
            pages: Vec::new(),
            summary: SnapshotSummary::default(),
            by_category: Vec::new(),
            collected_at: Utc::now(),
        }
    }

    /// Find the page matching a selection exactly
    pub fn find(&self, selection: &Selection) -> Option<&PageEntity> {
        self.pages.iter().find(|page| selection.matches(page))
    }

    pub fn category(&self, category: &PageCategory) -> Option<&CategorySummary> {
        self.by_category.iter().find(|c| &c.category == category)
    }
}

/// A registration slot. A slot may be left unconfigured, in which case it
/// contributes nothing.
struct SourceSlot {
    category: PageCategory,
    source: Option<Arc<dyn PageStateSource>>,
}

/// Collects snapshots from an ordered set of page sources
#[derive(Default)]
pub struct Aggregator {
    slots: Vec<SourceSlot>,
}

impl Aggregator {
    /// Create a new Aggregator with no sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source for `category`. `None` registers the category as not
    /// configured.
    pub fn register(&mut self, category: PageCategory, source: Option<Arc<dyn PageStateSource>>) {
        self.slots.push(SourceSlot { category, source });
    }

    /// Builder form of [`Aggregator::register`]
    pub fn with_source(
        mut self,
        category: PageCategory,
        source: Option<Arc<dyn PageStateSource>>,
    ) -> Self {
        self.register(category, source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.source.is_some()).count()
    }

    /// Pull every configured source and reconcile into one snapshot.
    ///
    /// Never fails: absent sources are skipped, and pages in `Error` are
    /// counted rather than raised.
    pub fn collect(&self) -> AggregatedSnapshot {
        let mut pages = Vec::new();
        let mut by_category = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            let Some(ref source) = slot.source else {
                trace!("[Aggregator] No source configured for {}", slot.category);
                by_category.push(CategorySummary {
                    category: slot.category.clone(),
                    configured: false,
                    counts: SnapshotSummary::default(),
                });
                continue;
            };

            let source_pages = source.active_pages();
            by_category.push(CategorySummary {
                category: slot.category.clone(),
                configured: true,
                counts: SnapshotSummary::from_pages(&source_pages),
            });
            pages.extend(source_pages);
        }

        let summary = SnapshotSummary::from_pages(&pages);

        AggregatedSnapshot {
            pages,
            summary,
            by_category,
            collected_at: Utc::now(),
        }
    }
}
