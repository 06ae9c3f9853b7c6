//! Selection Coordinator
//!
//! Tracks which page the user is inspecting and re-resolves it against every
//! new snapshot. The referenced page may vanish or change state between
//! ticks; a missing page is a stale selection, never an error.

use pagewatch_core::{PageCategory, PageEntity, Selection};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::aggregator::AggregatedSnapshot;

/// What the detail view should show after a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionView {
    /// Nothing selected; detail refresh is suppressed
    Idle,
    /// The selected page is present in the latest snapshot
    Live(PageEntity),
    /// The selected page is missing from the latest snapshot
    Stale {
        selection: Selection,
        /// Last values seen for this selection, if it ever resolved
        last_known: Option<PageEntity>,
    },
}

impl SelectionView {
    pub fn selection(&self) -> Option<Selection> {
        match self {
            SelectionView::Idle => None,
            SelectionView::Live(page) => Some(Selection::new(page.key.clone(), page.category.clone())),
            SelectionView::Stale { selection, .. } => Some(selection.clone()),
        }
    }

    /// The values the detail view should display, live or last-known
    pub fn page(&self) -> Option<&PageEntity> {
        match self {
            SelectionView::Idle => None,
            SelectionView::Live(page) => Some(page),
            SelectionView::Stale { last_known, .. } => last_known.as_ref(),
        }
    }
}

#[derive(Debug, Default)]
struct SelectionState {
    selection: Option<Selection>,
    last_known: Option<PageEntity>,
    /// Bumped on every select and clear
    generation: u64,
}

/// Holds the current selection and publishes its resolution each tick
pub struct SelectionCoordinator {
    state: Mutex<SelectionState>,
    view_tx: watch::Sender<SelectionView>,
}

impl Default for SelectionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionCoordinator {
    pub fn new() -> Self {
        let (view_tx, _) = watch::channel(SelectionView::Idle);
        Self {
            state: Mutex::new(SelectionState::default()),
            view_tx,
        }
    }

    /// Record interest in `(key, category)`, replacing any prior selection.
    ///
    /// The new selection is resolved against the next delivered snapshot,
    /// not against the one currently published.
    pub fn select(&self, key: impl Into<String>, category: PageCategory) {
        let selection = Selection::new(key, category);
        debug!("[Selection] Selected {}", selection);

        let mut state = self.state.lock();
        state.selection = Some(selection);
        state.last_known = None;
        state.generation += 1;
    }

    /// Drop the selection. Publishes `Idle` right away.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock();
            if state.selection.take().is_some() {
                debug!("[Selection] Cleared");
            }
            state.last_known = None;
            state.generation += 1;
        }
        self.publish(SelectionView::Idle);
    }

    /// Look up the current selection in `snapshot` by exact `(key, category)`.
    ///
    /// `None` means either nothing is selected or the selection is stale.
    pub fn resolve(&self, snapshot: &AggregatedSnapshot) -> Option<PageEntity> {
        let mut state = self.state.lock();
        Self::resolve_locked(&mut state, snapshot)
    }

    /// Selection generation; read it before collecting a snapshot and pass
    /// it to [`SelectionCoordinator::update_at`]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Resolve against `snapshot` and publish the resulting view to
    /// subscribers if it changed.
    pub fn update(&self, snapshot: &AggregatedSnapshot) -> SelectionView {
        self.update_at(snapshot, self.generation())
    }

    /// Like [`SelectionCoordinator::update`], for a snapshot collected while
    /// the selection was at `generation`.
    ///
    /// If the selection changed since, the snapshot predates it: nothing is
    /// resolved and the published view is returned unchanged. The new
    /// selection resolves on the next snapshot.
    pub fn update_at(&self, snapshot: &AggregatedSnapshot, generation: u64) -> SelectionView {
        let view = {
            let mut state = self.state.lock();
            if state.generation != generation {
                debug!("[Selection] Changed during collect, resolving next tick");
                return self.view();
            }
            match Self::resolve_locked(&mut state, snapshot) {
                Some(page) => SelectionView::Live(page),
                None => match state.selection {
                    None => SelectionView::Idle,
                    Some(ref selection) => SelectionView::Stale {
                        selection: selection.clone(),
                        last_known: state.last_known.clone(),
                    },
                },
            }
        };

        self.publish(view.clone());
        view
    }

    /// Latest published view
    pub fn view(&self) -> SelectionView {
        self.view_tx.borrow().clone()
    }

    /// Receive every change of the published view
    pub fn subscribe(&self) -> watch::Receiver<SelectionView> {
        self.view_tx.subscribe()
    }

    fn resolve_locked(state: &mut SelectionState, snapshot: &AggregatedSnapshot) -> Option<PageEntity> {
        let selection = state.selection.as_ref()?;
        let page = snapshot.find(selection)?.clone();
        state.last_known = Some(page.clone());
        Some(page)
    }

    fn publish(&self, view: SelectionView) {
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
