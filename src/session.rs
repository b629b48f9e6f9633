//! Interactive events-grid session: the page-level container that owns
//! the record store and filter state, mirrors every committed filter
//! change into the URL, and recomputes the visible list on each change.
//!
//! Discrete selections (view, category, sort, editor apply) commit
//! immediately. Search text is debounced; a selection that lands while a
//! search is still waiting cancels the timer and commits both together.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::api::EventSource;
use crate::coordinator::{self, LoadStatus, RefetchCoordinator, RefetchPolicy, Resolution, Ticket};
use crate::debounce::Debouncer;
use crate::editor::FilterEditor;
use crate::engine::{self, GridSummary};
use crate::filters::{FilterState, SortKey, ViewMode};
use crate::models::Event;
use crate::store::EventStore;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub policy: RefetchPolicy,
    pub search_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            policy: RefetchPolicy::default(),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryMode {
    Push,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub href: String,
    pub mode: HistoryMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridPhase {
    Loading,
    Failed(String),
    Empty,
    Results,
}

/// Everything a renderer needs after a state change.
#[derive(Debug, Clone, Default)]
pub struct GridSnapshot {
    pub filters: FilterState,
    /// Text currently in the search box, possibly not yet committed.
    pub search_input: String,
    pub href: String,
    pub status: LoadStatus,
    pub events: Vec<Event>,
    pub summary: GridSummary,
    pub categories: Vec<String>,
    /// Ids of visible records whose notes are expanded.
    pub expanded_notes: HashSet<String>,
}

impl GridSnapshot {
    pub fn notes_expanded(&self, id: &str) -> bool {
        self.expanded_notes.contains(id)
    }

    pub fn phase(&self) -> GridPhase {
        match &self.status {
            LoadStatus::Loading => GridPhase::Loading,
            LoadStatus::Failed(message) => GridPhase::Failed(message.clone()),
            LoadStatus::Ready if self.events.is_empty() => GridPhase::Empty,
            LoadStatus::Ready => GridPhase::Results,
        }
    }
}

struct SessionState {
    store: EventStore,
    filters: FilterState,
    draft_search: String,
    coordinator: RefetchCoordinator,
    location: String,
    history: Vec<HistoryEntry>,
}

struct Inner {
    source: Arc<dyn EventSource>,
    state: Mutex<SessionState>,
    debouncer: Mutex<Debouncer>,
    snapshots: watch::Sender<GridSnapshot>,
}

#[derive(Clone)]
pub struct GridSession {
    inner: Arc<Inner>,
}

impl GridSession {
    /// Session with nothing loaded; the first `navigate` fetches.
    pub fn new(source: Arc<dyn EventSource>, options: SessionOptions) -> Self {
        Self::with_store(source, options, EventStore::default())
    }

    /// Like [`GridSession::new`] but keeps whatever `store` already holds
    /// (typically just the category list) until the first fetch lands.
    pub fn with_store(
        source: Arc<dyn EventSource>,
        options: SessionOptions,
        store: EventStore,
    ) -> Self {
        Self::build(source, options, store, FilterState::default(), false)
    }

    /// Session whose store already holds the records for `filters`.
    pub fn with_preloaded(
        source: Arc<dyn EventSource>,
        options: SessionOptions,
        store: EventStore,
        filters: FilterState,
    ) -> Self {
        Self::build(source, options, store, filters, true)
    }

    fn build(
        source: Arc<dyn EventSource>,
        options: SessionOptions,
        store: EventStore,
        filters: FilterState,
        seeded: bool,
    ) -> Self {
        let mut coordinator = RefetchCoordinator::new(options.policy);
        if seeded {
            coordinator.seed(&filters);
        }
        let state = SessionState {
            location: filters.href(),
            draft_search: filters.search.clone(),
            store,
            filters,
            coordinator,
            history: Vec::new(),
        };
        let (snapshots, _) = watch::channel(snapshot_of(&state));
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(state),
                debouncer: Mutex::new(Debouncer::new(options.search_debounce)),
                snapshots,
            }),
        }
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GridSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn filters(&self) -> FilterState {
        self.inner.lock().filters.clone()
    }

    pub fn location(&self) -> String {
        self.inner.lock().location.clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.clone()
    }

    /// Inbound navigation: the URL is authoritative and is not pushed again.
    pub async fn navigate(&self, query: &str) {
        self.inner.cancel_search();
        let next = FilterState::decode(query);
        let ticket = self.inner.commit(|_| next, None);
        self.inner.run(ticket).await;
    }

    /// Records a keystroke in the search box; commits after the debounce delay.
    pub fn type_search(&self, text: impl Into<String>) {
        {
            let mut state = self.inner.lock();
            state.draft_search = text.into();
            self.inner.publish(&state);
        }

        let inner = Arc::clone(&self.inner);
        self.inner.debouncer().schedule(async move {
            let ticket = inner.commit(|filters| filters.clone(), Some(HistoryMode::Replace));
            if let Some(ticket) = ticket {
                tokio::spawn(async move { inner.run(Some(ticket)).await });
            }
        });
    }

    pub fn search_pending(&self) -> bool {
        self.inner.debouncer().is_pending()
    }

    pub async fn select_view(&self, view: ViewMode) {
        self.change(|filters| filters.with_view(view)).await;
    }

    pub async fn select_category(&self, category: impl Into<String>) {
        let category = category.into();
        self.change(move |filters| filters.with_category(category)).await;
    }

    pub async fn select_sort(&self, sort: SortKey) {
        self.change(|filters| filters.with_sort(sort)).await;
    }

    pub async fn remove_category(&self) {
        self.change(|filters| filters.remove_category()).await;
    }

    pub async fn clear_search(&self) {
        self.change(|filters| filters.remove_search()).await;
    }

    pub async fn clear_filters(&self) {
        self.change(|_| FilterState::clear()).await;
    }

    pub fn open_editor(&self) -> FilterEditor {
        FilterEditor::open(&self.inner.lock().filters)
    }

    pub async fn apply_editor(&self, editor: FilterEditor) {
        self.change(move |filters| editor.apply(filters)).await;
    }

    /// Re-runs the last fetch after a failure.
    pub async fn retry(&self) {
        let ticket = {
            let mut state = self.inner.lock();
            let ticket = state.coordinator.retry();
            self.inner.publish(&state);
            ticket
        };
        self.inner.run(ticket).await;
    }

    pub fn toggle_notes(&self, id: &str) -> bool {
        let mut state = self.inner.lock();
        let expanded = state.store.toggle_notes(id);
        self.inner.publish(&state);
        expanded
    }

    pub fn notes_expanded(&self, id: &str) -> bool {
        self.inner.lock().store.notes_expanded(id)
    }

    async fn change<F>(&self, update: F)
    where
        F: FnOnce(&FilterState) -> FilterState,
    {
        self.inner.cancel_search();
        let ticket = self.inner.commit(update, Some(HistoryMode::Push));
        self.inner.run(ticket).await;
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn debouncer(&self) -> MutexGuard<'_, Debouncer> {
        self.debouncer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_search(&self) {
        if self.debouncer().cancel() {
            debug!("pending search folded into selection change");
        }
    }

    /// Applies `update` to the committed filters (with the draft search
    /// folded in) and returns a ticket if upstream must be asked again.
    fn commit<F>(&self, update: F, mode: Option<HistoryMode>) -> Option<Ticket>
    where
        F: FnOnce(&FilterState) -> FilterState,
    {
        let mut guard = self.lock();
        let state = &mut *guard;
        let base = state.filters.with_search(state.draft_search.clone());
        let next = update(&base);

        state.draft_search = next.search.clone();
        state.filters = next;
        let href = state.filters.href();
        if let Some(mode) = mode {
            if href != state.location {
                state.history.push(HistoryEntry {
                    href: href.clone(),
                    mode,
                });
            }
        }
        state.location = href;

        let ticket = state.coordinator.transition(&state.filters);
        self.publish(state);
        ticket
    }

    async fn run(&self, ticket: Option<Ticket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let result = coordinator::execute(self.source.as_ref(), ticket.plan()).await;

        let mut state = self.lock();
        match state.coordinator.resolve(&ticket, result) {
            Resolution::Apply(records) => state.store.replace_records(records),
            Resolution::Failed => {}
            Resolution::Stale => return,
        }
        self.publish(&state);
    }

    fn publish(&self, state: &SessionState) {
        self.snapshots.send_replace(snapshot_of(state));
    }
}

fn snapshot_of(state: &SessionState) -> GridSnapshot {
    let visible = engine::apply(state.store.current(), &state.filters);
    let expanded_notes = visible
        .iter()
        .filter(|event| state.store.notes_expanded(&event.id))
        .map(|event| event.id.clone())
        .collect();
    GridSnapshot {
        filters: state.filters.clone(),
        search_input: state.draft_search.clone(),
        href: state.location.clone(),
        status: state.coordinator.status().clone(),
        summary: engine::summarize(&visible),
        events: visible.into_iter().cloned().collect(),
        categories: state.store.categories().to_vec(),
        expanded_notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListParams;
    use crate::testing::{event, open_event, FakeSource, FetchCall};
    use pretty_assertions::assert_eq;

    fn ids(snapshot: &GridSnapshot) -> Vec<String> {
        snapshot.events.iter().map(|e| e.id.clone()).collect()
    }

    fn listing(category: Option<&str>, search: Option<&str>) -> FetchCall {
        FetchCall::List(ListParams {
            limit: Some(500),
            skip: None,
            category: category.map(str::to_string),
            search: search.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn sort_only_changes_never_fetch() {
        let source = Arc::new(
            FakeSource::new()
                .with_records(FetchCall::Open, vec![open_event("a", 9), open_event("b", 2)]),
        );
        let session = GridSession::new(source.clone(), SessionOptions::default());
        session.navigate("/").await;
        assert_eq!(source.calls(), vec![FetchCall::Open]);
        assert_eq!(ids(&session.snapshot()), vec!["b", "a"]);

        session.select_sort(SortKey::Relevance).await;
        session.select_sort(SortKey::DateDescending).await;
        assert_eq!(source.calls().len(), 1);
        assert_eq!(session.location(), "/?sort=dateDesc");
    }

    #[tokio::test]
    async fn superseded_fetch_never_wins() {
        let source = Arc::new(FakeSource::gated());
        let session = GridSession::new(source.clone(), SessionOptions::default());

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.select_view(ViewMode::All).await }
        });
        let gate_a = source.take_gate().await;

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.select_view(ViewMode::Upcoming).await }
        });
        let gate_b = source.take_gate().await;
        assert_eq!(gate_b.call, FetchCall::Upcoming(365));

        gate_b.resolve(vec![event("b", "Bravo", "Expo")]);
        second.await.expect("second task");
        gate_a.resolve(vec![event("a", "Alpha", "Expo")]);
        first.await.expect("first task");

        let snapshot = session.snapshot();
        assert_eq!(ids(&snapshot), vec!["b"]);
        assert_eq!(snapshot.status, LoadStatus::Ready);
        assert_eq!(snapshot.filters.view, ViewMode::Upcoming);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_records_until_retry() {
        let source = Arc::new(
            FakeSource::new()
                .with_records(FetchCall::Open, vec![open_event("kept", 3)])
                .with_records(
                    FetchCall::Upcoming(365),
                    vec![event("new", "Upcoming Expo", "Expo")],
                ),
        );
        let session = GridSession::new(source.clone(), SessionOptions::default());
        session.navigate("").await;

        source.fail_next(1);
        session.select_view(ViewMode::Upcoming).await;
        let failed = session.snapshot();
        assert!(matches!(failed.phase(), GridPhase::Failed(_)));
        assert_eq!(ids(&failed), vec!["kept"]);

        session.retry().await;
        let recovered = session.snapshot();
        assert_eq!(recovered.phase(), GridPhase::Results);
        assert_eq!(ids(&recovered), vec!["new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn search_is_debounced_into_one_commit() {
        let source = Arc::new(FakeSource::new());
        let session = GridSession::new(source.clone(), SessionOptions::default());
        session.navigate("?view=all").await;

        for text in ["j", "ja", "jam"] {
            session.type_search(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(session.snapshot().search_input, "jam");
        assert_eq!(session.filters().search, "");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(
            source.calls(),
            vec![listing(None, None), listing(None, Some("jam"))]
        );
        assert_eq!(
            session.history(),
            vec![HistoryEntry {
                href: "/?view=all&search=jam".into(),
                mode: HistoryMode::Replace,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn selection_during_pending_search_commits_both() {
        let source = Arc::new(FakeSource::new());
        let session = GridSession::new(source.clone(), SessionOptions::default());
        session.navigate("?view=all").await;

        session.type_search("jam");
        assert!(session.search_pending());
        session.select_category("Award").await;
        assert!(!session.search_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            source.calls(),
            vec![listing(None, None), listing(Some("Award"), Some("jam"))]
        );
        assert_eq!(session.location(), "/?view=all&search=jam&type=Award");
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn all_view_shows_server_filtered_records_as_is() {
        let source = Arc::new(FakeSource::new().with_records(
            listing(Some("Award"), Some("indie")),
            vec![event("x", "Indie Showcase", "Festival")],
        ));
        let session = GridSession::new(source.clone(), SessionOptions::default());
        session
            .navigate("view=all&type=Award&search=indie")
            .await;

        assert_eq!(source.calls(), vec![listing(Some("Award"), Some("indie"))]);
        assert_eq!(ids(&session.snapshot()), vec!["x"]);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn preloaded_session_refilters_locally() {
        let store = EventStore::new(
            vec![
                event("1", "Spring Game Jam", "Game Jam"),
                event("2", "Winter Expo", "Expo"),
            ],
            vec!["Game Jam".into(), "Expo".into()],
        );
        let source = Arc::new(FakeSource::new());
        let session = GridSession::with_preloaded(
            source.clone(),
            SessionOptions::default(),
            store,
            FilterState::default(),
        );

        session.select_category("Expo").await;
        assert!(source.calls().is_empty());
        assert_eq!(ids(&session.snapshot()), vec!["2"]);
        assert_eq!(session.snapshot().categories.len(), 2);

        let mut editor = session.open_editor();
        editor.set_view(ViewMode::Upcoming);
        editor.set_category("");
        session.apply_editor(editor).await;
        assert_eq!(source.calls(), vec![FetchCall::Upcoming(365)]);
        assert_eq!(session.snapshot().phase(), GridPhase::Empty);
    }

    #[tokio::test]
    async fn subscribers_see_each_commit() {
        let source = Arc::new(
            FakeSource::new().with_records(FetchCall::Open, vec![open_event("a", 1)]),
        );
        let session = GridSession::new(source, SessionOptions::default());
        let mut rx = session.subscribe();
        session.navigate("/").await;
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(rx.borrow_and_update().summary.closing_soon, 1);

        assert!(session.toggle_notes("a"));
        assert!(session.notes_expanded("a"));
    }

    #[tokio::test]
    async fn notes_toggle_is_published_and_rendered() {
        let mut noted = open_event("a", 20);
        noted.comments = Some("Needs a playable demo".into());
        let source = Arc::new(FakeSource::new().with_records(FetchCall::Open, vec![noted]));
        let session = GridSession::new(source, SessionOptions::default());
        session.navigate("/").await;
        let mut rx = session.subscribe();
        rx.borrow_and_update();

        assert!(session.toggle_notes("a"));
        assert!(rx.has_changed().expect("sender alive"));
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.notes_expanded("a"));
        let html = crate::render::grid(&snapshot).into_string();
        assert!(html.contains(r#"<details class="notes" open>"#));

        assert!(!session.toggle_notes("a"));
        assert!(!session.snapshot().notes_expanded("a"));
        let html = crate::render::grid(&session.snapshot()).into_string();
        assert!(html.contains(r#"<details class="notes">"#));
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_navigation_drops_pending_search() {
        let source = Arc::new(FakeSource::new());
        let session = GridSession::new(source.clone(), SessionOptions::default());
        session.navigate("?view=all").await;

        session.type_search("jam");
        assert!(session.search_pending());
        session.navigate("?view=upcoming").await;
        assert!(!session.search_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            source.calls(),
            vec![listing(None, None), FetchCall::Upcoming(365)]
        );
        assert_eq!(session.filters().search, "");
        assert_eq!(session.snapshot().search_input, "");
        assert_eq!(session.location(), "/?view=upcoming");
        assert!(session.history().is_empty());
    }
}
