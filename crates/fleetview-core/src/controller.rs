// ── Controller ──
//
// Sequences bootstrap-from-cache, background refresh and user-driven view
// changes. Node/metric data only enters through `refresh` (or the cached
// snapshot at bootstrap) and always as a single commit; every user action
// goes through `recompute`, which runs one reconciliation pass against
// whatever tables are committed at that moment.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::detail::{DetailCache, HoverCard, HoverGuard, VisibilityScheduler};
use crate::error::{CoreError, DetailFetchError};
use crate::i18n::{Catalog, Translator};
use crate::model::{FilterPatch, FilterState, Node, NodeId, SortKey, UserPreferences};
use crate::normalize::Normalizer;
use crate::reconcile::{Patch, RenderedRow, RenderedTable};
use crate::source::FleetSource;
use crate::store::{DataStore, FleetTables, KeyValueStore, SnapshotStore, TableSource};
use crate::view::{self, BEST_SERVER_SORT, CountryFacets};

/// Result of one recompute: the desired order and the patches applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedView {
    pub nodes: Vec<Arc<Node>>,
    pub patches: Vec<Patch>,
}

impl OrderedView {
    pub fn ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id().as_str()).collect()
    }
}

/// Everything a front-end needs to draw the table, published after
/// every recompute.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub revision: u64,
    pub rows: Vec<RenderedRow>,
    pub placeholder: Option<String>,
    pub prefs: UserPreferences,
    pub best_server: bool,
    /// Nodes in the committed table (before filtering).
    pub total: usize,
    pub brands: Vec<String>,
    pub countries: CountryFacets,
    pub as_of: Option<DateTime<Utc>>,
    pub source: Option<TableSource>,
}

struct ViewCore {
    prefs: UserPreferences,
    table: RenderedTable,
    best_server: bool,
    revision: u64,
}

/// The main entry point for front-ends.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
pub struct Controller<S> {
    inner: Arc<ControllerInner<S>>,
}

impl<S> Clone for Controller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<S> {
    config: ControllerConfig,
    source: Arc<S>,
    normalizer: Normalizer,
    snapshots: SnapshotStore,
    store: DataStore,
    details: Arc<DetailCache<S>>,
    visibility: Arc<VisibilityScheduler<S>>,
    hover: HoverGuard,
    translator: Arc<dyn Translator>,
    view: Mutex<ViewCore>,
    view_tx: watch::Sender<Arc<ViewState>>,
    load_failed: AtomicBool,
    /// Ticket handed to each refresh before it starts fetching.
    refresh_seq: AtomicU64,
    /// Ticket of the refresh whose tables are committed. Held across
    /// commit and persist so the two happen together.
    committed_seq: Mutex<u64>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: FleetSource> Controller<S> {
    /// Create a controller with the built-in English labels. Does not
    /// fetch anything; call [`bootstrap()`](Self::bootstrap).
    pub fn new(config: ControllerConfig, source: Arc<S>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_translator(config, source, storage, Arc::new(Catalog::english()))
    }

    pub fn with_translator(
        config: ControllerConfig,
        source: Arc<S>,
        storage: Arc<dyn KeyValueStore>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let normalizer = Normalizer::new(config.brands.clone());
        let details = Arc::new(DetailCache::new(Arc::clone(&source), normalizer.clone()));
        let visibility = Arc::new(VisibilityScheduler::new(Arc::clone(&details)));
        let prefs = UserPreferences {
            locale: config.default_locale.clone(),
            ..UserPreferences::default()
        };
        let (view_tx, _) = watch::channel(Arc::new(ViewState {
            prefs: prefs.clone(),
            ..ViewState::default()
        }));

        Self {
            inner: Arc::new(ControllerInner {
                snapshots: SnapshotStore::new(storage, normalizer.clone()),
                config,
                source,
                normalizer,
                store: DataStore::new(),
                details,
                visibility,
                hover: HoverGuard::new(),
                translator,
                view: Mutex::new(ViewCore {
                    prefs,
                    table: RenderedTable::new(),
                    best_server: false,
                    revision: 0,
                }),
                view_tx,
                load_failed: AtomicBool::new(false),
                refresh_seq: AtomicU64::new(0),
                committed_seq: Mutex::new(0),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &DataStore {
        &self.inner.store
    }

    pub fn details(&self) -> &Arc<DetailCache<S>> {
        &self.inner.details
    }

    pub fn visibility(&self) -> &Arc<VisibilityScheduler<S>> {
        &self.inner.visibility
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.inner.translator
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Restore preferences and the cached snapshot, then refresh.
    ///
    /// With a cached snapshot the view is served immediately and the live
    /// refresh runs in the background. Without one, the live refresh is
    /// awaited; if it fails the view shows the load-failed placeholder and
    /// the ingestion error is returned.
    pub async fn bootstrap(&self) -> Result<OrderedView, CoreError> {
        if let Some(prefs) = self.inner.snapshots.load_preferences() {
            self.inner.view.lock().await.prefs = prefs;
        }

        let result = if let Some(snapshot) = self.inner.snapshots.load() {
            info!(nodes = snapshot.nodes.len(), saved_at = %snapshot.saved_at, "restored cached snapshot");
            self.inner.store.commit(FleetTables::new(
                snapshot.nodes,
                snapshot.metrics,
                snapshot.saved_at,
                TableSource::Cache,
            ));
            let view = self.recompute_locked().await;

            let ctrl = self.clone();
            self.inner.task_handles.lock().await.push(tokio::spawn(async move {
                if let Err(e) = ctrl.refresh().await {
                    warn!(error = %e, "background refresh after cache restore failed");
                }
            }));
            Ok(view)
        } else {
            self.recompute_locked().await;
            self.refresh().await
        };

        let interval_secs = self.inner.config.refresh_interval_secs;
        if interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(ctrl, interval_secs, cancel)));
        }
        result
    }

    /// Stop background tasks.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            // Background work may be parked on the network; do not wait for it.
            handle.abort();
            let _ = handle.await;
        }
        debug!("controller shut down");
    }

    // ── Data refresh ─────────────────────────────────────────────

    /// Fetch both feeds, normalize, commit, persist, reconcile once.
    ///
    /// Either both tables are replaced or neither is. On failure the
    /// previously committed data stays; if nothing was ever committed the
    /// view switches to the load-failed placeholder. Refreshes may overlap:
    /// one that started before an already committed refresh is discarded.
    pub async fn refresh(&self) -> Result<OrderedView, CoreError> {
        let ticket = self.inner.refresh_seq.fetch_add(1, Ordering::AcqRel) + 1;
        match self.ingest().await {
            Ok(tables) => {
                {
                    let mut committed_seq = self.inner.committed_seq.lock().await;
                    if *committed_seq > ticket {
                        debug!(ticket, committed = *committed_seq, "newer refresh already committed, dropping result");
                        drop(committed_seq);
                        return Ok(self.recompute_locked().await);
                    }
                    *committed_seq = ticket;
                    self.inner.load_failed.store(false, Ordering::Release);
                    let committed = self.inner.store.commit(tables);
                    self.inner.snapshots.save(&committed.nodes, &committed.metrics);
                    debug!(
                        nodes = committed.nodes.len(),
                        metrics = committed.metrics.len(),
                        ticket,
                        "refresh committed"
                    );
                }
                Ok(self.recompute_locked().await)
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                if !self.inner.store.has_data() {
                    self.inner.load_failed.store(true, Ordering::Release);
                    self.recompute_locked().await;
                }
                Err(e)
            }
        }
    }

    async fn ingest(&self) -> Result<FleetTables, CoreError> {
        let source = &self.inner.source;
        let (raw_nodes, raw_metrics) = tokio::try_join!(source.fetch_nodes(), source.fetch_metrics())?;
        let nodes = self.inner.normalizer.normalize_nodes(raw_nodes)?;
        let metrics = self.inner.normalizer.normalize_metrics(raw_metrics)?;
        Ok(FleetTables::new(nodes, metrics, Utc::now(), TableSource::Live))
    }

    // ── User actions ─────────────────────────────────────────────

    pub async fn apply_filter(&self, patch: FilterPatch) -> OrderedView {
        self.update_prefs(|core| {
            patch.apply_to(&mut core.prefs.filter);
            core.best_server = false;
        })
        .await
    }

    /// Sort by `key`; the active key flips direction.
    pub async fn apply_sort(&self, key: SortKey) -> OrderedView {
        self.update_prefs(|core| {
            core.prefs.sort = core.prefs.sort.toggle(key);
            core.best_server = false;
        })
        .await
    }

    /// Clear every filter; sort order and locale are kept.
    pub async fn reset_filters(&self) -> OrderedView {
        self.update_prefs(|core| {
            core.prefs.filter = FilterState::default();
            core.best_server = false;
        })
        .await
    }

    /// Switch label language. Rows keep their identity.
    pub async fn set_locale(&self, locale: &str) -> OrderedView {
        let locale = locale.trim().to_owned();
        self.update_prefs(|core| core.prefs.locale = locale).await
    }

    /// Show only fully idle nodes of the current filter, least traffic first.
    pub async fn apply_best_server_preset(&self) -> OrderedView {
        self.update_prefs(|core| {
            core.prefs.sort = BEST_SERVER_SORT;
            core.best_server = true;
        })
        .await
    }

    pub async fn preferences(&self) -> UserPreferences {
        self.inner.view.lock().await.prefs.clone()
    }

    // ── Detail ───────────────────────────────────────────────────

    /// The row for `id` scrolled into view. Returns the prefetch task when
    /// this is the row's first visibility report.
    pub fn on_visible(&self, id: &NodeId) -> Option<JoinHandle<()>> {
        self.inner.visibility.mark_visible(id)
    }

    /// The user hovered (or focused) the row for `id`.
    ///
    /// The hover starts when this is called, not when the returned future
    /// is first polled, so calls made in sequence supersede each other in
    /// that order. Resolves to `Ok(None)` when the user moved on before the
    /// detail arrived or the node left the table; errors are only reported
    /// while still current.
    pub fn on_hover_enter(
        &self,
        id: &NodeId,
    ) -> impl Future<Output = Result<Option<HoverCard>, DetailFetchError>> + Send + 'static {
        let ticket = self.inner.hover.begin(id);
        let this = self.clone();
        let id = id.clone();

        async move {
            let result = this.inner.details.get_detail(&id).await;
            if !this.inner.hover.is_current(&ticket) {
                debug!(node_id = %id, "hover moved on, dropping detail result");
                return Ok(None);
            }
            let detail = result?;

            let Some(tables) = this.inner.store.current() else {
                return Ok(None);
            };
            let Some(node) = tables.nodes.iter().find(|n| *n.id() == id) else {
                return Ok(None);
            };
            let locale = this.inner.view_tx.borrow().prefs.locale.clone();
            Ok(Some(HoverCard::build(
                Arc::clone(node),
                tables.metrics.get(&id),
                &detail,
                this.inner.translator.as_ref(),
                &locale,
            )))
        }
    }

    pub fn on_hover_leave(&self) {
        self.inner.hover.leave();
    }

    // ── View access ──────────────────────────────────────────────

    pub fn subscribe_view(&self) -> watch::Receiver<Arc<ViewState>> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> Arc<ViewState> {
        Arc::clone(&self.inner.view_tx.borrow())
    }

    pub fn rendered_rows(&self) -> Vec<RenderedRow> {
        self.view().rows.clone()
    }

    // ── Internals ────────────────────────────────────────────────

    async fn update_prefs(&self, mutate: impl FnOnce(&mut ViewCore)) -> OrderedView {
        let mut core = self.inner.view.lock().await;
        mutate(&mut core);
        self.inner.snapshots.save_preferences(&core.prefs);
        self.recompute(&mut core)
    }

    async fn recompute_locked(&self) -> OrderedView {
        let mut core = self.inner.view.lock().await;
        self.recompute(&mut core)
    }

    /// One reconciliation pass against the currently committed tables.
    fn recompute(&self, core: &mut ViewCore) -> OrderedView {
        let inner = &self.inner;
        let locale = core.prefs.locale.clone();
        let t = |path: &str| inner.translator.t(&locale, path, &[]);
        let tables = inner.store.current();

        let (nodes, patches) = match &tables {
            None => {
                let message = if inner.load_failed.load(Ordering::Acquire) {
                    t("errors.loadFailed")
                } else {
                    t("table.loading")
                };
                let patches = core.table.show_placeholder(&message, inner.visibility.as_ref());
                (Vec::new(), patches)
            }
            Some(tables) => {
                let desired = if core.best_server {
                    let filtered = view::filter(&tables.nodes, &tables.metrics, &core.prefs.filter);
                    view::best_servers(filtered, &tables.metrics)
                } else {
                    view::desired_view(&tables.nodes, &tables.metrics, &core.prefs)
                };
                let empty = t("table.empty");
                let patches = core.table.reconcile(&desired, &tables.metrics, &empty, inner.visibility.as_ref());
                (desired, patches)
            }
        };

        core.revision += 1;
        let state = ViewState {
            revision: core.revision,
            rows: core.table.rows().to_vec(),
            placeholder: core.table.placeholder().map(str::to_owned),
            prefs: core.prefs.clone(),
            best_server: core.best_server,
            total: tables.as_ref().map_or(0, |t| t.nodes.len()),
            brands: tables.as_ref().map(|t| view::brand_options(&t.nodes)).unwrap_or_default(),
            countries: tables.as_ref().map(|t| view::country_facets(&t.nodes)).unwrap_or_default(),
            as_of: tables.as_ref().map(|t| t.as_of),
            source: tables.as_ref().map(|t| t.source),
        };
        inner.view_tx.send_modify(|current| *current = Arc::new(state));

        OrderedView { nodes, patches }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically refresh both feeds.
async fn refresh_task<S: FleetSource>(controller: Controller<S>, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use fleetview_api::{RawNode, RawStatusRow};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::detail::SubscriptionState;
    use crate::detail::cache::fake::FakeSource;
    use crate::reconcile::RowHandle;
    use crate::store::{MemoryStore, SNAPSHOT_KEY};

    fn raw_node(sid: &str, hostname: &str, location: &str) -> RawNode {
        RawNode {
            sid: Some(sid.into()),
            hostname: Some(hostname.into()),
            ip: Some(format!("203.0.113.{sid}")),
            location: Some(location.into()),
        }
    }

    fn status(sid: &str, load: &str, traffic: &str, congestion: &str) -> RawStatusRow {
        RawStatusRow {
            sid: sid.into(),
            system_load: load.into(),
            traffic: traffic.into(),
            congestion: congestion.into(),
        }
    }

    fn online(source: FakeSource) -> FakeSource {
        source.set_nodes(Some(vec![
            raw_node("1", "node-kr-1", "KR Seoul (Google Cloud)"),
            raw_node("2", "node-jp-2", "JP Tokyo (Vultr)"),
            raw_node("3", "node-us-3", "US Dallas (Linode)"),
        ]));
        source.set_metrics(Some(vec![
            status("1", "0/0/0", "5", "0"),
            status("2", "0/0/0", "1", "0"),
            status("3", "3.5/1/0", "9", "2"),
        ]));
        source
    }

    fn config() -> ControllerConfig {
        ControllerConfig {
            refresh_interval_secs: 0,
            ..ControllerConfig::default()
        }
    }

    fn controller(source: FakeSource, storage: &Arc<MemoryStore>) -> Controller<FakeSource> {
        let storage: Arc<dyn KeyValueStore> = Arc::clone(storage) as Arc<dyn KeyValueStore>;
        Controller::new(config(), Arc::new(source), storage)
    }

    fn row_ids(ctrl: &Controller<FakeSource>) -> Vec<String> {
        ctrl.rendered_rows().iter().map(|r| r.node_id().to_string()).collect()
    }

    fn handles(ctrl: &Controller<FakeSource>) -> HashMap<String, RowHandle> {
        ctrl.rendered_rows()
            .iter()
            .map(|r| (r.node_id().to_string(), r.handle()))
            .collect()
    }

    #[tokio::test]
    async fn live_bootstrap_then_cached_bootstrap() {
        let storage = Arc::new(MemoryStore::new());
        let ctrl = controller(online(FakeSource::default()), &storage);

        let view = ctrl.bootstrap().await.unwrap();
        assert_eq!(view.ids(), vec!["2", "1", "3"]);
        assert_eq!(ctrl.view().source, Some(TableSource::Live));
        assert_eq!(ctrl.view().total, 3);
        assert!(storage.get(SNAPSHOT_KEY).unwrap().is_some());

        // Second start while the feeds are down: served from the snapshot.
        let offline = controller(FakeSource::default(), &storage);
        let view = offline.bootstrap().await.unwrap();
        assert_eq!(view.ids(), vec!["2", "1", "3"]);
        assert_eq!(offline.view().source, Some(TableSource::Cache));
        assert_eq!(offline.view().placeholder, None);
        offline.shutdown().await;
        assert_eq!(row_ids(&offline), vec!["2", "1", "3"]);
    }

    #[tokio::test]
    async fn failed_first_load_shows_error_placeholder() {
        let storage = Arc::new(MemoryStore::new());
        let ctrl = controller(FakeSource::default(), &storage);

        let err = ctrl.bootstrap().await.unwrap_err();
        assert!(matches!(err, CoreError::Ingestion(_)));
        let view = ctrl.view();
        assert!(view.rows.is_empty());
        assert_eq!(
            view.placeholder.as_deref(),
            Some("Failed to fetch data. Please try again later.")
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_committed_tables() {
        let storage = Arc::new(MemoryStore::new());
        let source = online(FakeSource::default());
        let ctrl = controller(source, &storage);
        ctrl.bootstrap().await.unwrap();
        let before = handles(&ctrl);

        ctrl.inner.source.set_metrics(None);
        assert!(ctrl.refresh().await.is_err());

        assert_eq!(handles(&ctrl), before);
        assert_eq!(ctrl.view().placeholder, None);
        assert_eq!(ctrl.store().current().unwrap().metrics.len(), 3);
    }

    #[tokio::test]
    async fn slower_older_refresh_does_not_replace_newer_tables() {
        let storage = Arc::new(MemoryStore::new());
        let source = online(FakeSource::holding_first_node_fetch());
        source.set_nodes(Some(vec![raw_node("1", "node-kr-1", "KR Seoul (Google Cloud)")]));
        let ctrl = controller(source, &storage);

        let older = {
            let ctrl = ctrl.clone();
            tokio::spawn(async move { ctrl.refresh().await })
        };
        while ctrl.inner.source.node_calls() == 0 {
            tokio::task::yield_now().await;
        }

        ctrl.inner
            .source
            .set_nodes(Some(vec![raw_node("2", "node-jp-2", "JP Tokyo (Vultr)")]));
        let view = ctrl.refresh().await.unwrap();
        assert_eq!(view.ids(), vec!["2"]);

        ctrl.inner.source.release_first_node_fetch();
        let view = older.await.unwrap().unwrap();
        assert_eq!(view.ids(), vec!["2"]);
        assert!(view.patches.is_empty(), "{:?}", view.patches);
        assert_eq!(row_ids(&ctrl), vec!["2"]);

        let saved = storage.get(SNAPSHOT_KEY).unwrap().unwrap();
        assert!(saved.contains("node-jp-2"));
        assert!(!saved.contains("node-kr-1"));
    }

    #[tokio::test]
    async fn sort_and_filter_reuse_rendered_rows() {
        let storage = Arc::new(MemoryStore::new());
        let ctrl = controller(online(FakeSource::default()), &storage);
        ctrl.bootstrap().await.unwrap();
        let before = handles(&ctrl);

        let view = ctrl.apply_sort(SortKey::Network).await;
        assert_eq!(view.ids(), vec!["2", "1", "3"]);
        let view = ctrl.apply_sort(SortKey::Network).await;
        assert_eq!(view.ids(), vec!["3", "1", "2"]);
        assert!(
            view.patches
                .iter()
                .all(|p| matches!(p, Patch::Move { .. })),
            "{:?}",
            view.patches
        );
        assert_eq!(handles(&ctrl), before);

        let view = ctrl.apply_filter(FilterPatch::keyword("seoul")).await;
        assert_eq!(view.ids(), vec!["1"]);
        assert_eq!(handles(&ctrl)["1"], before["1"]);
        assert!(view.patches.contains(&Patch::Remove { id: NodeId::from("2") }));

        let view = ctrl.apply_filter(FilterPatch::keyword("nowhere")).await;
        assert!(view.nodes.is_empty());
        assert_eq!(ctrl.view().placeholder.as_deref(), Some("No matching nodes found."));

        let view = ctrl.reset_filters().await;
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(ctrl.preferences().await.sort.direction, crate::model::SortDirection::Desc);
    }

    #[tokio::test]
    async fn best_server_preset_keeps_idle_nodes_until_next_filter() {
        let storage = Arc::new(MemoryStore::new());
        let ctrl = controller(online(FakeSource::default()), &storage);
        ctrl.bootstrap().await.unwrap();

        let view = ctrl.apply_best_server_preset().await;
        assert_eq!(view.ids(), vec!["2", "1"]);
        assert!(ctrl.view().best_server);
        assert_eq!(ctrl.preferences().await.sort, BEST_SERVER_SORT);

        let view = ctrl.apply_filter(FilterPatch::keyword("")).await;
        assert_eq!(view.ids(), vec!["2", "1", "3"]);
        assert!(!ctrl.view().best_server);
    }

    #[tokio::test]
    async fn locale_switch_is_persisted_without_structural_changes() {
        let storage = Arc::new(MemoryStore::new());
        let ctrl = controller(online(FakeSource::default()), &storage);
        ctrl.bootstrap().await.unwrap();

        let view = ctrl.set_locale("ja").await;
        assert!(view.patches.is_empty());
        assert_eq!(ctrl.view().prefs.locale, "ja");

        let restarted = controller(online(FakeSource::default()), &storage);
        restarted.bootstrap().await.unwrap();
        assert_eq!(restarted.preferences().await.locale, "ja");
        restarted.shutdown().await;
    }

    #[tokio::test]
    async fn stale_hover_result_is_dropped() {
        let storage = Arc::new(MemoryStore::new());
        let ctrl = controller(online(FakeSource::gated()), &storage);
        ctrl.bootstrap().await.unwrap();

        let first = {
            let ctrl = ctrl.clone();
            tokio::spawn(async move { ctrl.on_hover_enter(&NodeId::from("1")).await })
        };
        while ctrl.inner.source.detail_calls() == 0 {
            tokio::task::yield_now().await;
        }
        ctrl.on_hover_leave();
        ctrl.inner.source.release(1);
        assert_eq!(first.await.unwrap(), Ok(None));

        ctrl.inner.source.release(1);
        let card = ctrl.on_hover_enter(&NodeId::from("2")).await.unwrap().unwrap();
        assert_eq!(card.node.id().as_str(), "2");
        assert_eq!(card.rows[0].value, "203.0.113.2");

        // Detail for "1" was cached even though nobody was looking anymore.
        assert!(ctrl.details().cached(&NodeId::from("1")).is_some());
    }

    #[tokio::test]
    async fn failed_prefetch_is_retried_by_hover() {
        let storage = Arc::new(MemoryStore::new());
        let source = online(FakeSource::default());
        source.fail_detail("1", 1);
        let ctrl = controller(source, &storage);
        ctrl.bootstrap().await.unwrap();

        let id = NodeId::from("1");
        ctrl.on_visible(&id).unwrap().await.unwrap();
        let sub = ctrl.visibility().subscription_for(&id).unwrap();
        assert_eq!(ctrl.visibility().state(sub), Some(SubscriptionState::Failed));
        assert!(ctrl.on_visible(&id).is_none());

        let card = ctrl.on_hover_enter(&id).await.unwrap();
        assert!(card.is_some());
        assert_eq!(ctrl.inner.source.detail_calls(), 2);

        assert_eq!(ctrl.on_hover_enter(&NodeId::from("99")).await, Ok(None));
    }
}
