use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use futures::stream::BoxStream;
use timeline_sync_protocol::{ItemId, RelationKind, RenderInfo, TrackedItem, ViewParameters};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::host::{
    Clock, ErrorContext, HostSignals, ItemSource, NoopSurface, NotificationService,
    RelationService, SystemClock, TimelineHeader, TimelineSurface, TimelineVisibility,
    TypeMetadataLoader,
};
use crate::render_stream;
use crate::scheduler::{MemberCallback, RefreshRequest, RefreshScheduler};
use crate::scope::Scope;
use crate::selection::{PendingRelation, SelectionModeController};
use crate::tracker::ItemTracker;
use crate::window::WindowInputs;

struct Collaborators {
    items: Arc<dyn ItemSource>,
    header: Arc<dyn TimelineHeader>,
    relations: Arc<dyn RelationService>,
    notifications: Arc<dyn NotificationService>,
    visibility: Arc<dyn TimelineVisibility>,
    surface: Arc<dyn TimelineSurface>,
    clock: Arc<dyn Clock>,
}

/// Mutable state. Every read and write goes through the one lock in
/// [`Inner`], and no collaborator or member is called while it is held.
struct SyncState {
    params: Arc<ViewParameters>,
    tracker: ItemTracker,
    scheduler: RefreshScheduler,
    selection: SelectionModeController,
}

struct Inner {
    config: SyncConfig,
    runtime: Handle,
    host: Collaborators,
    state: Mutex<SyncState>,
    /// Live view parameters, republished whenever the window moves.
    view_tx: watch::Sender<Arc<ViewParameters>>,
    /// Bumped on every broadcast so each per-item stream re-emits.
    force_tx: watch::Sender<u64>,
    scope: Scope,
}

/// Keeps a Gantt-style timeline consistent with a live set of work items.
///
/// Cheap to clone; clones share state. All subscriptions it creates end
/// together on [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct TimelineSynchronizer {
    inner: Arc<Inner>,
}

pub struct TimelineSynchronizerBuilder {
    items: Arc<dyn ItemSource>,
    header: Arc<dyn TimelineHeader>,
    relations: Arc<dyn RelationService>,
    notifications: Arc<dyn NotificationService>,
    visibility: Arc<dyn TimelineVisibility>,
    surface: Arc<dyn TimelineSurface>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    runtime: Option<Handle>,
}

impl TimelineSynchronizerBuilder {
    pub fn visibility(mut self, visibility: Arc<dyn TimelineVisibility>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn surface(mut self, surface: Arc<dyn TimelineSurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime used for the debounce timer and relation requests. Defaults
    /// to the runtime `build` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<TimelineSynchronizer, SyncError> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()?,
        };

        let params = Arc::new(ViewParameters::new(
            self.clock.today(),
            self.config.pixels_per_day,
        ));
        let (view_tx, _) = watch::channel(Arc::clone(&params));
        let (force_tx, _) = watch::channel(0);

        let state = SyncState {
            params,
            tracker: ItemTracker::new(),
            scheduler: RefreshScheduler::new(self.config.refresh_debounce()),
            selection: SelectionModeController::new(),
        };

        Ok(TimelineSynchronizer {
            inner: Arc::new(Inner {
                config: self.config,
                runtime,
                host: Collaborators {
                    items: self.items,
                    header: self.header,
                    relations: self.relations,
                    notifications: self.notifications,
                    visibility: self.visibility,
                    surface: self.surface,
                    clock: self.clock,
                },
                state: Mutex::new(state),
                view_tx,
                force_tx,
                scope: Scope::new(),
            }),
        })
    }
}

impl TimelineSynchronizer {
    /// Start building a synchronizer from its required collaborators. The
    /// timeline counts as always visible until a visibility gate is set.
    pub fn builder(
        items: Arc<dyn ItemSource>,
        header: Arc<dyn TimelineHeader>,
        relations: Arc<dyn RelationService>,
        notifications: Arc<dyn NotificationService>,
    ) -> TimelineSynchronizerBuilder {
        TimelineSynchronizerBuilder {
            items,
            header,
            relations,
            notifications,
            visibility: Arc::new(|| true),
            surface: Arc::new(NoopSurface),
            clock: Arc::new(SystemClock),
            config: SyncConfig::default(),
            runtime: None,
        }
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // --- Rendering members ---

    /// Register a member called with the live parameters on every broadcast.
    /// Registering an existing name replaces its callback.
    pub fn on_refresh_requested(
        &self,
        name: impl Into<String>,
        callback: impl Fn(&ViewParameters) + Send + Sync + 'static,
    ) {
        let callback: MemberCallback = Arc::new(callback);
        self.state().scheduler.register(name, callback);
    }

    pub fn unregister_member(&self, name: &str) -> bool {
        self.state().scheduler.unregister(name)
    }

    /// Render instructions for one item.
    ///
    /// Emits on every update whose fingerprint differs from the previous
    /// emission, and re-emits the latest item with the live parameters on
    /// every broadcast. Ends when the synchronizer shuts down.
    pub fn add_item(&self, id: impl Into<ItemId>) -> BoxStream<'static, RenderInfo> {
        render_stream::item_render_stream(self.clone(), &id.into()).boxed()
    }

    /// Deep copy of the live parameters. Mutating it never affects the
    /// synchronizer.
    pub fn view_parameters_snapshot(&self) -> ViewParameters {
        ViewParameters::clone(&self.state().params)
    }

    /// Observable of the live parameters, updated whenever the window moves
    /// and on every broadcast.
    pub fn subscribe_view_parameters(&self) -> watch::Receiver<Arc<ViewParameters>> {
        self.inner.view_tx.subscribe()
    }

    pub fn tracked_item_count(&self) -> usize {
        self.state().tracker.len()
    }

    // --- Window computation ---

    pub(crate) fn live_params(&self) -> Arc<ViewParameters> {
        Arc::clone(&self.state().params)
    }

    pub(crate) fn item_source(&self) -> &Arc<dyn ItemSource> {
        &self.inner.host.items
    }

    pub(crate) fn subscribe_force(&self) -> watch::Receiver<u64> {
        self.inner.force_tx.subscribe()
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Query the collaborators that feed a recompute. Done before taking the
    /// state lock so a collaborator may call back into the synchronizer.
    fn probe(&self) -> (chrono::NaiveDate, f64) {
        (
            self.inner.host.clock.today(),
            self.inner.host.header.header_width_px(),
        )
    }

    fn recompute_locked(
        &self,
        state: &mut SyncState,
        now: chrono::NaiveDate,
        header_width_px: f64,
    ) -> bool {
        let inputs = WindowInputs {
            now,
            pixels_per_day: state.params.pixels_per_day,
            header_width_px,
            left_padding_days: self.inner.config.left_padding_days,
            right_padding_factor: self.inner.config.right_padding_factor,
        };
        let result = state.tracker.recompute(&state.params, &inputs);
        if result.changed {
            let params = Arc::make_mut(&mut state.params);
            params.apply_window(result.window);
            params.now = now;
        }
        result.changed
    }

    /// Record an item update and recompute the window. When the window moved,
    /// the new parameters are published and a broadcast is requested.
    pub(crate) fn ingest(&self, item: TrackedItem) -> RenderInfo {
        let (now, header_width_px) = self.probe();
        let (changed, params) = {
            let mut state = self.state();
            state.tracker.track(item.clone());
            let changed = self.recompute_locked(&mut state, now, header_width_px);
            (changed, Arc::clone(&state.params))
        };

        if changed {
            trace!(
                item = %item.id,
                start = %params.display_window_start,
                end = %params.display_window_end,
                "display window moved"
            );
            self.inner.view_tx.send_replace(Arc::clone(&params));
            self.request_refresh();
        }

        RenderInfo::new(params, item)
    }

    /// Stop recomputing the window on item updates. Updates are still
    /// tracked and emitted with the last window.
    pub fn suspend_recomputation(&self) {
        self.state().tracker.suspend();
    }

    /// Recompute again from the next update or broadcast on. Does not
    /// recompute by itself; call [`request_refresh`](Self::request_refresh)
    /// to catch up on a suspended batch.
    pub fn resume_recomputation(&self) {
        self.state().tracker.resume();
    }

    // --- Refresh scheduling ---

    /// Ask for one coalesced broadcast after the debounce delay.
    ///
    /// Dropped outright while the timeline is hidden. Requests arriving while
    /// a broadcast is scheduled are covered by it and do not delay it.
    pub fn request_refresh(&self) {
        if self.inner.scope.is_ended() {
            return;
        }

        let visible = self.inner.host.visibility.is_timeline_visible();
        let (outcome, delay) = {
            let mut state = self.state();
            (state.scheduler.request(visible), state.scheduler.delay())
        };

        match outcome {
            RefreshRequest::Dropped => {
                debug!("refresh requested while the timeline is hidden");
            }
            RefreshRequest::Coalesced => {
                trace!("refresh already scheduled");
            }
            RefreshRequest::Scheduled => {
                trace!(delay_ms = delay.as_millis() as u64, "scheduling timeline refresh");
                let this = self.clone();
                self.inner.runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    this.broadcast();
                });
            }
        }
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.state().scheduler.is_pending()
    }

    /// Run the scheduled broadcast.
    ///
    /// `pending` is cleared together with the recompute, so a request made
    /// while members run arms a new timer instead of being absorbed.
    fn broadcast(&self) {
        if self.inner.scope.is_ended() {
            self.state().scheduler.finish();
            return;
        }

        let (now, header_width_px) = self.probe();
        let (params, members) = {
            let mut state = self.state();
            self.recompute_locked(&mut state, now, header_width_px);
            state.scheduler.finish();
            (Arc::clone(&state.params), state.scheduler.members())
        };

        debug!(
            start = %params.display_window_start,
            end = %params.display_window_end,
            members = members.len(),
            "refreshing timeline"
        );
        self.inner.view_tx.send_replace(Arc::clone(&params));
        self.inner
            .force_tx
            .send_modify(|generation| *generation = generation.wrapping_add(1));
        self.inner.host.header.refresh_view(&params);

        for (name, callback) in &members {
            trace!(member = %name, "refreshing timeline member");
            callback(&params);
        }

        self.inner.host.surface.apply_scroll_offset(params.scroll_offset_px);
    }

    // --- Lightweight paths ---

    /// Move the timeline body horizontally. Style-only; nothing is
    /// broadcast.
    pub fn set_scroll_offset(&self, offset_px: f64) {
        Arc::make_mut(&mut self.state().params).scroll_offset_px = offset_px;
        self.inner.host.surface.apply_scroll_offset(offset_px);
    }

    /// Change the horizontal scale.
    ///
    /// Only the live value is updated. A scale change does not count as a
    /// window change; the caller requests a refresh when it wants a redraw.
    pub fn set_pixels_per_day(&self, pixels_per_day: f64) -> Result<(), SyncError> {
        if !(pixels_per_day.is_finite() && pixels_per_day > 0.0) {
            return Err(SyncError::InvalidScale(pixels_per_day));
        }
        Arc::make_mut(&mut self.state().params).pixels_per_day = pixels_per_day;
        Ok(())
    }

    // --- Selection mode ---

    /// Start picking a predecessor: the origin will follow the picked item.
    pub fn start_add_relation_predecessor(&self, origin: &TrackedItem) {
        self.activate_selection_mode(origin.id.clone(), RelationKind::Follows);
    }

    /// Start picking a follower: the origin will precede the picked item.
    pub fn start_add_relation_follower(&self, origin: &TrackedItem) {
        self.activate_selection_mode(origin.id.clone(), RelationKind::Precedes);
    }

    fn activate_selection_mode(&self, origin_id: ItemId, kind: RelationKind) {
        let abandoned = {
            let mut state = self.state();
            let abandoned = state.selection.start(origin_id.clone(), kind);
            let active = state.selection.active().cloned();
            Arc::make_mut(&mut state.params).active_selection_mode = active;
            abandoned
        };

        if let Some(abandoned) = abandoned {
            debug!(origin = %abandoned.origin_id, "abandoning running selection");
        }
        debug!(origin = %origin_id, %kind, "selection mode started");

        self.inner.host.surface.set_selection_active(true);
        self.request_refresh();
    }

    pub fn is_selecting(&self) -> bool {
        self.state().selection.is_selecting()
    }

    /// Complete the running selection with `target`.
    ///
    /// The relation is created in the background and a failure is only
    /// reported; the selection is cleared and one refresh requested either
    /// way. Returns `false` when no selection was running.
    pub fn select_item(&self, target: TrackedItem) -> bool {
        let pending = {
            let mut state = self.state();
            let pending = state.selection.complete(target);
            if pending.is_some() {
                Arc::make_mut(&mut state.params).active_selection_mode = None;
            }
            pending
        };
        let Some(pending) = pending else {
            return false;
        };

        self.create_relation(pending);
        self.leave_selection_mode();
        true
    }

    /// Leave selection mode without creating a relation.
    pub fn cancel_selection(&self) -> bool {
        let cancelled = {
            let mut state = self.state();
            let cancelled = state.selection.cancel();
            if cancelled {
                Arc::make_mut(&mut state.params).active_selection_mode = None;
            }
            cancelled
        };
        if cancelled {
            debug!("selection mode cancelled");
            self.leave_selection_mode();
        }
        cancelled
    }

    fn leave_selection_mode(&self) {
        let surface = &self.inner.host.surface;
        surface.set_selection_active(false);
        surface.clear_selection_start_marker();
        self.request_refresh();
    }

    fn create_relation(&self, pending: PendingRelation) {
        let PendingRelation {
            origin_id,
            kind,
            target,
        } = pending;
        debug!(origin = %origin_id, %kind, target = %target.id, "creating relation");

        let request = self
            .inner
            .host
            .relations
            .add_relation(&origin_id, kind, &target.id);
        let notifications = Arc::clone(&self.inner.host.notifications);
        self.inner.runtime.spawn(async move {
            if let Err(error) = request.await {
                warn!(origin = %origin_id, %kind, target = %target.id, %error, "relation creation failed");
                notifications.report_error(
                    &error,
                    &ErrorContext::Relation {
                        origin: origin_id,
                        kind,
                        target,
                    },
                );
            }
        });
    }

    // --- Host lifecycle ---

    /// Wire the hosting table's lifecycle signals to refreshes.
    ///
    /// The first render and every `true` on the visibility stream request a
    /// refresh. The first time the timeline is shown, type metadata is loaded
    /// and another refresh follows once it arrives.
    pub fn attach_host(&self, signals: HostSignals) {
        let HostSignals {
            rendered,
            visibility,
            type_loader,
        } = signals;

        let this = self.clone();
        let ended = self.inner.scope.ended();
        self.inner.runtime.spawn(async move {
            tokio::select! {
                () = ended => {}
                () = rendered => {
                    debug!("table rendered");
                    this.request_refresh();
                }
            }
        });

        let this = self.clone();
        let ended = self.inner.scope.ended();
        self.inner.runtime.spawn(async move {
            let mut visibility = std::pin::pin!(visibility.take_until(ended));
            let mut types_requested = false;

            while let Some(visible) = visibility.next().await {
                if !visible {
                    continue;
                }

                debug!("timeline shown");
                this.request_refresh();
                if !types_requested {
                    types_requested = true;
                    this.load_type_metadata(Arc::clone(&type_loader));
                }
            }
        });
    }

    fn load_type_metadata(&self, loader: Arc<dyn TypeMetadataLoader>) {
        let this = self.clone();
        self.inner.runtime.spawn(async move {
            match loader.load_all().await {
                Ok(()) => this.request_refresh(),
                Err(error) => {
                    warn!(%error, "loading type metadata failed");
                    this.inner
                        .host
                        .notifications
                        .report_error(&error, &ErrorContext::TypeMetadata);
                }
            }
        });
    }

    /// End the scope: every render stream and host subscription stops and
    /// no further broadcast runs.
    pub fn shutdown(&self) {
        debug!("timeline synchronizer shutting down");
        self.inner.scope.end();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.scope.is_ended()
    }
}

impl std::fmt::Debug for TimelineSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("TimelineSynchronizer")
            .field("params", &state.params)
            .field("tracked", &state.tracker.len())
            .field("scheduler", &state.scheduler)
            .field("selection", &state.selection)
            .finish()
    }
}
