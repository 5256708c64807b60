//! Recording collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use futures::FutureExt;
use futures::future::BoxFuture;
use timeline_sync_core::{
    CollaboratorError, ErrorContext, FixedClock, ItemFeed, NotificationService, RelationService,
    SyncConfig, TimelineSurface, TimelineSynchronizer,
};
use timeline_sync_protocol::{ItemId, RelationKind};

pub fn d0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

pub fn day(offset: i64) -> NaiveDate {
    d0() + chrono::Duration::days(offset)
}

/// Let the debounce timer fire and every spawned task run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(40)).await;
}

#[derive(Default)]
pub struct RecordingRelations {
    pub reject: AtomicBool,
    pub created: Mutex<Vec<(ItemId, RelationKind, ItemId)>>,
}

impl RecordingRelations {
    pub fn created(&self) -> Vec<(ItemId, RelationKind, ItemId)> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl RelationService for RecordingRelations {
    fn add_relation(
        &self,
        origin: &ItemId,
        kind: RelationKind,
        target: &ItemId,
    ) -> BoxFuture<'static, Result<(), CollaboratorError>> {
        if let Ok(mut created) = self.created.lock() {
            created.push((origin.clone(), kind, target.clone()));
        }
        let result = if self.reject.load(Ordering::SeqCst) {
            Err(CollaboratorError::Rejected("would create a cycle".into()))
        } else {
            Ok(())
        };
        futures::future::ready(result).boxed()
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    pub reports: Mutex<Vec<(CollaboratorError, ErrorContext)>>,
}

impl RecordingNotifications {
    pub fn reports(&self) -> Vec<(CollaboratorError, ErrorContext)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl NotificationService for RecordingNotifications {
    fn report_error(&self, error: &CollaboratorError, context: &ErrorContext) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((error.clone(), context.clone()));
        }
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    pub selection_flags: Mutex<Vec<bool>>,
    pub markers_cleared: AtomicUsize,
    pub scroll_offsets: Mutex<Vec<f64>>,
}

impl TimelineSurface for RecordingSurface {
    fn set_selection_active(&self, active: bool) {
        if let Ok(mut flags) = self.selection_flags.lock() {
            flags.push(active);
        }
    }

    fn clear_selection_start_marker(&self) {
        self.markers_cleared.fetch_add(1, Ordering::SeqCst);
    }

    fn apply_scroll_offset(&self, offset_px: f64) {
        if let Ok(mut offsets) = self.scroll_offsets.lock() {
            offsets.push(offset_px);
        }
    }
}

pub struct Harness {
    pub sync: TimelineSynchronizer,
    pub feed: Arc<ItemFeed>,
    pub relations: Arc<RecordingRelations>,
    pub notifications: Arc<RecordingNotifications>,
    pub surface: Arc<RecordingSurface>,
    pub visible: Arc<AtomicBool>,
    pub broadcasts: Arc<AtomicUsize>,
}

impl Harness {
    /// Synchronizer with an 800px header, fixed at [`d0`], and one member
    /// counting broadcasts.
    pub fn new(config: SyncConfig) -> Self {
        let feed = Arc::new(ItemFeed::new());
        let relations = Arc::new(RecordingRelations::default());
        let notifications = Arc::new(RecordingNotifications::default());
        let surface = Arc::new(RecordingSurface::default());
        let visible = Arc::new(AtomicBool::new(true));

        let gate = Arc::clone(&visible);
        let sync = TimelineSynchronizer::builder(
            feed.clone(),
            Arc::new(|| 800.0),
            relations.clone(),
            notifications.clone(),
        )
        .visibility(Arc::new(move || gate.load(Ordering::SeqCst)))
        .surface(surface.clone())
        .clock(Arc::new(FixedClock(d0())))
        .config(config)
        .build()
        .expect("synchronizer builds inside a runtime");

        let broadcasts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&broadcasts);
        sync.on_refresh_requested("counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            sync,
            feed,
            relations,
            notifications,
            surface,
            visible,
            broadcasts,
        }
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
