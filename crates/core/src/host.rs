//! Contracts for everything the synchronizer consumes from its host.
//!
//! Each collaborator is injected as a trait object. Nothing here is owned by
//! the synchronizer beyond an `Arc`, so the host decides lifetimes.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use timeline_sync_protocol::{ItemId, RelationKind, TrackedItem, ViewParameters};

use crate::error::CollaboratorError;

/// Gate for refresh requests: nothing is scheduled while the timeline is
/// hidden.
pub trait TimelineVisibility: Send + Sync {
    fn is_timeline_visible(&self) -> bool;
}

impl<F> TimelineVisibility for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_timeline_visible(&self) -> bool {
        self()
    }
}

/// The header widget, treated as a black box.
pub trait TimelineHeader: Send + Sync {
    /// Visible width in pixels. Queried synchronously on every recompute.
    fn header_width_px(&self) -> f64;

    /// Called once per broadcast, before the registered members.
    fn refresh_view(&self, _params: &ViewParameters) {}
}

impl<F> TimelineHeader for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn header_width_px(&self) -> f64 {
        self()
    }
}

/// Style-only hooks on the element hosting the timeline.
pub trait TimelineSurface: Send + Sync {
    fn set_selection_active(&self, _active: bool) {}
    fn clear_selection_start_marker(&self) {}
    fn apply_scroll_offset(&self, _offset_px: f64) {}
}

/// Surface that ignores every style update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSurface;

impl TimelineSurface for NoopSurface {}

/// Persists relations between work items.
pub trait RelationService: Send + Sync {
    fn add_relation(
        &self,
        origin: &ItemId,
        kind: RelationKind,
        target: &ItemId,
    ) -> BoxFuture<'static, Result<(), CollaboratorError>>;
}

/// What a reported error was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    Relation {
        origin: ItemId,
        kind: RelationKind,
        target: TrackedItem,
    },
    TypeMetadata,
}

/// Fire-and-forget error reporting.
pub trait NotificationService: Send + Sync {
    fn report_error(&self, error: &CollaboratorError, context: &ErrorContext);
}

/// Source of item snapshots, one stream per tracked id.
pub trait ItemSource: Send + Sync {
    fn updates(&self, id: &ItemId) -> BoxStream<'static, TrackedItem>;
}

/// Loads work package type metadata the first time the timeline is shown.
pub trait TypeMetadataLoader: Send + Sync {
    fn load_all(&self) -> BoxFuture<'static, Result<(), CollaboratorError>>;
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Lifecycle signals of the hosting table, wired up by
/// [`TimelineSynchronizer::attach_host`](crate::TimelineSynchronizer::attach_host).
pub struct HostSignals {
    /// Resolves once the table finished its first render.
    pub rendered: BoxFuture<'static, ()>,
    /// Current timeline visibility, re-emitted on every toggle.
    pub visibility: BoxStream<'static, bool>,
    pub type_loader: Arc<dyn TypeMetadataLoader>,
}
