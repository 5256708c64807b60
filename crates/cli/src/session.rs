//! Drives one synchronizer through a replay log.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use timeline_sync_core::{
    Clock, CollaboratorError, ErrorContext, FixedClock, ItemFeed, NotificationService,
    RelationService, SyncConfig, SystemClock, TimelineSynchronizer,
};
use timeline_sync_protocol::{ItemId, RelationKind, TrackedItem};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::output::{self, Record, RecordSink};
use crate::replay::{ReplayEvent, ReplayLog};

/// Accepts every relation and records it.
struct RecordedRelations(RecordSink);

impl RelationService for RecordedRelations {
    fn add_relation(
        &self,
        origin: &ItemId,
        kind: RelationKind,
        target: &ItemId,
    ) -> BoxFuture<'static, Result<(), CollaboratorError>> {
        let _ = self.0.unbounded_send(Record::Relation {
            origin: origin.clone(),
            kind,
            target: target.clone(),
        });
        futures::future::ready(Ok(())).boxed()
    }
}

struct RecordedNotifications(RecordSink);

impl NotificationService for RecordedNotifications {
    fn report_error(&self, error: &CollaboratorError, context: &ErrorContext) {
        let message = match context {
            ErrorContext::Relation {
                origin,
                kind,
                target,
            } => format!("relation {origin} {kind} {}: {error}", target.id),
            ErrorContext::TypeMetadata => format!("type metadata: {error}"),
        };
        warn!(%message, "collaborator error");
        let _ = self.0.unbounded_send(Record::Error { message });
    }
}

/// Replay `log` and write the resulting records to `out` as JSON lines.
/// Returns the number of records written.
pub async fn replay(log: ReplayLog, config: SyncConfig, out: impl Write) -> Result<usize> {
    let (sink, records) = output::channel();
    let (driven, written) = tokio::join!(drive(log, config, sink), output::write_records(records, out));
    driven?;
    written
}

fn spawn_renderer(sync: &TimelineSynchronizer, id: ItemId, sink: RecordSink) -> JoinHandle<()> {
    let mut renders = sync.add_item(id);
    tokio::spawn(async move {
        while let Some(info) = renders.next().await {
            let _ = sink.unbounded_send(Record::render(&info));
        }
    })
}

/// The latest snapshot of `id`, or a dateless item when it was never seen.
fn lookup(feed: &ItemFeed, id: ItemId) -> TrackedItem {
    feed.latest(&id).unwrap_or_else(|| TrackedItem::new(id))
}

async fn drive(log: ReplayLog, config: SyncConfig, sink: RecordSink) -> Result<()> {
    let feed = Arc::new(ItemFeed::new());
    let visible = Arc::new(AtomicBool::new(log.visible));
    let header_width_px = log.header_width_px;
    let clock: Arc<dyn Clock> = match log.today {
        Some(today) => Arc::new(FixedClock(today)),
        None => Arc::new(SystemClock),
    };
    let settle = config.refresh_debounce() * 2;

    let gate = Arc::clone(&visible);
    let sync = TimelineSynchronizer::builder(
        feed.clone(),
        Arc::new(move || header_width_px),
        Arc::new(RecordedRelations(sink.clone())),
        Arc::new(RecordedNotifications(sink.clone())),
    )
    .visibility(Arc::new(move || gate.load(Ordering::SeqCst)))
    .clock(clock)
    .config(config)
    .build()?;

    let broadcasts = sink.clone();
    sync.on_refresh_requested("replay", move |params| {
        let _ = broadcasts.unbounded_send(Record::broadcast(params));
    });

    let mut rendered = HashSet::new();
    let mut renderers = Vec::new();

    for event in log.into_events() {
        debug!(?event, "replaying");
        match event {
            ReplayEvent::Update { item } => {
                if rendered.insert(item.id.clone()) {
                    renderers.push(spawn_renderer(&sync, item.id.clone(), sink.clone()));
                }
                feed.publish(item);
            }
            ReplayEvent::StartPredecessor { origin } => {
                sync.start_add_relation_predecessor(&lookup(&feed, origin));
            }
            ReplayEvent::StartFollower { origin } => {
                sync.start_add_relation_follower(&lookup(&feed, origin));
            }
            ReplayEvent::Select { target } => {
                if !sync.select_item(lookup(&feed, target)) {
                    warn!("select without a running selection");
                }
            }
            ReplayEvent::Cancel => {
                sync.cancel_selection();
            }
            ReplayEvent::Scroll { offset_px } => sync.set_scroll_offset(offset_px),
            ReplayEvent::Zoom { pixels_per_day } => {
                sync.set_pixels_per_day(pixels_per_day)?;
                sync.request_refresh();
            }
            ReplayEvent::Visibility { visible: now_visible } => {
                visible.store(now_visible, Ordering::SeqCst);
                if now_visible {
                    sync.request_refresh();
                }
            }
            ReplayEvent::Refresh => sync.request_refresh(),
            ReplayEvent::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
        tokio::task::yield_now().await;
    }

    tokio::time::sleep(settle).await;
    sync.shutdown();
    for renderer in renderers {
        renderer.await?;
    }
    Ok(())
}
