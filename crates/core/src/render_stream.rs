//! Per-item render pipeline.
//!
//! Item updates are tracked and turned into [`RenderInfo`], deduplicated by
//! fingerprint. Every broadcast re-emits the latest item with the live
//! parameters, whether or not its fingerprint changed.

use futures::future::ready;
use futures::stream::{self, Stream, StreamExt};
use timeline_sync_protocol::{Fingerprint, ItemId, RenderInfo, TrackedItem};
use tokio::sync::watch;

use crate::synchronizer::TimelineSynchronizer;

enum Signal {
    Item(RenderInfo),
    Force,
}

/// One `()` per broadcast after subscription. Ends when the sender is gone.
fn force_signals(rx: watch::Receiver<u64>) -> impl Stream<Item = ()> + Send + 'static {
    stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        Some(((), rx))
    })
}

pub(crate) fn item_render_stream(
    sync: TimelineSynchronizer,
    id: &ItemId,
) -> impl Stream<Item = RenderInfo> + Send + 'static + use<> {
    let ended = sync.scope().ended();
    let force = force_signals(sync.subscribe_force()).map(|()| Signal::Force);

    let ingest = sync.clone();
    let items = sync
        .item_source()
        .updates(id)
        .map(move |item| ingest.ingest(item))
        .scan(None::<Fingerprint>, |last, info| {
            let fingerprint = info.fingerprint();
            let fresh = last.as_ref() != Some(&fingerprint);
            *last = Some(fingerprint);
            ready(Some(fresh.then_some(info)))
        })
        .filter_map(ready)
        .map(Signal::Item);

    stream::select(items, force)
        .scan(None::<TrackedItem>, move |latest, signal| {
            let emitted = match signal {
                Signal::Item(info) => {
                    *latest = Some(info.item.clone());
                    Some(info)
                }
                // Nothing to redraw before the first update arrived.
                Signal::Force => latest
                    .clone()
                    .map(|item| RenderInfo::new(sync.live_params(), item)),
            };
            ready(Some(emitted))
        })
        .filter_map(ready)
        .take_until(ended)
}
