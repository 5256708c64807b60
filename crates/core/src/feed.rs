use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::stream::BoxStream;
use timeline_sync_protocol::{ItemId, TrackedItem};

use crate::host::ItemSource;

#[derive(Default)]
struct Slot {
    latest: Option<TrackedItem>,
    subscribers: Vec<UnboundedSender<TrackedItem>>,
}

/// In-process item store implementing [`ItemSource`].
///
/// Keeps the latest snapshot per id. A new subscriber first receives the
/// current snapshot, then every later publish in order.
#[derive(Default)]
pub struct ItemFeed {
    slots: Mutex<HashMap<ItemId, Slot>>,
}

impl ItemFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ItemId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `item` and push it to every live subscriber of its id.
    pub fn publish(&self, item: TrackedItem) {
        let mut slots = self.slots();
        let slot = slots.entry(item.id.clone()).or_default();
        slot.subscribers
            .retain(|subscriber| subscriber.unbounded_send(item.clone()).is_ok());
        slot.latest = Some(item);
    }

    pub fn latest(&self, id: &str) -> Option<TrackedItem> {
        self.slots().get(id).and_then(|slot| slot.latest.clone())
    }

    /// Close every subscription. Streams end after draining.
    pub fn close(&self) {
        for slot in self.slots().values_mut() {
            slot.subscribers.clear();
        }
    }
}

impl ItemSource for ItemFeed {
    fn updates(&self, id: &ItemId) -> BoxStream<'static, TrackedItem> {
        let (tx, rx) = unbounded();
        let mut slots = self.slots();
        let slot = slots.entry(id.clone()).or_default();
        if let Some(latest) = &slot.latest {
            let _ = tx.unbounded_send(latest.clone());
        }
        slot.subscribers.push(tx);
        rx.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn replays_latest_then_follows_updates() {
        let feed = ItemFeed::new();
        feed.publish(TrackedItem::new("1"));

        let mut updates = feed.updates(&ItemId::from("1"));
        assert_eq!(updates.next().now_or_never().flatten(), Some(TrackedItem::new("1")));
        assert!(updates.next().now_or_never().is_none());

        let moved = TrackedItem::new("1").with_start_date(chrono::NaiveDate::MIN);
        feed.publish(moved.clone());
        assert_eq!(updates.next().now_or_never().flatten(), Some(moved));
    }

    #[test]
    fn ids_are_isolated() {
        let feed = ItemFeed::new();
        let mut first = feed.updates(&ItemId::from("1"));
        feed.publish(TrackedItem::new("2"));
        assert!(first.next().now_or_never().is_none());
        assert_eq!(feed.latest("2"), Some(TrackedItem::new("2")));
    }

    #[test]
    fn close_ends_streams() {
        let feed = ItemFeed::new();
        let mut updates = feed.updates(&ItemId::from("1"));
        feed.close();
        assert_eq!(updates.next().now_or_never(), Some(None));
    }
}
