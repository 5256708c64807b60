use std::collections::HashMap;

use timeline_sync_protocol::{ItemId, TrackedItem, ViewParameters};

use crate::window::{Recompute, WindowInputs, compute_window};

/// The work items currently rendered, keyed by id.
///
/// Entries are inserted or overwritten on every update and never removed;
/// dropping rows is the table's concern.
#[derive(Debug, Default)]
pub struct ItemTracker {
    items: HashMap<ItemId, TrackedItem>,
    suspended: bool,
}

impl ItemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `item`, returning the previous snapshot.
    pub fn track(&mut self, item: TrackedItem) -> Option<TrackedItem> {
        self.items.insert(item.id.clone(), item)
    }

    pub fn get(&self, id: &str) -> Option<&TrackedItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stop window recomputation until [`resume`](Self::resume) is called.
    /// Lets a caller apply a batch of updates without recomputing per item.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Compute a fresh window and diff it against `previous`.
    ///
    /// A no-op reporting "unchanged" while suspended. Pure over the tracked
    /// set and `inputs`, so repeating it without intervening updates always
    /// yields `changed == false` once the result has been applied.
    pub fn recompute(&self, previous: &ViewParameters, inputs: &WindowInputs) -> Recompute {
        if self.suspended {
            return Recompute {
                window: previous.window(),
                changed: false,
            };
        }

        let window = compute_window(self.items.values(), inputs);
        Recompute {
            window,
            changed: window != previous.window(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap_or_default()
    }

    fn inputs() -> WindowInputs {
        WindowInputs {
            now: day(10),
            pixels_per_day: 30.0,
            header_width_px: 0.0,
            left_padding_days: 3,
            right_padding_factor: 1.5,
        }
    }

    #[test]
    fn track_overwrites_by_id() {
        let mut tracker = ItemTracker::new();
        assert!(tracker.track(TrackedItem::new(5u64)).is_none());
        let previous = tracker.track(TrackedItem::new("5").with_due_date(day(20)));
        assert!(previous.is_some());
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("5").and_then(|i| i.due_date), Some(day(20)));
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut tracker = ItemTracker::new();
        tracker.track(TrackedItem::new("a").with_start_date(day(2)));
        let mut params = ViewParameters::new(day(10), 30.0);

        let first = tracker.recompute(&params, &inputs());
        assert!(first.changed);
        params.apply_window(first.window);

        let second = tracker.recompute(&params, &inputs());
        assert!(!second.changed);
        assert_eq!(second.window, first.window);
    }

    #[test]
    fn suspended_recompute_reports_unchanged() {
        let mut tracker = ItemTracker::new();
        tracker.suspend();
        tracker.track(TrackedItem::new("a").with_start_date(day(1)));
        let params = ViewParameters::new(day(10), 30.0);

        let result = tracker.recompute(&params, &inputs());
        assert!(!result.changed);
        assert_eq!(result.window, params.window());

        tracker.resume();
        assert!(tracker.recompute(&params, &inputs()).changed);
    }

    #[test]
    fn scale_alone_does_not_move_a_zero_width_window() {
        // Known gap: scale only matters through the right padding, so with a
        // zero-width header a zoom never marks the window as changed.
        let mut tracker = ItemTracker::new();
        tracker.track(TrackedItem::new("a").with_due_date(day(12)));
        let mut params = ViewParameters::new(day(10), 30.0);
        params.apply_window(tracker.recompute(&params, &inputs()).window);

        let zoomed = WindowInputs {
            pixels_per_day: 5.0,
            ..inputs()
        };
        assert!(!tracker.recompute(&params, &zoomed).changed);
    }
}
