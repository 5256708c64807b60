use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::item_id::ItemId;
use crate::types::{DisplayWindow, RelationKind};

/// The relation a running selection will create once a target is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSelection {
    pub origin_id: ItemId,
    pub kind: RelationKind,
}

/// Everything a timeline renderer needs to place items horizontally.
///
/// A new value is produced whenever the display window moves; renderers only
/// ever see it behind an `Arc` and treat it as read-only. Scroll offset and
/// scale travel on lighter paths and never mark the window as changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewParameters {
    pub display_window_start: NaiveDate,
    pub display_window_end: NaiveDate,
    /// Horizontal scale. Always positive.
    pub pixels_per_day: f64,
    /// Style-only horizontal offset of the timeline body.
    pub scroll_offset_px: f64,
    /// The "today" used by the last window computation.
    pub now: NaiveDate,
    pub active_selection_mode: Option<ActiveSelection>,
}

impl ViewParameters {
    pub fn new(now: NaiveDate, pixels_per_day: f64) -> Self {
        Self {
            display_window_start: now,
            display_window_end: now,
            pixels_per_day,
            scroll_offset_px: 0.0,
            now,
            active_selection_mode: None,
        }
    }

    pub fn window(&self) -> DisplayWindow {
        DisplayWindow {
            start: self.display_window_start,
            end: self.display_window_end,
        }
    }

    /// Id of the item a running selection started from.
    ///
    /// Derived from `active_selection_mode`, so the two are always set and
    /// cleared together.
    pub fn selection_mode_start_id(&self) -> Option<&ItemId> {
        self.active_selection_mode
            .as_ref()
            .map(|selection| &selection.origin_id)
    }

    /// Move the window to `window`. Returns whether either bound moved.
    pub fn apply_window(&mut self, window: DisplayWindow) -> bool {
        let changed = self.window() != window;
        self.display_window_start = window.start;
        self.display_window_end = window.end;
        changed
    }

    /// Horizontal pixel position of `date` relative to the window start.
    pub fn x_for(&self, date: NaiveDate) -> f64 {
        (date - self.display_window_start).num_days() as f64 * self.pixels_per_day
    }
}
