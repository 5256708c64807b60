use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::types::TrackedItem;
use crate::view_params::ViewParameters;

/// A single render instruction for one timeline row.
///
/// Pairs the live view parameters with the item snapshot the row should
/// draw. Renderers consume it as-is; everything needed to place the bar is in
/// here.
#[derive(Debug, Clone)]
pub struct RenderInfo {
    pub view_params: Arc<ViewParameters>,
    pub item: TrackedItem,
}

impl RenderInfo {
    pub fn new(view_params: Arc<ViewParameters>, item: TrackedItem) -> Self {
        Self { view_params, item }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.view_params, &self.item)
    }
}

/// Content key used to drop redundant render emissions.
///
/// Concatenates window start, window end, single date, start date and due
/// date. A moved window changes the key even when the item itself did not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(params: &ViewParameters, item: &TrackedItem) -> Self {
        let mut key = String::with_capacity(64);
        let _ = write!(key, "{}{}", params.display_window_start, params.display_window_end);
        for date in [item.single_date, item.start_date, item.due_date] {
            push_date(&mut key, date);
        }
        Self(key)
    }
}

fn push_date(key: &mut String, date: Option<NaiveDate>) {
    key.push('|');
    if let Some(date) = date {
        let _ = write!(key, "{date}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DisplayWindow;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap_or_default()
    }

    fn params(start: u32, end: u32) -> ViewParameters {
        let mut params = ViewParameters::new(day(1), 30.0);
        params.apply_window(DisplayWindow {
            start: day(start),
            end: day(end),
        });
        params
    }

    #[test]
    fn same_inputs_same_fingerprint() {
        let item = TrackedItem::new("1").with_start_date(day(3));
        assert_eq!(
            Fingerprint::of(&params(1, 20), &item),
            Fingerprint::of(&params(1, 20), &item.clone())
        );
    }

    #[test]
    fn window_shift_invalidates() {
        let item = TrackedItem::new("1").with_start_date(day(3));
        assert_ne!(
            Fingerprint::of(&params(1, 20), &item),
            Fingerprint::of(&params(1, 21), &item)
        );
    }

    #[test]
    fn moving_a_date_between_fields_invalidates() {
        let as_start = TrackedItem::new("1").with_start_date(day(3));
        let as_due = TrackedItem::new("1").with_due_date(day(3));
        assert_ne!(
            Fingerprint::of(&params(1, 20), &as_start),
            Fingerprint::of(&params(1, 20), &as_due)
        );
    }

    #[test]
    fn scroll_offset_does_not_participate() {
        let item = TrackedItem::new("1");
        let mut scrolled = params(1, 20);
        scrolled.scroll_offset_px = 250.0;
        assert_eq!(
            Fingerprint::of(&params(1, 20), &item),
            Fingerprint::of(&scrolled, &item)
        );
    }
}
