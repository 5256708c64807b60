use chrono::{Days, NaiveDate};
use timeline_sync_protocol::{DisplayWindow, TrackedItem};

/// Everything besides the tracked items that shapes the display window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowInputs {
    pub now: NaiveDate,
    pub pixels_per_day: f64,
    pub header_width_px: f64,
    pub left_padding_days: u64,
    pub right_padding_factor: f64,
}

/// Outcome of one recomputation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recompute {
    pub window: DisplayWindow,
    pub changed: bool,
}

/// Compute the date window needed to show every item.
///
/// The window always contains `now`. Items without dates sit on `now`.
/// The start is padded by a fixed number of days; the end by as many days
/// as fit in `right_padding_factor` header widths at the current scale.
pub fn compute_window<'a>(
    items: impl IntoIterator<Item = &'a TrackedItem>,
    inputs: &WindowInputs,
) -> DisplayWindow {
    let now = inputs.now;
    let mut window = DisplayWindow::at(now);

    for item in items {
        let (start, end, mid) = item.span_dates(now);
        window.start = window.start.min(start).min(mid);
        window.end = window.end.max(end).max(mid);
    }

    window.start = window
        .start
        .checked_sub_days(Days::new(inputs.left_padding_days))
        .unwrap_or(NaiveDate::MIN);

    let right = visible_days(
        inputs.header_width_px,
        inputs.pixels_per_day,
        inputs.right_padding_factor,
    );
    window.end = window
        .end
        .checked_add_days(Days::new(right))
        .unwrap_or(NaiveDate::MAX);

    window
}

/// `ceil(header_width / pixels_per_day * factor)`, clamped to zero for
/// degenerate inputs.
pub fn visible_days(header_width_px: f64, pixels_per_day: f64, factor: f64) -> u64 {
    let days = (header_width_px / pixels_per_day * factor).ceil();
    if days.is_finite() && days > 0.0 {
        days as u64
    } else {
        0
    }
}
