//! JSON-lines records written while a log replays.

use std::io::Write;

use chrono::NaiveDate;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use serde::Serialize;
use timeline_sync_protocol::{ItemId, RelationKind, RenderInfo, ViewParameters};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Record {
    Broadcast {
        window_start: NaiveDate,
        window_end: NaiveDate,
        pixels_per_day: f64,
        scroll_offset_px: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        selecting_from: Option<ItemId>,
    },
    Render {
        id: ItemId,
        window_start: NaiveDate,
        /// Left edge of the bar relative to the window start.
        x_px: f64,
        width_px: f64,
    },
    Relation {
        origin: ItemId,
        kind: RelationKind,
        target: ItemId,
    },
    Error {
        message: String,
    },
}

impl Record {
    pub fn broadcast(params: &ViewParameters) -> Self {
        Record::Broadcast {
            window_start: params.display_window_start,
            window_end: params.display_window_end,
            pixels_per_day: params.pixels_per_day,
            scroll_offset_px: params.scroll_offset_px,
            selecting_from: params.selection_mode_start_id().cloned(),
        }
    }

    /// Bar geometry of a render emission. The end is inclusive, so a
    /// one-day item is one day wide.
    pub fn render(info: &RenderInfo) -> Self {
        let params = &info.view_params;
        let (start, end, mid) = info.item.span_dates(params.now);
        let (left, right) = if info.item.single_date.is_some() {
            (mid, mid)
        } else {
            (start, end.max(start))
        };
        let x_px = params.x_for(left);
        Record::Render {
            id: info.item.id.clone(),
            window_start: params.display_window_start,
            x_px,
            width_px: params.x_for(right) - x_px + params.pixels_per_day,
        }
    }
}

pub type RecordSink = UnboundedSender<Record>;

pub fn channel() -> (RecordSink, UnboundedReceiver<Record>) {
    unbounded()
}

/// Write every record as one JSON line until all senders are gone.
pub async fn write_records(
    mut records: UnboundedReceiver<Record>,
    mut out: impl Write,
) -> anyhow::Result<usize> {
    let mut written = 0;
    while let Some(record) = records.next().await {
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
