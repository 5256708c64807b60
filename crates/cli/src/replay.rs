//! Recorded update logs and the events they replay.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use timeline_sync_protocol::{ItemId, TrackedItem};

/// A recorded session: the host state plus the events to replay in order.
///
/// ```json
/// {
///   "header_width_px": 800,
///   "today": "2024-01-01",
///   "events": [
///     { "kind": "update", "item": { "id": 1, "startDate": "2024-01-02" } },
///     { "kind": "start_predecessor", "origin": 1 },
///     { "kind": "select", "target": 2 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayLog {
    pub header_width_px: f64,
    /// Pinned "today". The local date when absent.
    #[serde(default)]
    pub today: Option<NaiveDate>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    /// Plain item snapshots, replayed as `update` events before `events`.
    #[serde(default)]
    pub updates: Vec<TrackedItem>,
    #[serde(default)]
    pub events: Vec<ReplayEvent>,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayEvent {
    Update { item: TrackedItem },
    StartPredecessor { origin: ItemId },
    StartFollower { origin: ItemId },
    Select { target: ItemId },
    Cancel,
    Scroll { offset_px: f64 },
    Zoom { pixels_per_day: f64 },
    Visibility { visible: bool },
    Refresh,
    /// Pause so the debounce timer can fire.
    Wait { ms: u64 },
}

impl ReplayLog {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Every event in replay order, with the plain `updates` first.
    pub fn into_events(self) -> Vec<ReplayEvent> {
        self.updates
            .into_iter()
            .map(|item| ReplayEvent::Update { item })
            .chain(self.events)
            .collect()
    }
}
