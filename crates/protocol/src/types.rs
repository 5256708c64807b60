use chrono::{DateTime, NaiveDate};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::item_id::ItemId;

/// Read view onto an external work item, reduced to the fields that place it
/// on the timeline.
///
/// Every date is optional. Consumers substitute "today" for a missing date,
/// and malformed date strings are treated as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub id: ItemId,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    /// Milestones carry a single date instead of a start/due pair.
    #[serde(default, rename = "date", alias = "singleDate", deserialize_with = "lenient_date")]
    pub single_date: Option<NaiveDate>,
}

impl TrackedItem {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            start_date: None,
            due_date: None,
            single_date: None,
        }
    }

    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn with_single_date(mut self, date: NaiveDate) -> Self {
        self.single_date = Some(date);
        self
    }

    /// The `(start, end, mid)` dates this item occupies, with `now`
    /// substituted for every missing date.
    pub fn span_dates(&self, now: NaiveDate) -> (NaiveDate, NaiveDate, NaiveDate) {
        (
            self.start_date.unwrap_or(now),
            self.due_date.unwrap_or(now),
            self.single_date.unwrap_or(now),
        )
    }
}

/// Accepts `null`, `"2024-03-01"` or a full RFC 3339 timestamp. Other
/// scalars and unparsable strings become `None` instead of failing the item.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientDate)
}

struct LenientDate;

impl<'de> Visitor<'de> for LenientDate {
    type Value = Option<NaiveDate>;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a date string or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(parse_date(v))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(LenientDate)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(None)
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.date_naive())
}

/// Kind of relation created between an origin and a picked target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// The origin follows the target (the target becomes its predecessor).
    Follows,
    /// The origin precedes the target (the target becomes its follower).
    Precedes,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Follows => "follows",
            Self::Precedes => "precedes",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date range rendered by the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DisplayWindow {
    /// A window collapsed onto a single day.
    pub fn at(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Number of days between start and end.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn missing_dates_fall_back_to_now() {
        let now = day(2024, 5, 1);
        let item = TrackedItem::new("1").with_due_date(day(2024, 5, 9));
        assert_eq!(item.span_dates(now), (now, day(2024, 5, 9), now));
    }

    #[test]
    fn parses_api_payload_with_numeric_id() {
        let json = r#"{"id": 7, "startDate": "2024-01-02", "dueDate": "2024-01-05"}"#;
        let item: TrackedItem = serde_json::from_str(json).unwrap_or_else(|_| TrackedItem::new(""));
        assert_eq!(item.id, "7");
        assert_eq!(item.start_date, Some(day(2024, 1, 2)));
        assert_eq!(item.due_date, Some(day(2024, 1, 5)));
        assert_eq!(item.single_date, None);
    }

    #[test]
    fn milestone_date_and_malformed_values() {
        let json = r#"{"id": "m1", "date": "2024-02-29T10:00:00+01:00", "startDate": "soon", "dueDate": 5}"#;
        let item: TrackedItem = serde_json::from_str(json).unwrap_or_else(|_| TrackedItem::new(""));
        assert_eq!(item.id, "m1");
        assert_eq!(item.single_date, Some(day(2024, 2, 29)));
        assert_eq!(item.start_date, None);
        assert_eq!(item.due_date, None);
    }

    #[test]
    fn relation_kind_wire_names() {
        assert_eq!(RelationKind::Follows.as_str(), "follows");
        assert_eq!(
            serde_json::to_string(&RelationKind::Precedes).unwrap_or_default(),
            "\"precedes\""
        );
    }

    #[test]
    fn window_length() {
        let window = DisplayWindow {
            start: day(2024, 1, 1),
            end: day(2024, 1, 31),
        };
        assert_eq!(window.days(), 30);
        assert_eq!(DisplayWindow::at(day(2024, 1, 1)).days(), 0);
    }
}
