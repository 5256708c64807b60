use std::fmt;
use std::sync::Arc;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a work item on the timeline.
///
/// Older API payloads deliver ids as JSON numbers. They are normalized to
/// their decimal string form on construction, so `42` and `"42"` always
/// compare equal and hash to the same slot as a plain `&str` lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ItemId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ItemId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl std::ops::Deref for ItemId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Lets id-keyed maps be queried with a plain `&str`.
impl std::borrow::Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.into())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id.into())
    }
}

macro_rules! numeric_item_id {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ItemId {
                fn from(id: $ty) -> Self {
                    ItemId::from(id.to_string())
                }
            }
        )*
    };
}

numeric_item_id!(u32, u64, i32, i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct ItemIdVisitor;

impl Visitor<'_> for ItemIdVisitor {
    type Value = ItemId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer work item id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ItemId, E> {
        Ok(ItemId::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ItemId, E> {
        Ok(ItemId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ItemId, E> {
        Ok(ItemId::from(v))
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ItemIdVisitor)
    }
}
