//! Item-group stream documents (`stream:1.0`)
//!
//! The older single-stream shape: an `iqn` naming the stream, free-form
//! tags, and an ordered list of item groups keyed by serial. The
//! aggregator normalizes these into a one-product tree with the iqn as
//! both content identifier and product key, serials as version keys, and
//! item names as item keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::FormatTag;

/// A `stream:1.0` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDocument {
    pub format: FormatTag,

    /// Stream name, used as the content identifier.
    pub iqn: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Inheritable scalar attributes for every item in the stream.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub item_groups: Vec<ItemGroup>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One dated group of items, identified by its serial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    /// Date-stamp serial. Appears as a bare number in some documents, so
    /// deserialization accepts both and keeps the string form.
    #[serde(deserialize_with = "serial_as_string")]
    pub serial: String,

    /// Release channel, e.g. `beta2`, `release`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub items: Vec<StreamItem>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One downloadable file within an item group. Names are unique within
/// their group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamItem {
    pub name: String,

    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn serial_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "serial must be a string or number, got {other}"
        ))),
    }
}
