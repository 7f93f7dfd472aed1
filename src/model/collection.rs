//! Stream collection documents (`stream-collection:1.0`)
//!
//! A collection fans a single logical catalog out across regional or
//! mirror-specific sub-documents. Entries are ordered; document order is
//! the final tie-break during mirror selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FormatTag;

/// A `stream-collection:1.0` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamCollection {
    pub format: FormatTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered mirror entries.
    #[serde(default)]
    pub streams: Vec<MirrorEntry>,

    /// Free-form tags describing the collection as a whole.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One mirror entry: where a sub-document lives and which region, arch,
/// and cloud it serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorEntry {
    /// Concrete endpoint for artifacts resolved through this entry.
    pub endpoint: String,

    /// Path to the referenced sub-document, relative to the collection's
    /// mirror root.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// Cloud provider tag, e.g. `aws`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
