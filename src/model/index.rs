//! Product tree documents (`products:1.0`, `index:*`)
//!
//! A product tree maps a content identifier to products, products to
//! dated versions, and versions to downloadable items. Scalar attributes
//! declared on a product are defaults inherited by everything beneath it
//! unless overridden at a lower level.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FormatTag;

/// A product tree document: one content identifier and its products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentIndex {
    pub format: FormatTag,

    /// Opaque key naming one logical catalog stream,
    /// e.g. `net.cirros-cloud:devel:download`.
    pub content_id: String,

    /// Freshness timestamp (RFC 2822). Display only; never consulted for
    /// ordering decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,

    /// Free-form datatype label, e.g. `image-downloads`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,

    /// Products keyed by composite product key, e.g. `pinky:server:amd64`.
    #[serde(default)]
    pub products: BTreeMap<String, Product>,

    /// Fields outside the known schema, preserved for re-emission.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ContentIndex {
    /// Parse the `updated` field, when present and well-formed.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Total number of versions across all products.
    pub fn version_count(&self) -> usize {
        self.products.values().map(|p| p.versions.len()).sum()
    }
}

/// One build variant (architecture/release/region combination) within a
/// content tree. Scalar fields are inheritable defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Explicit endpoint. When set, mirror resolution uses it outright.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virt_type: Option<String>,

    /// Release version label, e.g. `6.1`. Distinct from version keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,

    /// Versions keyed by date-stamp-like serial, e.g. `20130111`.
    /// Keys compare lexicographically; the maximum is "latest".
    #[serde(default)]
    pub versions: BTreeMap<String, Version>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A dated release snapshot of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Release channel, e.g. `beta2`, `release`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Human display string, e.g. `cirros-0.3.1~pre4-arm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Items keyed by file-type tag, e.g. `disk.img`, `uec.tar.gz`.
    #[serde(default)]
    pub items: BTreeMap<String, Item>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One concrete downloadable file belonging to a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Path relative to the mirror root. Documents never embed absolute
    /// URLs; resolution happens against an externally supplied root.
    pub path: String,

    /// File type, redundant with the item key in most documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Byte count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Item {
    /// The checksum declared for a given algorithm, if any.
    pub fn checksum(&self, kind: ChecksumKind) -> Option<&str> {
        match kind {
            ChecksumKind::Md5 => self.md5.as_deref(),
            ChecksumKind::Sha256 => self.sha256.as_deref(),
        }
    }

    /// The strongest checksum the item carries (sha256 over md5).
    pub fn strongest_checksum(&self) -> Option<(ChecksumKind, &str)> {
        if let Some(sum) = self.sha256.as_deref() {
            return Some((ChecksumKind::Sha256, sum));
        }
        self.md5.as_deref().map(|sum| (ChecksumKind::Md5, sum))
    }

    pub fn has_checksum(&self) -> bool {
        self.md5.is_some() || self.sha256.is_some()
    }
}

/// Checksum algorithms understood by the verifier, ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChecksumKind {
    Md5,
    Sha256,
}

impl ChecksumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumKind::Md5 => "md5",
            ChecksumKind::Sha256 => "sha256",
        }
    }

    /// Expected length of the hex digest for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumKind::Md5 => 32,
            ChecksumKind::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strongest_checksum_prefers_sha256() {
        let item = Item {
            path: "files/disk.img".to_string(),
            ftype: None,
            name: None,
            size: None,
            md5: Some("a".repeat(32)),
            sha256: Some("b".repeat(64)),
            extra: BTreeMap::new(),
        };
        let (kind, sum) = item.strongest_checksum().unwrap();
        assert_eq!(kind, ChecksumKind::Sha256);
        assert_eq!(sum, "b".repeat(64));
    }

    #[test]
    fn updated_at_parses_rfc2822() {
        let index = ContentIndex {
            format: FormatTag::Products,
            content_id: "com.example:download".to_string(),
            updated: Some("Fri, 12 Apr 2013 19:44:12 +0000".to_string()),
            datatype: None,
            products: BTreeMap::new(),
            extra: BTreeMap::new(),
        };
        let ts = index.updated_at().unwrap();
        assert_eq!(ts.timestamp(), 1_365_795_852);
    }

    #[test]
    fn updated_at_tolerates_garbage() {
        let index = ContentIndex {
            format: FormatTag::Products,
            content_id: "com.example:download".to_string(),
            updated: Some("yesterday-ish".to_string()),
            datatype: None,
            products: BTreeMap::new(),
            extra: BTreeMap::new(),
        };
        assert!(index.updated_at().is_none());
    }
}
