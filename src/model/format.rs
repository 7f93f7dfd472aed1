//! Format tag recognition
//!
//! Every document carries a top-level `format` tag naming its schema
//! family. The recognized set is closed; anything else is a hard load
//! failure, never a silent skip.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Recognized schema families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatTag {
    /// An `index:*` top-level index naming one content tree. The full
    /// tag is preserved so re-emission is faithful.
    Index(String),
    /// A `products:1.0` product tree document.
    Products,
    /// A `stream:1.0` item-group stream document.
    Stream,
    /// A `stream-collection:1.0` fan-out to regional sub-documents.
    StreamCollection,
}

impl FormatTag {
    /// Parse a raw tag string, returning `None` for anything outside the
    /// recognized set.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "products:1.0" => Some(FormatTag::Products),
            "stream:1.0" => Some(FormatTag::Stream),
            "stream-collection:1.0" => Some(FormatTag::StreamCollection),
            _ => {
                let rest = tag.strip_prefix("index:")?;
                if rest.is_empty() {
                    None
                } else {
                    Some(FormatTag::Index(tag.to_string()))
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FormatTag::Index(tag) => tag,
            FormatTag::Products => "products:1.0",
            FormatTag::Stream => "stream:1.0",
            FormatTag::StreamCollection => "stream-collection:1.0",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FormatTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormatTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FormatTag::parse(&raw)
            .ok_or_else(|| D::Error::custom(format!("unrecognized format tag: {raw}")))
    }
}
