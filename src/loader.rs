//! Catalog loader: bytes in, typed documents out
//!
//! Parsing performs no I/O and has no side effects; fetching bytes is the
//! host's job. The loader validates the format tag against the closed set
//! of recognized families, then checks schema details the type system
//! cannot express: checksum hex shapes, ftype/item-key consistency,
//! relative-only item paths, and key uniqueness where the wire format
//! allows duplicates to sneak through.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::model::{ChecksumKind, ContentIndex, Document, FormatTag, Item, StreamDocument};

static MD5_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{32}$").unwrap());
static SHA256_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// Parse one catalog document.
///
/// Fails with [`LoadError::Malformed`] when the bytes are not JSON,
/// [`LoadError::UnsupportedFormat`] when the `format` tag is absent or
/// unrecognized, and [`LoadError::SchemaViolation`] for structural
/// problems inside an otherwise recognized document.
pub fn load(bytes: &[u8], source_uri: &str) -> Result<Document, LoadError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| LoadError::Malformed {
        source_uri: source_uri.to_string(),
        source: e,
    })?;

    let raw_format = value.get("format").and_then(Value::as_str);
    let Some(tag) = raw_format.and_then(FormatTag::parse) else {
        return Err(LoadError::UnsupportedFormat {
            source_uri: source_uri.to_string(),
            format: raw_format.map(str::to_string),
        });
    };

    let document = match tag {
        FormatTag::Index(_) | FormatTag::Products => {
            let index: ContentIndex = from_value(value, source_uri)?;
            validate_index(&index, source_uri)?;
            Document::Index(index)
        }
        FormatTag::Stream => {
            let stream: StreamDocument = from_value(value, source_uri)?;
            validate_stream(&stream, source_uri)?;
            Document::Stream(stream)
        }
        FormatTag::StreamCollection => Document::Collection(from_value(value, source_uri)?),
    };

    debug!(source_uri, format = %document.format(), "loaded catalog document");
    Ok(document)
}

/// Typed deserialization of an already-syntactically-valid document.
/// Failures here are schema problems (missing required fields, wrong
/// semantic types), not malformed input.
fn from_value<T: serde::de::DeserializeOwned>(
    value: Value,
    source_uri: &str,
) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|e| LoadError::SchemaViolation {
        source_uri: source_uri.to_string(),
        key_path: "<document>".to_string(),
        reason: e.to_string(),
    })
}

fn validate_index(index: &ContentIndex, source_uri: &str) -> Result<(), LoadError> {
    if index.content_id.is_empty() {
        return Err(violation(source_uri, "content_id", "must not be empty"));
    }
    for (product_key, product) in &index.products {
        for (version_key, version) in &product.versions {
            for (item_key, item) in &version.items {
                let key_path = format!(
                    "products/{product_key}/versions/{version_key}/items/{item_key}"
                );
                validate_item(item, Some(item_key), &key_path, source_uri)?;
            }
        }
    }
    Ok(())
}

fn validate_stream(stream: &StreamDocument, source_uri: &str) -> Result<(), LoadError> {
    if stream.iqn.is_empty() {
        return Err(violation(source_uri, "iqn", "must not be empty"));
    }
    let mut serials_seen = std::collections::BTreeSet::new();
    for group in &stream.item_groups {
        if !serials_seen.insert(group.serial.as_str()) {
            return Err(violation(
                source_uri,
                &format!("item_groups/{}", group.serial),
                "duplicate serial within stream",
            ));
        }
        let mut names_seen = std::collections::BTreeSet::new();
        for item in &group.items {
            let key_path = format!("item_groups/{}/items/{}", group.serial, item.name);
            if !names_seen.insert(item.name.as_str()) {
                return Err(violation(
                    source_uri,
                    &key_path,
                    "duplicate item name within group",
                ));
            }
            validate_path(&item.path, &key_path, source_uri)?;
            validate_checksum(item.md5.as_deref(), ChecksumKind::Md5, &key_path, source_uri)?;
            validate_checksum(
                item.sha256.as_deref(),
                ChecksumKind::Sha256,
                &key_path,
                source_uri,
            )?;
        }
    }
    Ok(())
}

fn validate_item(
    item: &Item,
    item_key: Option<&str>,
    key_path: &str,
    source_uri: &str,
) -> Result<(), LoadError> {
    validate_path(&item.path, key_path, source_uri)?;
    // ftype is redundant with the item key in most documents, but when
    // both are present they must agree.
    if let (Some(ftype), Some(key)) = (item.ftype.as_deref(), item_key) {
        if ftype != key {
            return Err(violation(
                source_uri,
                key_path,
                &format!("ftype {ftype:?} disagrees with item key {key:?}"),
            ));
        }
    }
    validate_checksum(item.md5.as_deref(), ChecksumKind::Md5, key_path, source_uri)?;
    validate_checksum(
        item.sha256.as_deref(),
        ChecksumKind::Sha256,
        key_path,
        source_uri,
    )?;
    Ok(())
}

fn validate_path(path: &str, key_path: &str, source_uri: &str) -> Result<(), LoadError> {
    if path.is_empty() {
        return Err(violation(source_uri, key_path, "item path must not be empty"));
    }
    if path.starts_with('/') || path.contains("://") {
        return Err(violation(
            source_uri,
            key_path,
            "item path must be relative to the mirror root",
        ));
    }
    Ok(())
}

fn validate_checksum(
    sum: Option<&str>,
    kind: ChecksumKind,
    key_path: &str,
    source_uri: &str,
) -> Result<(), LoadError> {
    let Some(sum) = sum else { return Ok(()) };
    let shape_ok = match kind {
        ChecksumKind::Md5 => MD5_RE.is_match(sum),
        ChecksumKind::Sha256 => SHA256_RE.is_match(sum),
    };
    if !shape_ok {
        return Err(violation(
            source_uri,
            &format!("{key_path}/{kind}"),
            &format!("not a {} hex-char {kind} digest", kind.hex_len()),
        ));
    }
    Ok(())
}

fn violation(source_uri: &str, key_path: &str, reason: &str) -> LoadError {
    LoadError::SchemaViolation {
        source_uri: source_uri.to_string(),
        key_path: key_path.to_string(),
        reason: reason.to_string(),
    }
}
