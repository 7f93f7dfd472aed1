//! Attribute inheritance: Product → Version → Item
//!
//! The override chain is an explicit three-level merge so the rule stays
//! auditable and testable in isolation: child overrides parent, and only
//! scalar string attributes participate. Structural fields and artifact
//! descriptors (paths, sizes, checksums) never inherit.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{Item, ItemGroup, Product, StreamItem, Version};

/// Flattened scalar attributes of one entity level.
pub type AttrMap = BTreeMap<String, String>;

/// Merge the three levels bottom-up; item overrides version overrides
/// product.
pub fn effective_attrs(product: &AttrMap, version: &AttrMap, item: &AttrMap) -> AttrMap {
    let mut merged = product.clone();
    merged.extend(version.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(item.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Scalar attributes declared on a product.
pub(crate) fn product_attrs(product: &Product) -> AttrMap {
    let mut attrs = AttrMap::new();
    insert_opt(&mut attrs, "arch", &product.arch);
    insert_opt(&mut attrs, "release", &product.release);
    insert_opt(&mut attrs, "stream", &product.stream);
    insert_opt(&mut attrs, "region", &product.region);
    insert_opt(&mut attrs, "endpoint", &product.endpoint);
    insert_opt(&mut attrs, "virt_type", &product.virt_type);
    insert_opt(&mut attrs, "version", &product.version);
    insert_opt(&mut attrs, "build", &product.build);
    extend_scalar(&mut attrs, &product.extra);
    attrs
}

/// Scalar attributes declared on a version.
pub(crate) fn version_attrs(version: &Version) -> AttrMap {
    let mut attrs = AttrMap::new();
    insert_opt(&mut attrs, "label", &version.label);
    insert_opt(&mut attrs, "pubname", &version.pubname);
    insert_opt(&mut attrs, "version", &version.version);
    extend_scalar(&mut attrs, &version.extra);
    attrs
}

/// Scalar attributes declared on an item. The artifact descriptor fields
/// (path, name, size, checksums) are deliberately excluded.
pub(crate) fn item_attrs(item: &Item) -> AttrMap {
    let mut attrs = AttrMap::new();
    insert_opt(&mut attrs, "ftype", &item.ftype);
    extend_scalar(&mut attrs, &item.extra);
    attrs
}

/// Scalar attributes of a stream item-group (label only, plus extras).
pub(crate) fn group_attrs(group: &ItemGroup) -> AttrMap {
    let mut attrs = AttrMap::new();
    insert_opt(&mut attrs, "label", &group.label);
    extend_scalar(&mut attrs, &group.extra);
    attrs
}

/// Scalar attributes of a stream item.
pub(crate) fn stream_item_attrs(item: &StreamItem) -> AttrMap {
    let mut attrs = AttrMap::new();
    extend_scalar(&mut attrs, &item.extra);
    attrs
}

fn insert_opt(attrs: &mut AttrMap, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        attrs.insert(key.to_string(), value.clone());
    }
}

pub(crate) fn extend_scalar(attrs: &mut AttrMap, extra: &BTreeMap<String, Value>) {
    for (key, value) in extra {
        if let Value::String(s) = value {
            attrs.insert(key.clone(), s.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs(pairs: &[(&str, &str)]) -> AttrMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn child_overrides_parent() {
        let product = attrs(&[("arch", "amd64"), ("release", "pinky")]);
        let version = attrs(&[("label", "release")]);
        let item = attrs(&[("arch", "i386")]);

        let merged = effective_attrs(&product, &version, &item);
        assert_eq!(merged.get("arch").map(String::as_str), Some("i386"));
        assert_eq!(merged.get("release").map(String::as_str), Some("pinky"));
        assert_eq!(merged.get("label").map(String::as_str), Some("release"));
    }

    #[test]
    fn parent_defaults_survive_when_unset_below() {
        let product = attrs(&[("arch", "amd64")]);
        let merged = effective_attrs(&product, &AttrMap::new(), &AttrMap::new());
        assert_eq!(merged.get("arch").map(String::as_str), Some("amd64"));
    }

    #[test]
    fn version_overrides_product_but_not_item() {
        let product = attrs(&[("version", "6.1")]);
        let version = attrs(&[("version", "0.3.1~pre4")]);
        let item = AttrMap::new();
        let merged = effective_attrs(&product, &version, &item);
        assert_eq!(
            merged.get("version").map(String::as_str),
            Some("0.3.1~pre4")
        );
    }

    #[test]
    fn non_scalar_extras_do_not_inherit() {
        let mut product = crate::model::Product {
            arch: Some("amd64".to_string()),
            release: None,
            stream: None,
            region: None,
            endpoint: None,
            virt_type: None,
            version: None,
            build: None,
            versions: Default::default(),
            extra: Default::default(),
        };
        product.extra.insert(
            "mirrors".to_string(),
            serde_json::json!(["a.example.com", "b.example.com"]),
        );
        product
            .extra
            .insert("cloud".to_string(), serde_json::json!("aws"));

        let flat = product_attrs(&product);
        assert!(flat.contains_key("cloud"));
        assert!(!flat.contains_key("mirrors"));
    }
}
