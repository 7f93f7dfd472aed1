//! Unified catalog: the merged, immutable, queryable tree
//!
//! The aggregator exclusively owns a [`UnifiedCatalog`]; resolvers only
//! borrow it. Every item is annotated with the mirror root of the
//! document it came from (documents never embed absolute URLs), and every
//! level keeps its flattened scalar attributes so the inheritance merge
//! can run without reaching back into the wire model.
//!
//! Merging is two-phase per document: all incoming item triples are
//! checked against the already-merged tree first, then committed. A
//! collision on the same ProductKey+VersionKey+ItemKey within one content
//! identifier is a schema violation and leaves the catalog untouched;
//! the same triple under a different content identifier is fine.

mod aggregate;
mod inherit;

pub use aggregate::{Aggregator, DegradedSource, SourceSpec, DEFAULT_CONCURRENCY, MAX_COLLECTION_DEPTH};
pub use inherit::{effective_attrs, AttrMap};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::LoadError;
use crate::model::{ContentIndex, StreamDocument};

/// The merged view over every successfully loaded source document.
#[derive(Debug, Default)]
pub struct UnifiedCatalog {
    trees: BTreeMap<String, ContentTree>,
    hints: Vec<MirrorHint>,
}

/// All products known under one content identifier.
#[derive(Debug, Default)]
pub struct ContentTree {
    pub products: BTreeMap<String, CatalogProduct>,
}

/// A product with flattened attributes and its merged versions.
#[derive(Debug, Clone)]
pub struct CatalogProduct {
    pub attrs: AttrMap,
    pub versions: BTreeMap<String, CatalogVersion>,
}

/// One version snapshot inside the merged tree.
#[derive(Debug, Clone)]
pub struct CatalogVersion {
    pub attrs: AttrMap,
    pub label: Option<String>,
    pub pubname: Option<String>,
    pub items: BTreeMap<String, CatalogItem>,
}

/// One downloadable artifact, annotated with the mirror root of the
/// document that declared it.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub attrs: AttrMap,
    pub path: String,
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub mirror_root: Arc<str>,
}

/// A mirror candidate contributed by a stream-collection entry.
#[derive(Debug, Clone)]
pub struct MirrorHint {
    pub endpoint: String,
    pub region: Option<String>,
    pub arch: Option<String>,
    pub cloud: Option<String>,
}

impl MirrorHint {
    /// A hint matches when every dimension declared on both sides agrees.
    /// A dimension missing on either side does not constrain.
    pub fn matches(&self, region: Option<&str>, arch: Option<&str>) -> bool {
        let region_ok = match (self.region.as_deref(), region) {
            (Some(h), Some(i)) => h == i,
            _ => true,
        };
        let arch_ok = match (self.arch.as_deref(), arch) {
            (Some(h), Some(i)) => h == i,
            _ => true,
        };
        region_ok && arch_ok
    }
}

impl UnifiedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a product tree document into the catalog.
    pub fn merge_index(
        &mut self,
        index: ContentIndex,
        mirror_root: &str,
        source_uri: &str,
    ) -> Result<(), LoadError> {
        self.merge_index_with_tags(index, mirror_root, source_uri, &AttrMap::new())
    }

    /// Merge a product tree document together with tags inherited from the
    /// stream collection that referenced it. The tags sit below product
    /// attributes in the override chain.
    pub fn merge_index_with_tags(
        &mut self,
        index: ContentIndex,
        mirror_root: &str,
        source_uri: &str,
        tags: &AttrMap,
    ) -> Result<(), LoadError> {
        let root: Arc<str> = Arc::from(mirror_root);
        let content_id = index.content_id.clone();
        let mut incoming: BTreeMap<String, CatalogProduct> = BTreeMap::new();

        for (product_key, product) in &index.products {
            let mut attrs = tags.clone();
            attrs.extend(inherit::product_attrs(product));
            let mut merged = CatalogProduct {
                attrs,
                versions: BTreeMap::new(),
            };
            for (version_key, version) in &product.versions {
                let mut cat_version = CatalogVersion {
                    attrs: inherit::version_attrs(version),
                    label: version.label.clone(),
                    pubname: version.pubname.clone(),
                    items: BTreeMap::new(),
                };
                for (item_key, item) in &version.items {
                    cat_version.items.insert(
                        item_key.clone(),
                        CatalogItem {
                            attrs: inherit::item_attrs(item),
                            path: item.path.clone(),
                            size: item.size,
                            md5: item.md5.clone(),
                            sha256: item.sha256.clone(),
                            mirror_root: Arc::clone(&root),
                        },
                    );
                }
                merged.versions.insert(version_key.clone(), cat_version);
            }
            incoming.insert(product_key.clone(), merged);
        }

        self.merge_products(&content_id, incoming, source_uri)
    }

    /// Merge a `stream:1.0` document, normalized into a one-product tree
    /// keyed by the stream's iqn. Serials become version keys and item
    /// names become item keys.
    pub fn merge_stream(
        &mut self,
        stream: StreamDocument,
        mirror_root: &str,
        source_uri: &str,
    ) -> Result<(), LoadError> {
        self.merge_stream_with_tags(stream, mirror_root, source_uri, &AttrMap::new())
    }

    /// Merge a `stream:1.0` document with inherited collection tags. The
    /// stream's own tags override the inherited ones.
    pub fn merge_stream_with_tags(
        &mut self,
        stream: StreamDocument,
        mirror_root: &str,
        source_uri: &str,
        tags: &AttrMap,
    ) -> Result<(), LoadError> {
        let root: Arc<str> = Arc::from(mirror_root);

        let mut attrs = tags.clone();
        attrs.extend(stream.tags.clone());
        let mut product = CatalogProduct {
            attrs,
            versions: BTreeMap::new(),
        };
        for group in &stream.item_groups {
            let mut version = CatalogVersion {
                attrs: inherit::group_attrs(group),
                label: group.label.clone(),
                pubname: None,
                items: BTreeMap::new(),
            };
            for item in &group.items {
                version.items.insert(
                    item.name.clone(),
                    CatalogItem {
                        attrs: inherit::stream_item_attrs(item),
                        path: item.path.clone(),
                        size: item.size,
                        md5: item.md5.clone(),
                        sha256: item.sha256.clone(),
                        mirror_root: Arc::clone(&root),
                    },
                );
            }
            product.versions.insert(group.serial.clone(), version);
        }

        let mut incoming = BTreeMap::new();
        incoming.insert(stream.iqn.clone(), product);
        self.merge_products(&stream.iqn, incoming, source_uri)
    }

    /// Record a mirror candidate from a stream-collection entry.
    pub fn add_hint(&mut self, hint: MirrorHint) {
        self.hints.push(hint);
    }

    /// Two-phase merge: detect collisions against the fully-merged-so-far
    /// tree, then commit. The catalog is untouched on failure.
    fn merge_products(
        &mut self,
        content_id: &str,
        incoming: BTreeMap<String, CatalogProduct>,
        source_uri: &str,
    ) -> Result<(), LoadError> {
        if let Some(tree) = self.trees.get(content_id) {
            for (product_key, product) in &incoming {
                let Some(existing) = tree.products.get(product_key) else {
                    continue;
                };
                for (version_key, version) in &product.versions {
                    let Some(existing_version) = existing.versions.get(version_key) else {
                        continue;
                    };
                    for item_key in version.items.keys() {
                        if existing_version.items.contains_key(item_key) {
                            return Err(LoadError::SchemaViolation {
                                source_uri: source_uri.to_string(),
                                key_path: format!(
                                    "{content_id}/{product_key}/{version_key}/{item_key}"
                                ),
                                reason: "duplicate product/version/item combination within one content identifier".to_string(),
                            });
                        }
                    }
                }
            }
        }

        let tree = self.trees.entry(content_id.to_string()).or_default();
        for (product_key, product) in incoming {
            match tree.products.get_mut(&product_key) {
                None => {
                    tree.products.insert(product_key, product);
                }
                Some(existing) => {
                    // First-seen product attributes win; later documents
                    // only contribute versions and items.
                    for (version_key, version) in product.versions {
                        match existing.versions.get_mut(&version_key) {
                            None => {
                                existing.versions.insert(version_key, version);
                            }
                            Some(existing_version) => {
                                existing_version.items.extend(version.items);
                            }
                        }
                    }
                }
            }
        }

        debug!(content_id, source_uri, "merged document into catalog");
        Ok(())
    }

    /// The tree for one content identifier, if known.
    pub fn tree(&self, content_id: &str) -> Option<&ContentTree> {
        self.trees.get(content_id)
    }

    /// All known content identifiers.
    pub fn content_ids(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Mirror candidates collected from stream collections, in document
    /// order.
    pub fn hints(&self) -> &[MirrorHint] {
        &self.hints
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Total number of products across all content identifiers.
    pub fn product_count(&self) -> usize {
        self.trees.values().map(|t| t.products.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;
    use crate::model::Document;

    fn index(content_id: &str, product_key: &str, version_key: &str, item_key: &str) -> ContentIndex {
        let raw = format!(
            r#"{{
                "format": "products:1.0",
                "content_id": "{content_id}",
                "products": {{
                    "{product_key}": {{
                        "arch": "amd64",
                        "versions": {{
                            "{version_key}": {{
                                "items": {{
                                    "{item_key}": {{"path": "files/{version_key}/x.img"}}
                                }}
                            }}
                        }}
                    }}
                }}
            }}"#
        );
        match load(raw.as_bytes(), "mem://test").unwrap() {
            Document::Index(index) => index,
            _ => unreachable!(),
        }
    }

    #[test]
    fn same_content_id_disjoint_keys_merge() {
        let mut catalog = UnifiedCatalog::new();
        catalog
            .merge_index(
                index("com.example.foovendor:released:download", "pinky:server:amd64", "20121026", "disk1.img"),
                "http://mirror-a.example.com",
                "a",
            )
            .unwrap();
        catalog
            .merge_index(
                index("com.example.foovendor:released:download", "pinky:server:i386", "20121026", "disk1.img"),
                "http://mirror-b.example.com",
                "b",
            )
            .unwrap();

        let tree = catalog.tree("com.example.foovendor:released:download").unwrap();
        assert_eq!(tree.products.len(), 2);
    }

    #[test]
    fn overlapping_triple_is_a_schema_violation() {
        let mut catalog = UnifiedCatalog::new();
        catalog
            .merge_index(
                index("com.example.foovendor:released:download", "pinky:server:amd64", "20121026", "disk1.img"),
                "http://mirror-a.example.com",
                "a",
            )
            .unwrap();
        let err = catalog
            .merge_index(
                index("com.example.foovendor:released:download", "pinky:server:amd64", "20121026", "disk1.img"),
                "http://mirror-b.example.com",
                "b",
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::SchemaViolation { .. }));

        // The failed merge must not have committed anything.
        let tree = catalog.tree("com.example.foovendor:released:download").unwrap();
        let product = &tree.products["pinky:server:amd64"];
        let item = &product.versions["20121026"].items["disk1.img"];
        assert_eq!(&*item.mirror_root, "http://mirror-a.example.com");
    }

    #[test]
    fn same_triple_under_distinct_content_ids_is_retained() {
        let mut catalog = UnifiedCatalog::new();
        catalog
            .merge_index(
                index("com.example:released:download", "pinky:server:amd64", "20121026", "disk1.img"),
                "http://a",
                "a",
            )
            .unwrap();
        catalog
            .merge_index(
                index("com.example:devel:download", "pinky:server:amd64", "20121026", "disk1.img"),
                "http://b",
                "b",
            )
            .unwrap();
        assert_eq!(catalog.content_ids().count(), 2);
        assert_eq!(catalog.product_count(), 2);
    }

    #[test]
    fn items_carry_their_documents_mirror_root() {
        let mut catalog = UnifiedCatalog::new();
        catalog
            .merge_index(
                index("com.example:released:download", "pinky:server:amd64", "20121026", "disk1.img"),
                "http://mirror-a.example.com",
                "a",
            )
            .unwrap();
        catalog
            .merge_index(
                index("com.example:released:download", "pinky:server:amd64", "20130111", "disk1.img"),
                "http://mirror-b.example.com",
                "b",
            )
            .unwrap();

        let product = &catalog.tree("com.example:released:download").unwrap().products
            ["pinky:server:amd64"];
        assert_eq!(
            &*product.versions["20121026"].items["disk1.img"].mirror_root,
            "http://mirror-a.example.com"
        );
        assert_eq!(
            &*product.versions["20130111"].items["disk1.img"].mirror_root,
            "http://mirror-b.example.com"
        );
    }

    #[test]
    fn stream_documents_normalize_to_one_product() {
        let raw = r#"{
            "format": "stream:1.0",
            "iqn": "iqn.2012-12.com.example:released:pinky:server:amd64",
            "tags": {"release": "pinky", "arch": "amd64"},
            "item_groups": [
                {
                    "serial": 20121026.1,
                    "label": "release",
                    "items": [
                        {"name": "root.tar.gz", "path": "files/root.tar.gz"}
                    ]
                }
            ]
        }"#;
        let Document::Stream(stream) = load(raw.as_bytes(), "mem://s").unwrap() else {
            unreachable!()
        };
        let mut catalog = UnifiedCatalog::new();
        catalog.merge_stream(stream, "http://mirror.example.com", "mem://s").unwrap();

        let tree = catalog
            .tree("iqn.2012-12.com.example:released:pinky:server:amd64")
            .unwrap();
        let product = tree
            .products
            .get("iqn.2012-12.com.example:released:pinky:server:amd64")
            .unwrap();
        assert_eq!(product.attrs.get("release").map(String::as_str), Some("pinky"));
        assert!(product.versions.contains_key("20121026.1"));
    }

    #[test]
    fn inherited_collection_tags_sit_below_document_attributes() {
        let raw = r#"{
            "format": "stream:1.0",
            "iqn": "iqn.2012-12.com.example:released:pinky:server:amd64",
            "tags": {"release": "pinky"},
            "item_groups": [
                {
                    "serial": "20130111",
                    "items": [{"name": "disk.img", "path": "files/disk.img"}]
                }
            ]
        }"#;
        let Document::Stream(stream) = load(raw.as_bytes(), "mem://s").unwrap() else {
            unreachable!()
        };

        let tags: AttrMap = [
            ("release".to_string(), "stale".to_string()),
            ("cloud".to_string(), "foocloud".to_string()),
        ]
        .into();
        let mut catalog = UnifiedCatalog::new();
        catalog
            .merge_stream_with_tags(stream, "http://mirror.example.com", "mem://s", &tags)
            .unwrap();

        let product = &catalog
            .tree("iqn.2012-12.com.example:released:pinky:server:amd64")
            .unwrap()
            .products["iqn.2012-12.com.example:released:pinky:server:amd64"];
        // The stream's own tag wins; tags it does not declare inherit.
        assert_eq!(product.attrs.get("release").map(String::as_str), Some("pinky"));
        assert_eq!(product.attrs.get("cloud").map(String::as_str), Some("foocloud"));
    }
}
