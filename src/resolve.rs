//! Query resolution over the unified catalog
//!
//! Pure functions over an immutable snapshot; no locking, no side
//! effects. "Latest" is lexicographic comparison of version keys, per
//! the date-stamp convention of the source ecosystem. Keys are not
//! guaranteed to be valid dates, so no semantic date or version parsing
//! is attempted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::{effective_attrs, AttrMap, CatalogProduct, UnifiedCatalog};
use crate::error::ResolveError;
use crate::model::ChecksumKind;

/// How to pick versions from each matching product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPolicy {
    /// The single highest version key, by lexicographic order.
    Latest,
    /// Exactly this version key; absence is an error.
    Pinned(String),
    /// Every version.
    All,
}

/// One filter term: exact value or arbitrary predicate.
#[derive(Clone)]
pub enum Matcher {
    Exact(String),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Matcher {
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Matcher::Predicate(Arc::new(f))
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Exact(expected) => expected == value,
            Matcher::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(v) => f.debug_tuple("Exact").field(v).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::Exact(value.to_string())
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::Exact(value)
    }
}

/// A set of attribute constraints. A product matches only when every
/// term matches its (inherited) attributes; a term naming an attribute
/// the product lacks does not match.
#[derive(Debug, Default, Clone)]
pub struct Filters(BTreeMap<String, Matcher>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, matcher: impl Into<Matcher>) -> Self {
        self.0.insert(field.into(), matcher.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn matches(&self, attrs: &AttrMap) -> bool {
        self.0.iter().all(|(field, matcher)| {
            attrs
                .get(field)
                .map(|value| matcher.matches(value))
                .unwrap_or(false)
        })
    }
}

/// One resolved artifact with its fully inherited attribute view.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub content_id: String,
    pub product_key: String,
    pub version_key: String,
    pub item_key: String,

    /// Relative path; combine with `mirror_root` via the mirror resolver.
    pub path: String,
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub mirror_root: Arc<str>,

    /// Product → Version → Item merged attributes.
    pub attrs: AttrMap,
}

impl ResolvedItem {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

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

/// The outcome of one query. Empty is a normal, representable result.
#[derive(Debug, Default)]
pub struct ResolvedSet {
    pub items: Vec<ResolvedItem>,
}

impl ResolvedSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedItem> {
        self.items.iter()
    }
}

/// Resolve with default item selection (all items per selected version).
pub fn resolve(
    catalog: &UnifiedCatalog,
    content_id: &str,
    filters: &Filters,
    policy: &VersionPolicy,
) -> Result<ResolvedSet, ResolveError> {
    resolve_items(catalog, content_id, filters, policy, None)
}

/// Resolve, additionally restricting items to one file type. An item's
/// effective file type is its `ftype` attribute, falling back to its key.
pub fn resolve_items(
    catalog: &UnifiedCatalog,
    content_id: &str,
    filters: &Filters,
    policy: &VersionPolicy,
    ftype: Option<&str>,
) -> Result<ResolvedSet, ResolveError> {
    let mut set = ResolvedSet::default();
    let Some(tree) = catalog.tree(content_id) else {
        return Ok(set);
    };

    for (product_key, product) in &tree.products {
        if !filters.matches(&product.attrs) {
            continue;
        }
        // Two products tying under every filter are both returned; the
        // caller disambiguates with a narrower filter.
        for version_key in select_versions(product, policy, content_id, product_key)? {
            let version = &product.versions[version_key];
            for (item_key, item) in &version.items {
                let effective_ftype = item
                    .attrs
                    .get("ftype")
                    .map(String::as_str)
                    .unwrap_or(item_key);
                if let Some(wanted) = ftype {
                    if effective_ftype != wanted {
                        continue;
                    }
                }
                set.items.push(ResolvedItem {
                    content_id: content_id.to_string(),
                    product_key: product_key.clone(),
                    version_key: version_key.to_string(),
                    item_key: item_key.clone(),
                    path: item.path.clone(),
                    size: item.size,
                    md5: item.md5.clone(),
                    sha256: item.sha256.clone(),
                    mirror_root: Arc::clone(&item.mirror_root),
                    attrs: effective_attrs(&product.attrs, &version.attrs, &item.attrs),
                });
            }
        }
    }

    Ok(set)
}

fn select_versions<'a>(
    product: &'a CatalogProduct,
    policy: &VersionPolicy,
    content_id: &str,
    product_key: &str,
) -> Result<Vec<&'a str>, ResolveError> {
    match policy {
        // BTreeMap keys are sorted, so the last key is the lexicographic
        // maximum.
        VersionPolicy::Latest => Ok(product
            .versions
            .keys()
            .next_back()
            .map(String::as_str)
            .into_iter()
            .collect()),
        VersionPolicy::Pinned(version) => match product.versions.get_key_value(version) {
            Some((key, _)) => Ok(vec![key.as_str()]),
            None => Err(ResolveError::VersionNotFound {
                content_id: content_id.to_string(),
                product_key: product_key.to_string(),
                version: version.clone(),
            }),
        },
        VersionPolicy::All => Ok(product.versions.keys().map(String::as_str).collect()),
    }
}
