//! Mirror selection and traversal-safe path joining
//!
//! Selection order: an explicit endpoint attached to the product or item
//! wins outright; otherwise collection-derived hints matching the item's
//! inherited region/arch are ranked by the caller's preferred-region
//! order. Hints whose region is not listed rank after every listed one,
//! with document order as the final tie-break.

use crate::catalog::MirrorHint;
use crate::error::MirrorError;
use crate::resolve::ResolvedItem;

/// Where to fetch one resolved item from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    pub endpoint: String,

    /// Mirror root joined with the item's relative path.
    pub absolute_path: String,
}

/// Pick the concrete endpoint and absolute path for a resolved item.
pub fn resolve_mirror(
    item: &ResolvedItem,
    hints: &[MirrorHint],
    preferred_regions: &[String],
) -> Result<FetchSpec, MirrorError> {
    let absolute_path = join_mirror_root(&item.mirror_root, &item.path)?;

    if let Some(endpoint) = item.attr("endpoint") {
        return Ok(FetchSpec {
            endpoint: endpoint.to_string(),
            absolute_path,
        });
    }

    let region = item.attr("region");
    let arch = item.attr("arch");

    let best = hints
        .iter()
        .enumerate()
        .filter(|(_, hint)| hint.matches(region, arch))
        .min_by_key(|(idx, hint)| (region_rank(hint, preferred_regions), *idx));

    match best {
        Some((_, hint)) => Ok(FetchSpec {
            endpoint: hint.endpoint.clone(),
            absolute_path,
        }),
        None => Err(MirrorError::NoMirrorAvailable {
            item: format!(
                "{}/{}/{}/{}",
                item.content_id, item.product_key, item.version_key, item.item_key
            ),
            region: region.map(str::to_string),
            arch: arch.map(str::to_string),
        }),
    }
}

fn region_rank(hint: &MirrorHint, preferred_regions: &[String]) -> usize {
    hint.region
        .as_deref()
        .and_then(|region| preferred_regions.iter().position(|p| p == region))
        .unwrap_or(preferred_regions.len())
}

/// Join a relative document path onto a mirror root with normalized
/// segment semantics. A path that attempts to leave the root (leading
/// slash, embedded scheme, or `..` past the top) is rejected.
pub fn join_mirror_root(root: &str, path: &str) -> Result<String, MirrorError> {
    let traversal = || MirrorError::PathTraversal {
        root: root.to_string(),
        path: path.to_string(),
    };

    if path.starts_with('/') || path.contains("://") {
        return Err(traversal());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(traversal());
                }
            }
            other => segments.push(other),
        }
    }

    Ok(format!(
        "{}/{}",
        root.trim_end_matches('/'),
        segments.join("/")
    ))
}

/// Derive the mirror root from a document URI. Catalog documents
/// conventionally live under `streams/v1/` at the top of their mirror;
/// anything else falls back to the URI's directory.
pub fn derive_mirror_root(uri: &str) -> String {
    if let Some(pos) = uri.find("/streams/") {
        return uri[..pos].to_string();
    }
    match uri.rfind('/') {
        Some(pos) => uri[..pos].to_string(),
        None => uri.to_string(),
    }
}
