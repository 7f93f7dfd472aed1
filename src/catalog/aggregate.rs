//! Concurrent multi-source aggregation
//!
//! Each source document load is independent and side-effect-free, so
//! loads are dispatched concurrently under a caller-supplied bound. The
//! merge reduction stays single-threaded and runs in source order, so
//! collision detection always sees the fully-merged-so-far tree and the
//! outcome is deterministic. A source that fails to fetch or load is
//! recorded as degraded and excluded; the rest of the aggregation
//! continues.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{AggregateError, SourceError};
use crate::fetch::Fetcher;
use crate::loader::load;
use crate::mirror::{derive_mirror_root, join_mirror_root};
use crate::model::Document;

use super::{inherit, AttrMap, MirrorHint, UnifiedCatalog};

/// Default number of in-flight document loads.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Maximum nesting depth for stream collections referencing further
/// collections. The wire format does not bound this, so the engine does.
pub const MAX_COLLECTION_DEPTH: usize = 4;

/// One source document to aggregate.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// Where to fetch the document from.
    pub uri: String,

    /// Mirror root for items declared in this document. Derived from the
    /// URI when absent.
    pub mirror_root: Option<String>,
}

impl SourceSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mirror_root: None,
        }
    }

    pub fn with_mirror_root(mut self, root: impl Into<String>) -> Self {
        self.mirror_root = Some(root.into());
        self
    }

    fn root(&self) -> String {
        self.mirror_root
            .clone()
            .unwrap_or_else(|| derive_mirror_root(&self.uri))
    }
}

/// A source that was excluded from the unified catalog, and why.
#[derive(Debug)]
pub struct DegradedSource {
    pub uri: String,
    pub error: SourceError,
}

/// Builds a [`UnifiedCatalog`] from many sources.
pub struct Aggregator<'f> {
    fetcher: &'f dyn Fetcher,
    concurrency: usize,
    cancel: CancellationToken,
}

impl<'f> Aggregator<'f> {
    pub fn new(fetcher: &'f dyn Fetcher) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound on concurrently in-flight document loads.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Token checked between per-document work units.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load and merge every source. Returns the usable catalog together
    /// with the sources that had to be excluded; the caller decides
    /// whether a degraded aggregation is acceptable.
    pub async fn aggregate(
        &self,
        sources: &[SourceSpec],
    ) -> Result<(UnifiedCatalog, Vec<DegradedSource>), AggregateError> {
        if self.cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }

        // Phase one: concurrent fetch+parse, order restored afterwards.
        let gather = stream::iter(sources.iter().enumerate().map(|(idx, spec)| async move {
            let result = match self.fetcher.fetch(&spec.uri).await {
                Ok(bytes) => load(&bytes, &spec.uri).map_err(SourceError::from),
                Err(e) => Err(SourceError::Fetch(e)),
            };
            (idx, result)
        }))
        .buffer_unordered(self.concurrency)
        .collect::<Vec<_>>();

        let mut results = tokio::select! {
            _ = self.cancel.cancelled() => return Err(AggregateError::Cancelled),
            results = gather => results,
        };
        results.sort_by_key(|(idx, _)| *idx);

        // Phase two: single-threaded reduction in source order.
        let mut catalog = UnifiedCatalog::new();
        let mut degraded = Vec::new();

        for (idx, result) in results {
            if self.cancel.is_cancelled() {
                return Err(AggregateError::Cancelled);
            }
            let spec = &sources[idx];
            match result {
                Ok(document) => {
                    self.merge_document(
                        &mut catalog,
                        &mut degraded,
                        document,
                        spec.root(),
                        spec.uri.clone(),
                        0,
                        AttrMap::new(),
                    )
                    .await?;
                }
                Err(error) => {
                    warn!(uri = %spec.uri, %error, "excluding degraded source");
                    degraded.push(DegradedSource {
                        uri: spec.uri.clone(),
                        error,
                    });
                }
            }
        }

        Ok((catalog, degraded))
    }

    /// Merge one already-loaded document, expanding stream collections
    /// recursively. Collection tags accumulate down the expansion and sit
    /// below the sub-document's own attributes in the override chain.
    /// Per-document failures degrade; only cancellation aborts the run.
    fn merge_document<'a>(
        &'a self,
        catalog: &'a mut UnifiedCatalog,
        degraded: &'a mut Vec<DegradedSource>,
        document: Document,
        mirror_root: String,
        source_uri: String,
        depth: usize,
        tags: AttrMap,
    ) -> BoxFuture<'a, Result<(), AggregateError>> {
        Box::pin(async move {
            match document {
                Document::Index(index) => {
                    if let Err(error) =
                        catalog.merge_index_with_tags(index, &mirror_root, &source_uri, &tags)
                    {
                        warn!(uri = %source_uri, %error, "excluding degraded source");
                        degraded.push(DegradedSource {
                            uri: source_uri,
                            error: SourceError::Load(error),
                        });
                    }
                }
                Document::Stream(stream) => {
                    if let Err(error) =
                        catalog.merge_stream_with_tags(stream, &mirror_root, &source_uri, &tags)
                    {
                        warn!(uri = %source_uri, %error, "excluding degraded source");
                        degraded.push(DegradedSource {
                            uri: source_uri,
                            error: SourceError::Load(error),
                        });
                    }
                }
                Document::Collection(collection) => {
                    if depth >= MAX_COLLECTION_DEPTH {
                        warn!(uri = %source_uri, depth, "stream collection nested too deeply");
                        degraded.push(DegradedSource {
                            uri: source_uri,
                            error: SourceError::DepthExceeded {
                                max: MAX_COLLECTION_DEPTH,
                            },
                        });
                        return Ok(());
                    }
                    let mut collection_tags = tags;
                    collection_tags.extend(collection.tags);
                    for entry in collection.streams {
                        if self.cancel.is_cancelled() {
                            return Err(AggregateError::Cancelled);
                        }
                        catalog.add_hint(MirrorHint {
                            endpoint: entry.endpoint.clone(),
                            region: entry.region.clone(),
                            arch: entry.arch.clone(),
                            cloud: entry.cloud.clone(),
                        });
                        // Entry-level free-form tags override the
                        // collection's and inherit into the sub-document.
                        let mut entry_tags = collection_tags.clone();
                        inherit::extend_scalar(&mut entry_tags, &entry.extra);
                        // Entry documents live on the same mirror as the
                        // collection that references them.
                        let sub_uri = match join_mirror_root(&mirror_root, &entry.path) {
                            Ok(uri) => uri,
                            Err(error) => {
                                degraded.push(DegradedSource {
                                    uri: format!("{source_uri} -> {}", entry.path),
                                    error: SourceError::Mirror(error),
                                });
                                continue;
                            }
                        };
                        let sub_document = match self.fetcher.fetch(&sub_uri).await {
                            Ok(bytes) => load(&bytes, &sub_uri).map_err(SourceError::from),
                            Err(e) => Err(SourceError::Fetch(e)),
                        };
                        match sub_document {
                            Ok(document) => {
                                self.merge_document(
                                    catalog,
                                    degraded,
                                    document,
                                    mirror_root.clone(),
                                    sub_uri,
                                    depth + 1,
                                    entry_tags,
                                )
                                .await?;
                            }
                            Err(error) => {
                                warn!(uri = %sub_uri, %error, "excluding degraded source");
                                degraded.push(DegradedSource {
                                    uri: sub_uri,
                                    error,
                                });
                            }
                        }
                    }
                }
            }
            Ok(())
        })
    }
}
