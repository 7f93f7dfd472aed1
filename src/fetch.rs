//! Fetch and cache collaborator interfaces, plus the fetch pipeline
//!
//! The engine never performs transport I/O; the host supplies a
//! [`Fetcher`] and, optionally, a [`ByteCache`]. The pipeline consults
//! the cache, delegates the fetch, verifies the bytes, and classifies
//! the outcome. It performs no retries; transient failures surface to
//! the caller, who decides whether to try again.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FetchError, PipelineError};
use crate::mirror::FetchSpec;
use crate::resolve::ResolvedItem;
use crate::verify::{verify_bytes, Verification};

/// Transport collaborator supplied by the host application.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Optional byte cache collaborator. A miss is treated identically to a
/// cold fetch; eviction policy is the host's concern.
#[async_trait]
pub trait ByteCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn put(&self, key: &str, bytes: &[u8]);
}

/// A fetched and integrity-checked artifact.
#[derive(Debug)]
pub struct FetchedArtifact {
    pub url: String,
    pub bytes: Vec<u8>,
    pub verification: Verification,
    pub from_cache: bool,
}

/// Fetch one resolved item through the cache-fetch-verify pipeline.
///
/// Cached bytes are re-verified before use; a stale or corrupt cache
/// entry falls through to a cold fetch rather than failing the call.
/// Freshly fetched bytes that fail verification are discarded and never
/// cached.
pub async fn fetch_item(
    item: &ResolvedItem,
    spec: &FetchSpec,
    fetcher: &dyn Fetcher,
    cache: Option<&dyn ByteCache>,
) -> Result<FetchedArtifact, PipelineError> {
    let url = spec.absolute_path.as_str();

    if let Some(cache) = cache {
        if let Some(bytes) = cache.get(url).await {
            match verify_bytes(item, &bytes) {
                Ok(verification) => {
                    debug!(url, "serving artifact from cache");
                    return Ok(FetchedArtifact {
                        url: url.to_string(),
                        bytes,
                        verification,
                        from_cache: true,
                    });
                }
                Err(error) => {
                    warn!(url, %error, "cached bytes failed verification; refetching");
                }
            }
        }
    }

    let bytes = fetcher.fetch(url).await?;
    let verification = verify_bytes(item, &bytes)?;

    if let Some(cache) = cache {
        cache.put(url, &bytes).await;
    }

    Ok(FetchedArtifact {
        url: url.to_string(),
        bytes,
        verification,
        from_cache: false,
    })
}
