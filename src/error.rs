//! Engine error taxonomy with structured, actionable detail
//!
//! Loader failures (`LoadError`) are fatal for the document they describe
//! but non-fatal for an overall aggregation, where they become part of a
//! [`DegradedSource`](crate::catalog::DegradedSource) record. Resolver and
//! mirror failures are fatal for the query that triggered them and nothing
//! else. A checksum mismatch means the fetched bytes must be discarded.

use thiserror::Error;

use crate::model::ChecksumKind;

/// Failures while parsing a single catalog document.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The bytes do not parse as JSON at all.
    #[error("Document from {source_uri} is not valid JSON")]
    Malformed {
        source_uri: String,
        #[source]
        source: serde_json::Error,
    },

    /// The `format` tag is absent or outside the recognized set.
    #[error("Document from {source_uri} has unsupported format tag {format:?}\n\nRecognized families: index:*, products:1.0, stream:1.0, stream-collection:1.0")]
    UnsupportedFormat {
        source_uri: String,
        format: Option<String>,
    },

    /// The document parsed but violates the schema: a required field is
    /// missing, a checksum is not a hex string of the expected length, or
    /// a key collides within its parent mapping.
    #[error("Schema violation in {source_uri} at {key_path}: {reason}")]
    SchemaViolation {
        source_uri: String,
        key_path: String,
        reason: String,
    },
}

impl LoadError {
    /// The URI of the document the error refers to.
    pub fn source_uri(&self) -> &str {
        match self {
            LoadError::Malformed { source_uri, .. }
            | LoadError::UnsupportedFormat { source_uri, .. }
            | LoadError::SchemaViolation { source_uri, .. } => source_uri,
        }
    }
}

/// Failures reported by the fetch collaborator. The engine never performs
/// transport I/O itself; it only classifies what the host hands back.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Transport failure fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("I/O failure fetching {url}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why one source document was excluded from an aggregation.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    /// A stream collection referenced another collection past the nesting
    /// bound. The wire format does not rule this out, so the engine does.
    #[error("Stream collection nesting exceeds the maximum depth of {max}")]
    DepthExceeded { max: usize },
}

/// Failures of the whole aggregation run, as opposed to per-source ones.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Catalog aggregation was cancelled")]
    Cancelled,
}

/// Query resolution failures. An empty result set is not an error.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Version {version} not found for product {product_key} in {content_id}")]
    VersionNotFound {
        content_id: String,
        product_key: String,
        version: String,
    },
}

/// Mirror selection and path joining failures.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("No mirror available for {item} (region {region:?}, arch {arch:?})")]
    NoMirrorAvailable {
        item: String,
        region: Option<String>,
        arch: Option<String>,
    },

    #[error("Relative path {path:?} escapes the mirror root {root}")]
    PathTraversal { root: String, path: String },
}

/// Integrity verification failures.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The computed digest does not match the one the catalog declares.
    /// The fetched bytes must be discarded by the caller.
    #[error("Checksum mismatch ({algorithm}): expected {expected}, computed {actual}")]
    ChecksumMismatch {
        algorithm: ChecksumKind,
        expected: String,
        actual: String,
    },

    #[error("Failed to read byte source for verification")]
    Read(#[from] std::io::Error),
}

/// Failures of the cache-fetch-verify pipeline, classified for the caller.
/// The engine performs no retries; a transient fetch failure surfaces here
/// and the host decides whether to try again.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Integrity(#[from] VerifyError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),
}
