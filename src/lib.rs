//! streamcat: a resolution engine for simplestreams-style catalogs
//!
//! Loads versioned catalog documents of downloadable cloud images,
//! aggregates many sources into one unified catalog, answers filtered
//! queries against it, selects mirrors for the resolved items, and
//! verifies fetched bytes against the catalog's checksums.
//!
//! The engine performs no transport I/O of its own; hosts supply a
//! [`fetch::Fetcher`] (and optionally a [`fetch::ByteCache`]) and drive
//! the pipeline:
//!
//! 1. [`catalog::Aggregator`] fetches, loads, and merges the configured
//!    sources into a [`catalog::UnifiedCatalog`].
//! 2. [`resolve::resolve`] answers attribute-filtered queries with a
//!    [`resolve::ResolvedSet`].
//! 3. [`mirror::resolve_mirror`] turns each resolved item into a concrete
//!    [`mirror::FetchSpec`].
//! 4. [`fetch::fetch_item`] runs the cache-fetch-verify pipeline, using
//!    [`verify`] to check integrity.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod mirror;
pub mod model;
pub mod resolve;
pub mod verify;
