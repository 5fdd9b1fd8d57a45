//! Reference-counted on-disk cache for remotely fetched resources.
//!
//! A resource (an image addressed by URL, in the reference use case) is
//! materialized as a local file the first time it is leased, stays on disk
//! for as long as at least one lease is outstanding, and is deleted the
//! instant the last lease is released. Under concurrent access a missing
//! key is fetched exactly once; concurrent readers of an already-populated
//! entry proceed without locking.
//!
//! This crate is composed of several modules:
//! - `cache::lease`: [`LeaseCache`], the lease/release protocol and the
//!   cache-entry lifecycle.
//! - `cache::keys`: deterministic key-to-filename mapping.
//! - `fetcher`: the [`Fetcher`] collaborator contract plus the
//!   reqwest-backed [`HttpFetcher`].
//! - `error`: unified error types.
//!
//! This file (`lib.rs`) acts as a facade: it re-exports the main types from
//! the internal modules to form the public API of the `lease-cache` crate.

mod cache;
mod error;
mod fetcher;

pub use crate::cache::lease::LeaseCache;
pub use crate::error::{CacheError, CacheResult, FetchError, FetchResult};
pub use crate::fetcher::{Fetcher, HttpFetcher};

// Deterministic key/layout helper
pub use crate::cache::keys::filename_for_url;
