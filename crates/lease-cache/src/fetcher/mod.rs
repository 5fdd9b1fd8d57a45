//! Fetch collaborator contract.
//!
//! The cache never obtains bytes itself; it depends on a single capability:
//! given a key (URL), produce the resource's bytes or fail. How that happens
//! (HTTP, disk, an in-process mock) is irrelevant to the cache.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchResult;

mod http;

pub use http::HttpFetcher;

/// External capability that produces the bytes for a cache key.
///
/// The cache calls [`fetch`](Self::fetch) at most once per missing key per
/// materialization and never retries; implementations are free to carry
/// their own retry or timeout policy. Failures are surfaced to the `lease`
/// caller as [`CacheError::FetchFailed`](crate::CacheError::FetchFailed),
/// with no entry created.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the resource identified by `url`.
    async fn fetch(&self, url: &str) -> FetchResult<Bytes>;
}
