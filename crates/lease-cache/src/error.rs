//! Unified crate-level error types.
//!
//! Two error layers, one per boundary:
//! - [`CacheError`] is what [`LeaseCache`](crate::LeaseCache) surfaces to
//!   its callers.
//! - [`FetchError`] is the failure contract of the [`Fetcher`](crate::Fetcher)
//!   collaborator. It is kept separate so fetcher implementations never have
//!   to name cache-lifecycle failures they cannot produce.
//!
//! Nothing here is retried internally; every error is returned to the
//! immediate caller. The one intentionally swallowed failure is a failed
//! file deletion at the zero-transition, which is logged on the release
//! path instead of being surfaced (see `cache::lease`).

use std::io;
use std::path::PathBuf;

/// Result type used by the cache surface.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by [`LeaseCache`](crate::LeaseCache).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The configured cache root is not an existing directory.
    ///
    /// Raised at construction time; the cache never creates its own root.
    #[error("cache root is not an existing directory: {}", .0.display())]
    CacheRootMissing(PathBuf),

    /// The fetch collaborator failed while materializing a missing entry.
    #[error("fetch failed for `{url}`: {source}")]
    FetchFailed {
        /// Key whose materialization failed.
        url: String,
        /// The underlying fetcher error.
        #[source]
        source: FetchError,
    },

    /// Bytes were fetched but could not be written to the backing file.
    #[error("failed to persist `{url}`: {source}")]
    PersistFailed {
        /// Key whose materialization failed.
        url: String,
        /// The underlying filesystem error.
        #[source]
        source: io::Error,
    },

    /// `release` was called for a key with no outstanding lease.
    ///
    /// Double-release and release-without-lease are caller errors; no state
    /// is changed.
    #[error("no outstanding lease for `{0}`")]
    NoSuchLease(String),
}

/// Result type used by [`Fetcher`](crate::Fetcher) implementations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure contract of the fetch collaborator.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A generic error with a message.
    #[error("{0}")]
    Message(String),

    /// The key is not a parseable URL.
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        /// The offending key.
        url: String,
        /// Parser diagnostics.
        #[source]
        source: url::ParseError,
    },

    /// HTTP request failed.
    #[error("HTTP error: {status} for {url}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// URL that failed.
        url: String,
    },

    /// Request timed out.
    #[error("request timeout for {0}")]
    Timeout(String),

    /// Transport-level failure (connect, TLS, body read).
    #[error("transport error for {url}: {source}")]
    Transport {
        /// URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Convenience helper to construct a simple message error.
    pub fn msg(msg: impl Into<String>) -> Self {
        FetchError::Message(msg.into())
    }
}
