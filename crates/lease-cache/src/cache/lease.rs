//! Reference-counted lease cache over remotely fetched resources.
//!
//! Protocol
//! --------
//! `lease` publishes the caller's claim by incrementing the key's count
//! *before* probing the filesystem. Count >= 1 means "someone is responsible
//! for this file", so a concurrent `release` on the same key can never reach
//! the zero-transition underneath an in-flight lease.
//!
//! The miss path is double-checked: existence is probed once without any
//! lock (the hot path for already-cached keys), then re-probed under the
//! cache-wide populate lock before fetching. For N concurrent leases of a
//! missing key exactly one fetch happens; the rest observe the populated
//! file on re-check.
//!
//! `release` decrements under the same populate lock. At the zero-transition
//! the bookkeeping entry is removed and the backing file unlinked while the
//! count table is still locked, so a racing `lease` either published its
//! claim first (the count never reaches zero) or observes the post-unlink
//! filesystem and repopulates.
//!
//! Failure handling
//! ----------------
//! A failed fetch or persist rolls the optimistic increment back; a lease
//! that never materialized leaves no bookkeeping behind. A failed unlink at
//! the zero-transition is logged and otherwise ignored: the entry stays
//! forgotten either way.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::keys;
use crate::error::{CacheError, CacheResult};
use crate::fetcher::Fetcher;

/// Spool filename used while materializing an entry.
///
/// Encoded entry filenames only ever contain `%` followed by two hex digits,
/// so a name starting with `%p` can never collide with an entry. Writes to
/// the spool are serialized by the populate lock.
const SPOOL_FILENAME: &str = "%partial";

/// Reference-counted on-disk cache keyed by URL.
///
/// Each distinct key is backed by one file directly under the cache root.
/// Cloning is cheap; clones share the count table and the populate lock, so
/// a cache can be handed to many tasks.
#[derive(Clone, Debug)]
pub struct LeaseCache<F>
where
    F: Fetcher,
{
    fetcher: F,
    cache_root: PathBuf,

    // Lease counts by encoded filename. Shared across clones.
    state: Arc<Mutex<State>>,

    // Serializes the create (fetch + persist) and delete transitions.
    // Async because it is held across the fetch.
    populate_lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Default, Debug)]
struct State {
    leases: HashMap<String, u64>,
}

impl<F> LeaseCache<F>
where
    F: Fetcher,
{
    /// Create a cache rooted at `cache_root`.
    ///
    /// The root directory must already exist; the cache refuses to start
    /// without one rather than silently creating it.
    pub fn new(fetcher: F, cache_root: impl Into<PathBuf>) -> CacheResult<Self> {
        let cache_root = cache_root.into();
        if !cache_root.is_dir() {
            return Err(CacheError::CacheRootMissing(cache_root));
        }

        Ok(Self {
            fetcher,
            cache_root,
            state: Arc::new(Mutex::new(State::default())),
            populate_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Return the root directory backing this cache.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Lease `url`, materializing its backing file on first use.
    ///
    /// Returns the path of the backing file. The file stays on disk at least
    /// until the lease is released; every successful `lease` must be matched
    /// by exactly one [`release`](Self::release). Whether the bytes came
    /// from the fetcher or from disk is transparent to the caller.
    pub async fn lease(&self, url: &str) -> CacheResult<PathBuf> {
        let filename = keys::filename_for_url(url);
        let path = keys::path_for_filename(&self.cache_root, &filename);

        // Publish the claim before probing the filesystem: a concurrent
        // release must see this lease before it can reach the
        // zero-transition.
        {
            let mut state = self.state.lock();
            let count = state.leases.entry(filename.clone()).or_insert(0);
            *count += 1;
            trace!("lease: count={} key='{}'", *count, url);
        }

        // Hot path: already materialized, no exclusive section needed.
        if path.is_file() {
            trace!("lease: HIT key='{}'", url);
            return Ok(path);
        }

        let _populating = self.populate_lock.lock().await;

        // Another leaser may have populated the file while we waited.
        if path.is_file() {
            trace!("lease: HIT after wait key='{}'", url);
            return Ok(path);
        }

        trace!("lease: MISS key='{}'", url);
        match self.populate(url, &path).await {
            Ok(()) => Ok(path),
            Err(e) => {
                // Roll the optimistic increment back: a lease that never
                // materialized must not leave a phantom count behind.
                self.unpublish(&filename, url);
                Err(e)
            }
        }
    }

    /// Release a lease previously obtained for `url`.
    ///
    /// The last release deletes the backing file and forgets the entry, so
    /// the returned path must not be used after the matching release. A
    /// release without an outstanding lease is a caller error
    /// ([`CacheError::NoSuchLease`]).
    pub async fn release(&self, url: &str) -> CacheResult<()> {
        let filename = keys::filename_for_url(url);
        let path = keys::path_for_filename(&self.cache_root, &filename);

        // Same exclusive section as the miss path: the delete transition
        // never runs concurrently with a create.
        let _populating = self.populate_lock.lock().await;

        let mut state = self.state.lock();
        let Some(count) = state.leases.get_mut(&filename) else {
            return Err(CacheError::NoSuchLease(url.to_string()));
        };
        *count -= 1;

        if *count > 0 {
            trace!("release: count={} key='{}'", *count, url);
            return Ok(());
        }

        // Zero-transition: forget the entry and unlink the file while the
        // table is still locked, so a racing lease cannot observe the file
        // between the decrement and the unlink.
        state.leases.remove(&filename);
        debug!("release: deleting key='{}' path='{}'", url, path.display());
        if let Err(e) = fs::remove_file(&path) {
            warn!("release: failed to delete '{}': {}", path.display(), e);
        }

        Ok(())
    }

    /// Fetch and persist a missing entry. Caller holds the populate lock.
    async fn populate(&self, url: &str, path: &Path) -> CacheResult<()> {
        let bytes = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|source| CacheError::FetchFailed {
                url: url.to_string(),
                source,
            })?;

        debug!("lease: fetched {} bytes key='{}'", bytes.len(), url);

        // Spool then rename: the entry path only ever holds fully written
        // bytes, so the lock-free hot path never reads a partial file.
        let spool = self.cache_root.join(SPOOL_FILENAME);
        let persisted = fs::write(&spool, &bytes).and_then(|()| fs::rename(&spool, path));
        persisted.map_err(|source| CacheError::PersistFailed {
            url: url.to_string(),
            source,
        })
    }

    /// Withdraw a published claim after a failed materialization.
    fn unpublish(&self, filename: &str, url: &str) {
        let mut state = self.state.lock();
        if let Some(count) = state.leases.get_mut(filename) {
            *count -= 1;
            trace!("lease: rolled back count={} key='{}'", *count, url);
            if *count == 0 {
                state.leases.remove(filename);
            }
        }
    }
}
