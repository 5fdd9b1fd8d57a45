//! Deterministic cache key utilities.
//!
//! A cache key (a URL) is mapped to a single flat filename under the cache
//! root. The mapping must be:
//! - **deterministic**: the same key always yields the same filename for the
//!   lifetime of the cache, and
//! - **injective**: two distinct keys never yield the same filename.
//!
//! Percent-encoding gives both properties: every byte outside the safe set
//! (including `%` itself and `/`) is escaped, so the encoded form is
//! decodable and therefore collision-free. A lossy sanitizer (mapping every
//! unsafe byte to `_`) would be simpler but cannot guarantee injectivity.
//!
//! This module does not perform any IO.

use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters kept verbatim in cache filenames.
///
/// Everything else is percent-escaped. `%` stays in the escape set, which is
/// what makes the mapping injective; `/` is escaped, which keeps every entry
/// a direct child of the cache root.
const FILENAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

/// Encode a cache key into its on-disk filename.
pub fn filename_for_url(url: &str) -> String {
    utf8_percent_encode(url, FILENAME_SET).to_string()
}

/// Resolve the backing file path for an encoded filename under `cache_root`.
pub(crate) fn path_for_filename(cache_root: &Path, filename: &str) -> PathBuf {
    cache_root.join(filename)
}
