//! JSON access on top of byte buckets.

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Serde helpers available on every [`CacheBucket`].
///
/// ```
/// use lovpen_cache::{Cache, CacheBucketExt, MemoryCache};
///
/// let cache = MemoryCache::new();
/// let bucket = cache.bucket("plugin-config");
/// bucket.set_json("footnote", "1", &vec!["numeric"]).unwrap();
/// let styles: Option<Vec<String>> = bucket.get_json("footnote", "1");
/// assert_eq!(styles, Some(vec!["numeric".to_owned()]));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Decode the entry for `key`. Entries that fail to decode count as a
    /// miss.
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Option<T> {
        let bytes = self.get(key, etag)?;
        serde_json::from_slice(&bytes)
            .inspect_err(|e| tracing::debug!(key, error = %e, "ignoring undecodable cache entry"))
            .ok()
    }

    fn set_json<T: Serialize>(&self, key: &str, etag: &str, value: &T) -> io::Result<()> {
        let bytes = serde_json::to_vec(value).map_err(io::Error::other)?;
        self.set(key, etag, &bytes)
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
