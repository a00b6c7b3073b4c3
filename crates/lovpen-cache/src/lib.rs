//! Local fast cache for Lovpen.
//!
//! The config store keeps a copy of every persisted plugin record here so a
//! new session can start without waiting on the durable store. Two traits
//! form the API:
//!
//! [`Cache`] hands out named [`CacheBucket`]s; buckets map keys to bytes
//! guarded by an etag. [`FileCache`] keeps entries on disk, [`MemoryCache`]
//! keeps them for the life of the process and [`NullCache`] keeps nothing.
//!
//! # Example
//!
//! ```
//! use lovpen_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("plugin-config");
//! bucket.set("footnote", "", br#"{"style":"numeric"}"#).unwrap();
//! assert!(bucket.get("footnote", "").is_some());
//! ```

mod ext;
mod file;
mod memory;

use std::io;

pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

/// Key-value partition of a [`Cache`].
///
/// Every entry is stored together with an etag chosen by the writer (the
/// config store uses the record version). A lookup with a non-empty etag only
/// hits when the stored etag is identical; an empty etag accepts any entry.
pub trait CacheBucket: Send + Sync {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Replace the entry for `key`.
    fn set(&self, key: &str, etag: &str, value: &[u8]) -> io::Result<()>;
}

/// Source of named [`CacheBucket`]s. Different names never share entries.
pub trait Cache: Send + Sync {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Cache used when caching is switched off: writes vanish, reads miss.
pub struct NullCache;

struct NullBucket;

impl CacheBucket for NullBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullBucket)
    }
}
