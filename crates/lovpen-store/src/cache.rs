//! Local fast tier backed by a [`lovpen_cache`] bucket.

use async_trait::async_trait;
use lovpen_cache::{Cache, CacheBucket, CacheBucketExt};

use crate::backend::ConfigBackend;
use crate::error::{StoreError, StoreErrorKind};
use crate::record::PersistedConfigRecord;

const BACKEND: &str = "cache";

/// Bucket name used for config records.
pub const CONFIG_BUCKET: &str = "plugin-config";

/// Keeps records in a cache bucket keyed by plugin name.
///
/// Entries are stored with the record version as etag and read back without
/// etag validation. Undecodable entries read as absent.
pub struct CacheBackend {
    bucket: Box<dyn CacheBucket>,
}

impl CacheBackend {
    #[must_use]
    pub fn new(bucket: Box<dyn CacheBucket>) -> Self {
        Self { bucket }
    }

    /// Use the [`CONFIG_BUCKET`] bucket of `cache`.
    #[must_use]
    pub fn from_cache(cache: &dyn Cache) -> Self {
        Self::new(cache.bucket(CONFIG_BUCKET))
    }
}

#[async_trait]
impl ConfigBackend for CacheBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn get(&self, plugin: &str) -> Result<Option<PersistedConfigRecord>, StoreError> {
        Ok(self
            .bucket
            .get_json::<PersistedConfigRecord>(plugin, "")
            .filter(|r| r.plugin_name == plugin))
    }

    async fn put(&self, record: &PersistedConfigRecord) -> Result<(), StoreError> {
        self.bucket
            .set_json(&record.plugin_name, &record.etag(), record)
            .map_err(|e| {
                StoreError::new(StoreErrorKind::WriteFailed)
                    .with_backend(BACKEND)
                    .with_plugin(&record.plugin_name)
                    .with_source(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample;
    use lovpen_cache::{FileCache, MemoryCache, NullCache};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let cache = MemoryCache::new();
        let backend = CacheBackend::from_cache(&cache);
        backend.put(&sample()).await.unwrap();
        assert_eq!(backend.get("footnote").await.unwrap(), Some(sample()));
        assert_eq!(backend.get("math").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = FileCache::new(dir.path().to_path_buf(), "1.0.0");
            CacheBackend::from_cache(&cache).put(&sample()).await.unwrap();
        }
        let cache = FileCache::new(dir.path().to_path_buf(), "1.0.0");
        let stored = CacheBackend::from_cache(&cache).get("footnote").await.unwrap();
        assert_eq!(stored.map(|r| r.version), Some(3));
    }

    #[tokio::test]
    async fn test_null_cache_always_misses() {
        let backend = CacheBackend::from_cache(&NullCache);
        backend.put(&sample()).await.unwrap();
        assert_eq!(backend.get("footnote").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_entry_reads_as_absent() {
        let cache = MemoryCache::new();
        cache.bucket(CONFIG_BUCKET).set("footnote", "1", b"garbage").unwrap();
        let backend = CacheBackend::from_cache(&cache);
        assert_eq!(backend.get("footnote").await.unwrap(), None);
    }
}
