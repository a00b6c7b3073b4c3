//! Durable tier: one JSON file per plugin.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::ConfigBackend;
use crate::error::{StoreError, StoreErrorKind};
use crate::record::PersistedConfigRecord;

const BACKEND: &str = "fs";

/// Stores `{plugin}.json` files under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never sees a half-written record.
#[derive(Debug, Clone)]
pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, plugin: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(plugin)))
    }
}

/// Plugin names are free-form; keep file names portable.
fn file_stem(plugin: &str) -> String {
    plugin
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ConfigBackend for FsBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn get(&self, plugin: &str) -> Result<Option<PersistedConfigRecord>, StoreError> {
        let path = self.record_path(plugin);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::new(StoreErrorKind::ReadFailed)
                    .with_backend(BACKEND)
                    .with_plugin(plugin)
                    .with_source(e));
            }
        };
        let record: PersistedConfigRecord = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::new(StoreErrorKind::Corrupt)
                .with_backend(BACKEND)
                .with_plugin(plugin)
                .with_source(e)
        })?;
        // Distinct names can share a sanitized file name.
        if record.plugin_name != plugin {
            tracing::debug!(plugin, stored = %record.plugin_name, "record file belongs to another plugin");
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn put(&self, record: &PersistedConfigRecord) -> Result<(), StoreError> {
        let write_failed = |e: io::Error| {
            StoreError::new(StoreErrorKind::WriteFailed)
                .with_backend(BACKEND)
                .with_plugin(&record.plugin_name)
                .with_source(e)
        };

        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            StoreError::new(StoreErrorKind::WriteFailed)
                .with_backend(BACKEND)
                .with_plugin(&record.plugin_name)
                .with_source(e)
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(write_failed)?;
        let path = self.record_path(&record.plugin_name);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp, &path).await.map_err(write_failed)?;

        tracing::debug!(
            backend = BACKEND,
            plugin = %record.plugin_name,
            version = record.version,
            "wrote config record"
        );
        Ok(())
    }
}
