//! On-disk cache.
//!
//! Entries live under `{root}/{bucket}/{key}.entry`. An entry is the etag on
//! its own line followed by the raw value:
//!
//! ```text
//! 7\n{"pluginName":"footnote",...}
//! ```
//!
//! The root holds a `.lovpen-cache` marker with the format version of the
//! build that wrote it. A different or missing marker clears every bucket
//! before the cache is used.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Cache, CacheBucket};

const MARKER: &str = ".lovpen-cache";
const ENTRY_EXT: &str = "entry";

/// [`Cache`] persisted as plain files below `root`.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open the cache at `root`, clearing it when it was written by another
    /// format `version`. Failures are logged; the cache then simply misses.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        if let Err(e) = ensure_version(&root, version) {
            tracing::warn!(root = %root.display(), error = %e, "could not prepare cache directory");
        }
        Self { root }
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(DirBucket {
            dir: self.root.join(name),
        })
    }
}

struct DirBucket {
    dir: PathBuf,
}

impl DirBucket {
    fn entry_path(&self, key: &str) -> PathBuf {
        let stem: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{stem}.{ENTRY_EXT}"))
    }
}

impl CacheBucket for DirBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let mut bytes = fs::read(&path).ok()?;
        let Some(split) = bytes.iter().position(|b| *b == b'\n') else {
            tracing::debug!(path = %path.display(), "cache entry without etag line");
            return None;
        };
        if !etag.is_empty() && &bytes[..split] != etag.as_bytes() {
            return None;
        }
        Some(bytes.split_off(split + 1))
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) -> io::Result<()> {
        if etag.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "etag must fit on one line",
            ));
        }
        fs::create_dir_all(&self.dir)?;

        let mut entry = Vec::with_capacity(etag.len() + 1 + value.len());
        entry.extend_from_slice(etag.as_bytes());
        entry.push(b'\n');
        entry.extend_from_slice(value);

        let path = self.entry_path(key);
        let staging = path.with_extension("partial");
        fs::write(&staging, &entry)?;
        fs::rename(&staging, &path)
    }
}

/// Make sure `root` exists and carries the marker for `version`.
fn ensure_version(root: &Path, version: &str) -> io::Result<()> {
    let marker = root.join(MARKER);
    let stored = fs::read_to_string(&marker).ok();
    if stored.as_deref() == Some(version) {
        return Ok(());
    }

    if root.is_dir() {
        tracing::info!(
            stored = stored.as_deref().unwrap_or("none"),
            current = version,
            "cache format changed, clearing buckets"
        );
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            }
        }
    }
    fs::create_dir_all(root)?;
    fs::write(marker, version)
}
