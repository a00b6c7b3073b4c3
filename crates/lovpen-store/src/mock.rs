//! Mock backend for testing.
//!
//! Provides [`MockBackend`] for exercising tier fall-through, write failure
//! isolation and read/write races without touching the filesystem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::ConfigBackend;
use crate::error::{StoreError, StoreErrorKind};
use crate::record::PersistedConfigRecord;

/// In-memory tier with injectable latency and failures.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use lovpen_store::MockBackend;
///
/// let slow = MockBackend::new("remote").with_read_delay(Duration::from_millis(50));
/// slow.set_fail_writes(true);
/// ```
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    records: RwLock<HashMap<String, PersistedConfigRecord>>,
    read_delay_ms: AtomicU64,
    write_delay_ms: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockBackend {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(HashMap::new()),
            read_delay_ms: AtomicU64::new(0),
            write_delay_ms: AtomicU64::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed a record.
    #[must_use]
    pub fn with_record(self, record: PersistedConfigRecord) -> Self {
        self.insert(record);
        self
    }

    #[must_use]
    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.set_read_delay(delay);
        self
    }

    #[must_use]
    pub fn with_write_delay(self, delay: Duration) -> Self {
        self.set_write_delay(delay);
        self
    }

    /// Replace a record without counting it as a write.
    pub fn insert(&self, record: PersistedConfigRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.plugin_name.clone(), record);
    }

    #[must_use]
    pub fn record(&self, plugin: &str) -> Option<PersistedConfigRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(plugin)
            .cloned()
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms.store(millis(delay), Ordering::Relaxed);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms.store(millis(delay), Ordering::Relaxed);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of `get` calls so far, failed ones included.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `put` calls so far, failed ones included.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

async fn pause(ms: &AtomicU64) {
    let ms = ms.load(Ordering::Relaxed);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl ConfigBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, plugin: &str) -> Result<Option<PersistedConfigRecord>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        pause(&self.read_delay_ms).await;
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(StoreError::new(StoreErrorKind::ReadFailed)
                .with_backend(&self.name)
                .with_plugin(plugin)
                .with_message("injected read failure"));
        }
        Ok(self.record(plugin))
    }

    async fn put(&self, record: &PersistedConfigRecord) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        pause(&self.write_delay_ms).await;
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::new(StoreErrorKind::WriteFailed)
                .with_backend(&self.name)
                .with_plugin(&record.plugin_name)
                .with_message("injected write failure"));
        }
        self.insert(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_seeded_record() {
        let backend = MockBackend::new("mock").with_record(sample());
        assert_eq!(backend.get("footnote").await.unwrap(), Some(sample()));
        assert_eq!(backend.read_count(), 1);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = MockBackend::new("flaky");
        backend.set_fail_writes(true);
        let err = backend.put(&sample()).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::WriteFailed);
        assert_eq!(backend.record("footnote"), None);

        backend.set_fail_reads(true);
        let err = backend.get("footnote").await.unwrap_err();
        assert_eq!(err.to_string(), "[flaky] Read failed: injected read failure (plugin: footnote)");
    }
}
