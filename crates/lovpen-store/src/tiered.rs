//! Prioritized list of persistence tiers.

use std::sync::Arc;

use futures::future::join_all;

use crate::backend::ConfigBackend;
use crate::error::StoreError;
use crate::record::PersistedConfigRecord;

/// Result of fanning one record out to every tier.
#[derive(Debug)]
pub struct WriteReport {
    pub plugin: String,
    pub version: u64,
    /// Per-tier outcome, in tier order.
    pub outcomes: Vec<(String, Result<(), StoreError>)>,
    /// The write was dropped because a newer edit was already persisted.
    pub skipped: bool,
}

impl WriteReport {
    pub(crate) fn skipped(plugin: &str, version: u64) -> Self {
        Self {
            plugin: plugin.to_owned(),
            version,
            outcomes: Vec::new(),
            skipped: true,
        }
    }

    /// Every tier accepted the record (trivially true when skipped).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StoreError> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    /// First tier failure, if any.
    pub fn into_result(self) -> Result<(), StoreError> {
        self.outcomes
            .into_iter()
            .find_map(|(_, r)| r.err())
            .map_or(Ok(()), Err)
    }

    /// One line per failed tier, joined for status display.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        self.failures()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Tiers in read priority order.
#[derive(Clone, Default)]
pub struct TieredBackends {
    tiers: Vec<Arc<dyn ConfigBackend>>,
}

impl TieredBackends {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority tier.
    #[must_use]
    pub fn with_tier(mut self, tier: Arc<dyn ConfigBackend>) -> Self {
        self.tiers.push(tier);
        self
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Read from the first tier that has a record.
    ///
    /// Failing tiers are logged and skipped. An error is returned only when
    /// every tier failed.
    pub async fn get(&self, plugin: &str) -> Result<Option<PersistedConfigRecord>, StoreError> {
        let mut last_error = None;
        let mut answered = false;
        for tier in &self.tiers {
            match tier.get(plugin).await {
                Ok(Some(record)) => {
                    tracing::debug!(
                        backend = tier.name(),
                        plugin,
                        version = record.version,
                        "loaded config record"
                    );
                    return Ok(Some(record));
                }
                Ok(None) => answered = true,
                Err(e) => {
                    tracing::warn!(backend = tier.name(), plugin, error = %e, "config read failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }

    /// Write `record` to every tier concurrently.
    pub async fn put_all(&self, record: &PersistedConfigRecord) -> WriteReport {
        let writes = self.tiers.iter().map(|tier| async move {
            let result = tier.put(record).await;
            if let Err(e) = &result {
                tracing::warn!(
                    backend = tier.name(),
                    plugin = %record.plugin_name,
                    error = %e,
                    "config write failed"
                );
            }
            (tier.name().to_owned(), result)
        });
        WriteReport {
            plugin: record.plugin_name.clone(),
            version: record.version,
            outcomes: join_all(writes).await,
            skipped: false,
        }
    }
}

impl std::fmt::Debug for TieredBackends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorKind;
    use crate::mock::MockBackend;
    use crate::record::tests::sample;
    use pretty_assertions::assert_eq;

    fn tiers(first: &Arc<MockBackend>, second: &Arc<MockBackend>) -> TieredBackends {
        TieredBackends::new()
            .with_tier(Arc::clone(first) as Arc<dyn ConfigBackend>)
            .with_tier(Arc::clone(second) as Arc<dyn ConfigBackend>)
    }

    #[tokio::test]
    async fn test_read_prefers_first_tier() {
        let mut older = sample();
        older.version = 1;
        let first = Arc::new(MockBackend::new("durable").with_record(sample()));
        let second = Arc::new(MockBackend::new("cache").with_record(older));

        let record = tiers(&first, &second).get("footnote").await.unwrap();

        assert_eq!(record.map(|r| r.version), Some(3));
        assert_eq!(second.read_count(), 0);
    }

    #[tokio::test]
    async fn test_read_falls_through_on_absence_and_error() {
        let first = Arc::new(MockBackend::new("durable"));
        let second = Arc::new(MockBackend::new("cache").with_record(sample()));
        let tiered = tiers(&first, &second);

        assert_eq!(tiered.get("footnote").await.unwrap(), Some(sample()));

        first.set_fail_reads(true);
        assert_eq!(tiered.get("footnote").await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn test_read_errors_only_when_every_tier_fails() {
        let first = Arc::new(MockBackend::new("durable"));
        let second = Arc::new(MockBackend::new("cache"));
        let tiered = tiers(&first, &second);

        first.set_fail_reads(true);
        assert_eq!(tiered.get("footnote").await.unwrap(), None);

        second.set_fail_reads(true);
        let err = tiered.get("footnote").await.unwrap_err();
        assert_eq!(err.backend.as_deref(), Some("cache"));
    }

    #[tokio::test]
    async fn test_write_failure_is_isolated() {
        let first = Arc::new(MockBackend::new("durable"));
        let second = Arc::new(MockBackend::new("cache"));
        first.set_fail_writes(true);

        let report = tiers(&first, &second).put_all(&sample()).await;

        assert!(!report.is_ok());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(second.record("footnote"), Some(sample()));
        assert_eq!(
            report.failure_summary(),
            "[durable] Write failed: injected write failure (plugin: footnote)"
        );
        assert_eq!(report.into_result().unwrap_err().kind, StoreErrorKind::WriteFailed);
    }
}
