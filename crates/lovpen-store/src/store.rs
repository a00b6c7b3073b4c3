//! Plugin config reconciliation across the in-memory manager and the
//! persistence tiers.
//!
//! The [`PluginManager`] is the authoritative copy. Every local edit, whether
//! made through this store or on the manager directly, moves the plugin's
//! revision; a load only applies its result if the revision did not move
//! while the read was in flight and the loaded version is newer than the
//! local one. Writes to the same plugin are serialized, writes to different
//! plugins run in parallel, and a write never lands after a newer one for the
//! same plugin was attempted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use futures::future::join_all;
use lovpen_renderer::{MetaConfig, PluginConfig, PluginManager};
use tokio::task::JoinHandle;

use crate::error::{StoreError, StoreErrorKind};
use crate::record::PersistedConfigRecord;
use crate::tiered::{TieredBackends, WriteReport};

/// Persistence state of one plugin, for display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error(String),
}

/// What [`ConfigStore::load`] did with the persisted record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The record was newer and no local edit happened during the read.
    Applied,
    /// A local edit happened during the read, or the record was not newer.
    Discarded,
    /// No tier holds a record for the plugin.
    Absent,
    /// Every tier failed, or the record could not be applied.
    Failed,
}

#[derive(Debug, Default)]
struct Slot {
    /// Bumped by every save through this store; orders the background writes.
    edit_epoch: u64,
    /// Newest epoch whose write has started, successful or not.
    attempted_epoch: u64,
    record: Option<PersistedConfigRecord>,
    status: SaveStatus,
}

struct Inner {
    manager: Arc<PluginManager>,
    tiers: TieredBackends,
    slots: Mutex<HashMap<String, Slot>>,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Handle to a background persistence write.
#[derive(Debug)]
pub struct PendingSave {
    plugin: String,
    handle: JoinHandle<WriteReport>,
}

impl PendingSave {
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Wait for the fan-out to finish.
    pub async fn wait(self) -> Result<WriteReport, StoreError> {
        self.handle.await.map_err(|e| {
            StoreError::new(StoreErrorKind::Interrupted)
                .with_plugin(&self.plugin)
                .with_source(e)
        })
    }
}

/// Tiered plugin config store.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<Inner>,
}

impl ConfigStore {
    #[must_use]
    pub fn new(manager: Arc<PluginManager>, tiers: TieredBackends) -> Self {
        Self {
            inner: Arc::new(Inner {
                manager,
                tiers,
                slots: Mutex::new(HashMap::new()),
                write_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.inner.manager
    }

    #[must_use]
    pub fn tiers(&self) -> &TieredBackends {
        &self.inner.tiers
    }

    /// Apply `config` to the manager and persist it in the background.
    ///
    /// The config is normalized and validated synchronously, so the next render
    /// sees it immediately. Saving identical content again keeps the record
    /// version and timestamp. Must be called from within a tokio runtime.
    pub fn save(
        &self,
        plugin: &str,
        config: &PluginConfig,
        meta: &MetaConfig,
    ) -> Result<PendingSave, StoreError> {
        let (record, epoch) = {
            let mut slots = self.inner.lock_slots();
            let applied = self.inner.manager.set_config(plugin, config)?;
            let enabled = self.inner.manager.is_enabled(plugin).unwrap_or(true);
            commit(&mut slots, plugin, enabled, applied, meta.clone())
        };
        Ok(self.spawn_persist(plugin, epoch, record))
    }

    /// Toggle a plugin and persist the new state in the background.
    pub fn save_enabled(&self, plugin: &str, enabled: bool) -> Result<PendingSave, StoreError> {
        let manager = &self.inner.manager;
        let (record, epoch) = {
            let mut slots = self.inner.lock_slots();
            if !manager.set_enabled(plugin, enabled) {
                return Err(StoreError::unknown_plugin(plugin));
            }
            let config = manager.config(plugin).unwrap_or_default();
            let meta = manager.meta_config(plugin).cloned().unwrap_or_default();
            commit(&mut slots, plugin, enabled, config, meta)
        };
        Ok(self.spawn_persist(plugin, epoch, record))
    }

    fn spawn_persist(&self, plugin: &str, epoch: u64, record: PersistedConfigRecord) -> PendingSave {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.persist(epoch, record).await });
        PendingSave {
            plugin: plugin.to_owned(),
            handle,
        }
    }

    /// Read the persisted record for `plugin` without applying it.
    pub async fn get_plugin_config(
        &self,
        plugin: &str,
    ) -> Result<Option<PersistedConfigRecord>, StoreError> {
        self.inner.tiers.get(plugin).await
    }

    /// Load the persisted record for `plugin` and apply it if it is newer and
    /// no local edit raced the read.
    pub async fn load(&self, plugin: &str) -> LoadOutcome {
        let manager = &self.inner.manager;
        if !manager.contains(plugin) {
            tracing::warn!(plugin, "load for unknown plugin");
            return LoadOutcome::Failed;
        }
        let Some(started_at) = manager.revision(plugin) else {
            return LoadOutcome::Failed;
        };

        let record = match self.inner.tiers.get(plugin).await {
            Ok(Some(record)) => record,
            Ok(None) => return LoadOutcome::Absent,
            Err(e) => {
                tracing::warn!(plugin, error = %e, "config load failed");
                return LoadOutcome::Failed;
            }
        };

        let mut slots = self.inner.lock_slots();
        let slot = slots.entry(plugin.to_owned()).or_default();
        let local_version = slot.record.as_ref().map_or(0, |r| r.version);
        if record.version <= local_version {
            tracing::debug!(
                plugin,
                loaded = record.version,
                local = local_version,
                "discarding load: not newer"
            );
            return LoadOutcome::Discarded;
        }

        let applied =
            match manager.replace_if_unchanged(plugin, started_at, &record.config, record.enabled) {
                Ok(Some(applied)) => applied,
                Ok(None) => {
                    tracing::debug!(plugin, "discarding load: local edit during read");
                    return LoadOutcome::Discarded;
                }
                Err(e) => {
                    tracing::warn!(plugin, error = %e, "persisted config rejected");
                    return LoadOutcome::Failed;
                }
            };
        tracing::info!(plugin, version = record.version, "applied persisted config");
        slot.record = Some(PersistedConfigRecord {
            config: applied,
            ..record
        });
        LoadOutcome::Applied
    }

    /// Load every registered plugin concurrently.
    pub async fn hydrate(&self) -> Vec<(String, LoadOutcome)> {
        let names: Vec<String> = self
            .inner
            .manager
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let outcomes = join_all(names.iter().map(|name| self.load(name))).await;
        names.into_iter().zip(outcomes).collect()
    }

    #[must_use]
    pub fn save_status(&self, plugin: &str) -> SaveStatus {
        self.inner
            .lock_slots()
            .get(plugin)
            .map(|s| s.status.clone())
            .unwrap_or_default()
    }

    /// The record last saved or applied locally.
    #[must_use]
    pub fn local_record(&self, plugin: &str) -> Option<PersistedConfigRecord> {
        self.inner
            .lock_slots()
            .get(plugin)
            .and_then(|s| s.record.clone())
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("tiers", &self.inner.tiers)
            .finish_non_exhaustive()
    }
}

/// Bump the edit epoch and build the record to persist.
fn commit(
    slots: &mut HashMap<String, Slot>,
    plugin: &str,
    enabled: bool,
    config: PluginConfig,
    meta_config: MetaConfig,
) -> (PersistedConfigRecord, u64) {
    let slot = slots.entry(plugin.to_owned()).or_default();
    slot.edit_epoch += 1;
    slot.status = SaveStatus::Saving;

    let mut record = PersistedConfigRecord {
        plugin_name: plugin.to_owned(),
        enabled,
        config,
        meta_config,
        updated_at: Utc::now(),
        version: 1,
    };
    if let Some(previous) = &slot.record {
        if previous.same_content(&record) {
            record.version = previous.version;
            record.updated_at = previous.updated_at;
        } else {
            record.version = previous.version + 1;
        }
    }
    slot.record = Some(record.clone());
    (record, slot.edit_epoch)
}

impl Inner {
    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self, plugin: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(plugin.to_owned()).or_default())
    }

    async fn persist(&self, epoch: u64, record: PersistedConfigRecord) -> WriteReport {
        let plugin = record.plugin_name.clone();
        let lock = self.write_lock(&plugin);
        let _guard = lock.lock().await;

        {
            let mut slots = self.lock_slots();
            let slot = slots.entry(plugin.clone()).or_default();
            if slot.attempted_epoch >= epoch {
                tracing::debug!(plugin = %plugin, epoch, "skipping superseded write");
                return WriteReport::skipped(&plugin, record.version);
            }
            slot.attempted_epoch = epoch;
        }

        let report = self.tiers.put_all(&record).await;

        let mut slots = self.lock_slots();
        let slot = slots.entry(plugin.clone()).or_default();
        if slot.edit_epoch == epoch {
            slot.status = if report.is_ok() {
                SaveStatus::Saved
            } else {
                SaveStatus::Error(report.failure_summary())
            };
        }
        tracing::debug!(
            plugin = %plugin,
            version = record.version,
            ok = report.is_ok(),
            "persisted config"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ConfigBackend;
    use crate::fs::FsBackend;
    use crate::mock::MockBackend;
    use lovpen_renderer::{ConfigValue, plugins::builtin_manager};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn footnote_config(style: &str) -> PluginConfig {
        let mut config = PluginConfig::new();
        config.insert("style".to_owned(), ConfigValue::from(style));
        config.insert("back_links".to_owned(), ConfigValue::Bool(true));
        config
    }

    fn store_with(tiers: TieredBackends) -> ConfigStore {
        ConfigStore::new(Arc::new(builtin_manager()), tiers)
    }

    fn meta(store: &ConfigStore, plugin: &str) -> MetaConfig {
        store.manager().meta_config(plugin).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_save_applies_immediately_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::new("cache"));
        let store = store_with(
            TieredBackends::new()
                .with_tier(Arc::new(FsBackend::new(dir.path())))
                .with_tier(Arc::clone(&mock) as Arc<dyn ConfigBackend>),
        );
        let meta = meta(&store, "footnote");

        let pending = store.save("footnote", &footnote_config("roman"), &meta).unwrap();
        assert_eq!(
            store.manager().config("footnote"),
            Some(footnote_config("roman"))
        );

        let report = pending.wait().await.unwrap();
        assert!(report.is_ok());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(store.save_status("footnote"), SaveStatus::Saved);

        let stored = store.get_plugin_config("footnote").await.unwrap().unwrap();
        assert_eq!(stored.config, footnote_config("roman"));
        assert_eq!(stored.meta_config, meta);
        assert_eq!(stored.version, 1);
        assert_eq!(mock.record("footnote"), Some(stored));
    }

    #[tokio::test]
    async fn test_round_trip_into_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let first = store_with(TieredBackends::new().with_tier(Arc::new(FsBackend::new(dir.path()))));
        let meta = meta(&first, "footnote");
        first
            .save("footnote", &footnote_config("alpha"), &meta)
            .unwrap()
            .wait()
            .await
            .unwrap();
        first.save_enabled("footnote", false).unwrap().wait().await.unwrap();

        let second = store_with(TieredBackends::new().with_tier(Arc::new(FsBackend::new(dir.path()))));
        assert_eq!(second.load("footnote").await, LoadOutcome::Applied);
        assert_eq!(
            second.manager().config("footnote"),
            Some(footnote_config("alpha"))
        );
        assert_eq!(second.manager().is_enabled("footnote"), Some(false));
    }

    #[tokio::test]
    async fn test_identical_save_keeps_version() {
        let store = store_with(TieredBackends::new().with_tier(Arc::new(MockBackend::new("mock"))));
        let meta = meta(&store, "footnote");

        store.save("footnote", &footnote_config("roman"), &meta).unwrap().wait().await.unwrap();
        let first = store.local_record("footnote").unwrap();
        store.save("footnote", &footnote_config("roman"), &meta).unwrap().wait().await.unwrap();
        let second = store.local_record("footnote").unwrap();
        assert_eq!(first, second);

        store.save("footnote", &footnote_config("alpha"), &meta).unwrap().wait().await.unwrap();
        assert_eq!(store.local_record("footnote").unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_load_discards_when_local_edit_races_read() {
        let remote = PersistedConfigRecord {
            plugin_name: "footnote".to_owned(),
            enabled: true,
            config: footnote_config("alpha"),
            meta_config: MetaConfig::new(),
            updated_at: Utc::now(),
            version: 7,
        };
        let slow = Arc::new(
            MockBackend::new("slow")
                .with_record(remote)
                .with_read_delay(Duration::from_millis(100)),
        );
        let store = store_with(TieredBackends::new().with_tier(Arc::clone(&slow) as Arc<dyn ConfigBackend>));
        let meta = meta(&store, "footnote");

        let loader = {
            let store = store.clone();
            tokio::spawn(async move { store.load("footnote").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.save("footnote", &footnote_config("roman"), &meta).unwrap();

        assert_eq!(loader.await.unwrap(), LoadOutcome::Discarded);
        assert_eq!(
            store.manager().config("footnote"),
            Some(footnote_config("roman"))
        );
    }

    #[tokio::test]
    async fn test_load_discards_when_manager_edited_during_read() {
        let remote = PersistedConfigRecord {
            plugin_name: "footnote".to_owned(),
            enabled: true,
            config: footnote_config("alpha"),
            meta_config: MetaConfig::new(),
            updated_at: Utc::now(),
            version: 7,
        };
        let slow = Arc::new(
            MockBackend::new("slow")
                .with_record(remote)
                .with_read_delay(Duration::from_millis(100)),
        );
        let store = store_with(TieredBackends::new().with_tier(Arc::clone(&slow) as Arc<dyn ConfigBackend>));

        let loader = {
            let store = store.clone();
            tokio::spawn(async move { store.load("footnote").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.manager().set_config("footnote", &footnote_config("roman")).unwrap();

        assert_eq!(loader.await.unwrap(), LoadOutcome::Discarded);
        assert_eq!(
            store.manager().config("footnote"),
            Some(footnote_config("roman"))
        );
    }

    #[tokio::test]
    async fn test_load_discards_when_toggled_during_read() {
        let remote = PersistedConfigRecord {
            plugin_name: "math".to_owned(),
            enabled: true,
            config: PluginConfig::new(),
            meta_config: MetaConfig::new(),
            updated_at: Utc::now(),
            version: 2,
        };
        let slow = Arc::new(
            MockBackend::new("slow")
                .with_record(remote)
                .with_read_delay(Duration::from_millis(100)),
        );
        let store = store_with(TieredBackends::new().with_tier(Arc::clone(&slow) as Arc<dyn ConfigBackend>));
        assert_eq!(store.manager().is_enabled("math"), Some(false));

        let loader = {
            let store = store.clone();
            tokio::spawn(async move { store.load("math").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.manager().set_enabled("math", false);

        assert_eq!(loader.await.unwrap(), LoadOutcome::Discarded);
        assert_eq!(store.manager().is_enabled("math"), Some(false));
    }

    #[tokio::test]
    async fn test_older_write_never_lands_after_newer_attempt() {
        let durable = Arc::new(MockBackend::new("durable"));
        let cache = Arc::new(MockBackend::new("cache"));
        durable.set_fail_writes(true);
        let store = store_with(
            TieredBackends::new()
                .with_tier(Arc::clone(&durable) as Arc<dyn ConfigBackend>)
                .with_tier(Arc::clone(&cache) as Arc<dyn ConfigBackend>),
        );
        let meta = meta(&store, "footnote");
        let (older, older_epoch) = {
            let mut slots = store.inner.lock_slots();
            commit(&mut slots, "footnote", true, footnote_config("roman"), meta.clone())
        };
        let (newer, newer_epoch) = {
            let mut slots = store.inner.lock_slots();
            commit(&mut slots, "footnote", true, footnote_config("alpha"), meta)
        };

        // The newer write reaches the tiers first and fails on one of them.
        let report = store.inner.persist(newer_epoch, newer).await;
        assert!(!report.is_ok());
        let report = store.inner.persist(older_epoch, older).await;
        assert!(report.skipped);

        assert_eq!(cache.record("footnote").unwrap().config, footnote_config("alpha"));
        assert!(matches!(store.save_status("footnote"), SaveStatus::Error(_)));
    }

    #[tokio::test]
    async fn test_load_discards_older_version() {
        let mock = Arc::new(MockBackend::new("mock"));
        let store = store_with(TieredBackends::new().with_tier(Arc::clone(&mock) as Arc<dyn ConfigBackend>));
        let meta = meta(&store, "footnote");
        store.save("footnote", &footnote_config("roman"), &meta).unwrap().wait().await.unwrap();
        store.save("footnote", &footnote_config("alpha"), &meta).unwrap().wait().await.unwrap();

        let mut stale = mock.record("footnote").unwrap();
        stale.version = 1;
        stale.config = footnote_config("numeric");
        mock.insert(stale);

        assert_eq!(store.load("footnote").await, LoadOutcome::Discarded);
        assert_eq!(
            store.manager().config("footnote"),
            Some(footnote_config("alpha"))
        );
    }

    #[tokio::test]
    async fn test_failing_tier_keeps_authoritative_copy() {
        let durable = Arc::new(MockBackend::new("durable"));
        let cache = Arc::new(MockBackend::new("cache"));
        durable.set_fail_writes(true);
        let store = store_with(
            TieredBackends::new()
                .with_tier(Arc::clone(&durable) as Arc<dyn ConfigBackend>)
                .with_tier(Arc::clone(&cache) as Arc<dyn ConfigBackend>),
        );
        let meta = meta(&store, "footnote");

        let report = store
            .save("footnote", &footnote_config("roman"), &meta)
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert!(!report.is_ok());
        assert!(matches!(store.save_status("footnote"), SaveStatus::Error(_)));
        assert_eq!(
            store.manager().config("footnote"),
            Some(footnote_config("roman"))
        );
        assert!(cache.record("footnote").is_some());
    }

    #[tokio::test]
    async fn test_last_save_wins() {
        let mock = Arc::new(MockBackend::new("mock").with_write_delay(Duration::from_millis(10)));
        let store = store_with(TieredBackends::new().with_tier(Arc::clone(&mock) as Arc<dyn ConfigBackend>));
        let meta = meta(&store, "footnote");

        let first = store.save("footnote", &footnote_config("roman"), &meta).unwrap();
        let second = store.save("footnote", &footnote_config("alpha"), &meta).unwrap();
        second.wait().await.unwrap();
        first.wait().await.unwrap();

        assert_eq!(mock.record("footnote").unwrap().config, footnote_config("alpha"));
        assert_eq!(store.save_status("footnote"), SaveStatus::Saved);
    }

    #[tokio::test]
    async fn test_unknown_plugin() {
        let store = store_with(TieredBackends::new());
        let err = store
            .save("ghost", &PluginConfig::new(), &MetaConfig::new())
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::UnknownPlugin);
        assert_eq!(store.save_enabled("ghost", true).unwrap_err().kind, StoreErrorKind::UnknownPlugin);
        assert_eq!(store.load("ghost").await, LoadOutcome::Failed);
    }

    #[tokio::test]
    async fn test_hydrate_reports_every_plugin() {
        let store = store_with(TieredBackends::new().with_tier(Arc::new(MockBackend::new("mock"))));
        let outcomes = store.hydrate().await;
        assert_eq!(outcomes.len(), store.manager().names().len());
        assert!(outcomes.iter().all(|(_, o)| *o == LoadOutcome::Absent));
    }
}
