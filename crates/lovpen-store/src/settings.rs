//! Operations a settings UI calls.

use lovpen_renderer::{ConfigValue, MetaConfig, Phase, PluginConfig, PluginDescriptor};

use crate::error::StoreError;
use crate::record::PersistedConfigRecord;
use crate::store::{ConfigStore, PendingSave, SaveStatus};

/// Settings facade over a [`ConfigStore`].
///
/// Toggles and single-value edits take effect immediately and persist in the
/// background; [`save_plugin_config`](Self::save_plugin_config) waits for
/// every tier.
#[derive(Clone, Debug)]
pub struct SettingsSurface {
    store: ConfigStore,
}

impl SettingsSurface {
    #[must_use]
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Plugins in execution order with their current state and schema.
    #[must_use]
    pub fn list_plugins(&self, phase: Option<Phase>) -> Vec<PluginDescriptor> {
        self.store.manager().descriptors(phase)
    }

    pub fn on_toggle(&self, plugin: &str, enabled: bool) -> Result<PendingSave, StoreError> {
        self.store.save_enabled(plugin, enabled)
    }

    /// Change one config key, keeping the others.
    pub fn on_config_change(
        &self,
        plugin: &str,
        key: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<PendingSave, StoreError> {
        let manager = self.store.manager();
        let mut config = manager
            .config(plugin)
            .ok_or_else(|| StoreError::unknown_plugin(plugin))?;
        config.insert(key.to_owned(), value.into());
        let meta = manager.meta_config(plugin).cloned().unwrap_or_default();
        self.store.save(plugin, &config, &meta)
    }

    pub async fn get_plugin_config(
        &self,
        plugin: &str,
    ) -> Result<Option<PersistedConfigRecord>, StoreError> {
        self.store.get_plugin_config(plugin).await
    }

    /// Apply and persist, returning the first tier failure.
    ///
    /// The config stays applied in memory even when a tier fails.
    pub async fn save_plugin_config(
        &self,
        plugin: &str,
        config: &PluginConfig,
        meta: &MetaConfig,
    ) -> Result<(), StoreError> {
        self.store.save(plugin, config, meta)?.wait().await?.into_result()
    }

    #[must_use]
    pub fn save_status(&self, plugin: &str) -> SaveStatus {
        self.store.save_status(plugin)
    }
}
