//! Plugin registry and phase runner.
//!
//! [`PluginManager`] is built once at startup (registration needs `&mut self`)
//! and then shared, typically as `Arc<PluginManager>`. Runtime toggles and
//! config replacement go through per-plugin locks, so settings can change
//! while renders are in flight; every [`run`](PluginManager::run) works on a
//! snapshot taken when it starts.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;

use crate::error::PluginError;
use crate::node::SyntaxNode;
use crate::plugin::{
    ConfigValue, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin,
    default_config, normalize_config,
};

/// Point-in-time view of a registered plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PluginDescriptor {
    pub name: String,
    pub phase: Phase,
    pub description: String,
    pub enabled: bool,
    pub priority: i32,
    pub config: PluginConfig,
    pub meta_config: MetaConfig,
}

/// A plugin that failed during [`PluginManager::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginFailure {
    pub plugin: String,
    pub phase: Phase,
    pub message: String,
}

/// Outcome of running one phase.
#[derive(Debug)]
pub struct RunReport {
    pub tree: SyntaxNode,
    /// Plugins whose output was kept, in execution order.
    pub applied: Vec<String>,
    pub failed: Vec<PluginFailure>,
}

struct PluginState {
    enabled: bool,
    config: PluginConfig,
    /// Bumped by every toggle and config replacement.
    revision: u64,
}

struct Entry {
    plugin: Box<dyn TransformPlugin>,
    meta: MetaConfig,
    state: RwLock<PluginState>,
}

impl Entry {
    fn snapshot(&self) -> (bool, PluginConfig) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (state.enabled, state.config.clone())
    }
}

/// Registry of transform plugins.
#[derive(Default)]
pub struct PluginManager {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl PluginManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin with its default config and default enabled state.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::DuplicateName`] if the name is taken.
    pub fn register(&mut self, plugin: Box<dyn TransformPlugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_owned();
        if self.by_name.contains_key(&name) {
            return Err(PluginError::DuplicateName {
                name,
                phase: plugin.phase(),
            });
        }
        let meta = plugin.meta_config();
        let state = PluginState {
            enabled: plugin.default_enabled(),
            config: default_config(&meta),
            revision: 0,
        };
        tracing::debug!(plugin = %name, phase = %plugin.phase(), "registered plugin");
        self.by_name.insert(name, self.entries.len());
        self.entries.push(Entry {
            plugin,
            meta,
            state: RwLock::new(state),
        });
        Ok(())
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.plugin.name()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Toggle a plugin. Unknown names are logged and ignored.
    ///
    /// Returns whether the plugin exists.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let Some(entry) = self.entry(name) else {
            tracing::warn!(plugin = name, "set_enabled on unknown plugin");
            return false;
        };
        let mut state = entry.state.write().unwrap_or_else(PoisonError::into_inner);
        state.enabled = enabled;
        state.revision += 1;
        drop(state);
        tracing::debug!(plugin = name, enabled, "plugin toggled");
        true
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.entry(name).map(|e| e.snapshot().0)
    }

    /// Current config of a plugin.
    #[must_use]
    pub fn config(&self, name: &str) -> Option<PluginConfig> {
        self.entry(name).map(|e| e.snapshot().1)
    }

    /// Normalize `config` against the plugin schema, validate it and replace
    /// the current config wholesale. Returns the config that was applied.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] or [`PluginError::InvalidConfig`];
    /// the current config is left untouched in both cases.
    pub fn set_config(&self, name: &str, config: &PluginConfig) -> Result<PluginConfig, PluginError> {
        let (entry, normalized) = self.checked(name, config)?;
        let mut state = entry.state.write().unwrap_or_else(PoisonError::into_inner);
        state.config.clone_from(&normalized);
        state.revision += 1;
        drop(state);
        tracing::debug!(plugin = name, "plugin config replaced");
        Ok(normalized)
    }

    /// Edit revision of a plugin. Every [`set_enabled`](Self::set_enabled)
    /// and [`set_config`](Self::set_config) moves it forward.
    #[must_use]
    pub fn revision(&self, name: &str) -> Option<u64> {
        self.entry(name).map(|e| {
            e.state
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .revision
        })
    }

    /// Replace config and enabled state only if the plugin is still at
    /// `revision`. Returns `Ok(None)` when another edit got there first.
    ///
    /// # Errors
    ///
    /// Same as [`set_config`](Self::set_config).
    pub fn replace_if_unchanged(
        &self,
        name: &str,
        revision: u64,
        config: &PluginConfig,
        enabled: bool,
    ) -> Result<Option<PluginConfig>, PluginError> {
        let (entry, normalized) = self.checked(name, config)?;
        let mut state = entry.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.revision != revision {
            return Ok(None);
        }
        state.config.clone_from(&normalized);
        state.enabled = enabled;
        state.revision += 1;
        Ok(Some(normalized))
    }

    /// Normalize and validate `config` for `name`.
    fn checked(&self, name: &str, config: &PluginConfig) -> Result<(&Entry, PluginConfig), PluginError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_owned()))?;
        let normalized = normalize_config(&entry.meta, config);
        entry
            .plugin
            .validate(&normalized)
            .map_err(|message| PluginError::InvalidConfig {
                name: name.to_owned(),
                message,
            })?;
        Ok((entry, normalized))
    }

    /// Change a single key, keeping the rest of the current config.
    ///
    /// # Errors
    ///
    /// Same as [`set_config`](Self::set_config).
    pub fn config_value_change(
        &self,
        name: &str,
        key: &str,
        value: ConfigValue,
    ) -> Result<PluginConfig, PluginError> {
        let mut config = self
            .config(name)
            .ok_or_else(|| PluginError::UnknownPlugin(name.to_owned()))?;
        config.insert(key.to_owned(), value);
        self.set_config(name, &config)
    }

    /// Schema of a plugin.
    #[must_use]
    pub fn meta_config(&self, name: &str) -> Option<&MetaConfig> {
        self.entry(name).map(|e| &e.meta)
    }

    /// Schema of every plugin, in registration order.
    #[must_use]
    pub fn meta_configs(&self) -> IndexMap<String, MetaConfig> {
        self.entries
            .iter()
            .map(|e| (e.plugin.name().to_owned(), e.meta.clone()))
            .collect()
    }

    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<PluginDescriptor> {
        self.entry(name).map(describe)
    }

    /// Descriptors in execution order, optionally restricted to one phase.
    #[must_use]
    pub fn descriptors(&self, phase: Option<Phase>) -> Vec<PluginDescriptor> {
        let mut out: Vec<(usize, PluginDescriptor)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| phase.is_none_or(|p| e.plugin.phase() == p))
            .map(|(i, e)| (i, describe(e)))
            .collect();
        out.sort_by_key(|(i, d)| (d.phase, d.priority, *i));
        out.into_iter().map(|(_, d)| d).collect()
    }

    /// Fold every enabled plugin of `phase` over `tree`.
    ///
    /// Plugins run in `(priority, registration order)`. A plugin that returns
    /// an error or panics is recorded in [`RunReport::failed`] and the next
    /// plugin receives the last good tree.
    #[must_use]
    pub fn run(&self, phase: Phase, tree: SyntaxNode, ctx: &TransformContext) -> RunReport {
        let mut plan: Vec<(i32, usize, &Entry, PluginConfig)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.plugin.phase() == phase)
            .filter_map(|(i, e)| {
                let (enabled, config) = e.snapshot();
                enabled.then(|| (e.plugin.priority(), i, e, config))
            })
            .collect();
        plan.sort_by_key(|(priority, index, _, _)| (*priority, *index));

        let mut report = RunReport {
            tree,
            applied: Vec::new(),
            failed: Vec::new(),
        };
        for (_, _, entry, config) in plan {
            let name = entry.plugin.name();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.plugin.transform(&report.tree, &config, ctx)
            }));
            let message = match result {
                Ok(Ok(tree)) => {
                    report.tree = tree;
                    report.applied.push(name.to_owned());
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            tracing::warn!(plugin = name, %phase, error = %message, "plugin failed, keeping previous tree");
            report.failed.push(PluginFailure {
                plugin: name.to_owned(),
                phase,
                message,
            });
        }
        report
    }
}

fn describe(entry: &Entry) -> PluginDescriptor {
    let (enabled, config) = entry.snapshot();
    PluginDescriptor {
        name: entry.plugin.name().to_owned(),
        phase: entry.plugin.phase(),
        description: entry.plugin.description().to_owned(),
        enabled,
        priority: entry.plugin.priority(),
        config,
        meta_config: entry.meta.clone(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_owned()
    }
}
