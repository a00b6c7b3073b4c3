//! Transform plugin contract and its configuration schema.
//!
//! A plugin is a named, phase-scoped tree rewrite. Its settings are described
//! by a [`MetaConfig`] (display-ordered field schema); the live values are a
//! [`PluginConfig`]. [`normalize_config`] makes any incoming config conform to
//! the schema, so a plugin's `transform` only ever sees well-typed values.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

use crate::error::TransformError;
use crate::node::SyntaxNode;

/// Pipeline stage a plugin runs in.
///
/// Structural plugins reshape the tree; render plugins decorate it for output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    Structural,
    Render,
}

impl Phase {
    /// Both phases in execution order.
    pub const ALL: [Phase; 2] = [Phase::Structural, Phase::Render];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single setting value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ConfigValue {
    Bool(bool),
    Text(String),
}

impl ConfigValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bool(_) => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Live settings of one plugin, keyed by field name.
pub type PluginConfig = BTreeMap<String, ConfigValue>;

/// Field schema of one plugin, in display order.
pub type MetaConfig = IndexMap<String, ConfigField>;

/// One choice of a [`FieldKind::Select`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Kind of a settings field, together with its default.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum FieldKind {
    Switch {
        default: bool,
    },
    Select {
        options: Vec<SelectOption>,
        default: String,
    },
    Input {
        default: String,
    },
}

impl FieldKind {
    #[must_use]
    pub fn default_value(&self) -> ConfigValue {
        match self {
            Self::Switch { default } => ConfigValue::Bool(*default),
            Self::Select { default, .. } | Self::Input { default } => {
                ConfigValue::Text(default.clone())
            }
        }
    }

    /// Coerce `value` to this kind, or `None` when it cannot be represented.
    #[must_use]
    pub fn coerce(&self, value: &ConfigValue) -> Option<ConfigValue> {
        match (self, value) {
            (Self::Switch { .. }, ConfigValue::Bool(b)) => Some(ConfigValue::Bool(*b)),
            (Self::Switch { .. }, ConfigValue::Text(s)) => match s.trim() {
                "true" | "on" | "yes" | "1" => Some(ConfigValue::Bool(true)),
                "false" | "off" | "no" | "0" => Some(ConfigValue::Bool(false)),
                _ => None,
            },
            (Self::Select { options, .. }, value) => {
                let text = value.to_string();
                options
                    .iter()
                    .any(|option| option.value == text)
                    .then_some(ConfigValue::Text(text))
            }
            (Self::Input { .. }, value) => Some(ConfigValue::Text(value.to_string())),
        }
    }
}

/// Schema entry for one setting.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigField {
    pub title: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: FieldKind,
}

impl ConfigField {
    #[must_use]
    pub fn switch(title: &str, default: bool) -> Self {
        Self {
            title: title.to_owned(),
            description: None,
            kind: FieldKind::Switch { default },
        }
    }

    /// Select field; `options` are `(value, label)` pairs.
    #[must_use]
    pub fn select(title: &str, options: &[(&str, &str)], default: &str) -> Self {
        Self {
            title: title.to_owned(),
            description: None,
            kind: FieldKind::Select {
                options: options
                    .iter()
                    .map(|(value, label)| SelectOption::new(value, label))
                    .collect(),
                default: default.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn input(title: &str, default: &str) -> Self {
        Self {
            title: title.to_owned(),
            description: None,
            kind: FieldKind::Input {
                default: default.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
}

/// Config holding every field's default.
#[must_use]
pub fn default_config(meta: &MetaConfig) -> PluginConfig {
    meta.iter()
        .map(|(key, field)| (key.clone(), field.kind.default_value()))
        .collect()
}

/// Make `config` conform to `meta`.
///
/// Unknown keys are dropped, missing keys take the field default and values
/// that cannot be coerced to the field kind fall back to the default.
#[must_use]
pub fn normalize_config(meta: &MetaConfig, config: &PluginConfig) -> PluginConfig {
    meta.iter()
        .map(|(key, field)| {
            let value = config
                .get(key)
                .and_then(|value| {
                    let coerced = field.kind.coerce(value);
                    if coerced.is_none() {
                        tracing::debug!(key, %value, "config value does not fit field, using default");
                    }
                    coerced
                })
                .unwrap_or_else(|| field.kind.default_value());
            (key.clone(), value)
        })
        .collect()
}

/// Read a switch value, falling back to `default`.
#[must_use]
pub fn config_bool(config: &PluginConfig, key: &str, default: bool) -> bool {
    config
        .get(key)
        .and_then(ConfigValue::as_bool)
        .unwrap_or(default)
}

/// Read a text value, falling back to `default`.
#[must_use]
pub fn config_str<'a>(config: &'a PluginConfig, key: &str, default: &'a str) -> &'a str {
    config
        .get(key)
        .and_then(ConfigValue::as_str)
        .unwrap_or(default)
}

/// Document-level, read-only data available to every transform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformContext {
    /// Path of the source document, used to resolve relative references.
    pub source_path: Option<String>,
    /// Base URL for local assets; overrides the `local-file` plugin setting.
    pub asset_base_url: Option<String>,
}

impl TransformContext {
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_asset_base_url(mut self, url: impl Into<String>) -> Self {
        self.asset_base_url = Some(url.into());
        self
    }
}

/// A named tree transform with a configuration schema.
///
/// `transform` must be pure with respect to its inputs: the same tree, config
/// and context always produce the same output, and the input tree is never
/// modified. With an unchanged config and no matching constructs, the output
/// equals the input.
pub trait TransformPlugin: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    fn phase(&self) -> Phase;

    fn description(&self) -> &str;

    fn meta_config(&self) -> MetaConfig;

    /// Position within the phase; lower runs first, ties keep registration order.
    fn priority(&self) -> i32 {
        0
    }

    fn default_enabled(&self) -> bool {
        true
    }

    /// Rewrite `node` into a new tree.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] when the tree cannot be processed; the
    /// manager then keeps the previous tree.
    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError>;

    /// Extra semantic checks on an already normalized config.
    fn validate(&self, config: &PluginConfig) -> Result<(), String> {
        let _ = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn meta() -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert("back_links".to_owned(), ConfigField::switch("Back links", true));
        meta.insert(
            "style".to_owned(),
            ConfigField::select(
                "Style",
                &[("numeric", "1, 2, 3"), ("roman", "i, ii, iii")],
                "numeric",
            ),
        );
        meta.insert("color".to_owned(), ConfigField::input("Color", "#ff0"));
        meta
    }

    #[test]
    fn test_default_config() {
        let config = default_config(&meta());
        assert_eq!(config.get("back_links"), Some(&ConfigValue::Bool(true)));
        assert_eq!(config.get("style"), Some(&ConfigValue::from("numeric")));
        assert_eq!(config.get("color"), Some(&ConfigValue::from("#ff0")));
    }

    #[test]
    fn test_normalize_drops_unknown_and_fills_missing() {
        let mut config = PluginConfig::new();
        config.insert("style".to_owned(), "roman".into());
        config.insert("bogus".to_owned(), true.into());

        let normalized = normalize_config(&meta(), &config);
        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized.get("style"), Some(&ConfigValue::from("roman")));
        assert_eq!(normalized.get("back_links"), Some(&ConfigValue::Bool(true)));
        assert!(!normalized.contains_key("bogus"));
    }

    #[test]
    fn test_normalize_coerces_and_defaults_mistyped_values() {
        let mut config = PluginConfig::new();
        config.insert("back_links".to_owned(), "false".into());
        config.insert("style".to_owned(), "hebrew".into());
        config.insert("color".to_owned(), true.into());

        let normalized = normalize_config(&meta(), &config);
        assert_eq!(normalized.get("back_links"), Some(&ConfigValue::Bool(false)));
        assert_eq!(normalized.get("style"), Some(&ConfigValue::from("numeric")));
        assert_eq!(normalized.get("color"), Some(&ConfigValue::from("true")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut config = PluginConfig::new();
        config.insert("style".to_owned(), "roman".into());
        let once = normalize_config(&meta(), &config);
        assert_eq!(normalize_config(&meta(), &once), once);
    }

    #[test]
    fn test_config_accessors() {
        let config = default_config(&meta());
        assert!(config_bool(&config, "back_links", false));
        assert_eq!(config_str(&config, "style", "x"), "numeric");
        assert_eq!(config_str(&config, "missing", "x"), "x");
        assert!(!config_bool(&config, "style", false));
    }
}
