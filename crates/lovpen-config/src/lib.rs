//! Configuration management for Lovpen.
//!
//! Parses `lovpen.toml` with serde and discovers it in the current directory
//! or its parents. CLI settings are applied on top via [`CliSettings`].
//!
//! ```toml
//! [render]
//! theme = "ink"
//! highlight = "github"
//! template = "none"
//! asset_base_url = "${LOVPEN_CDN:-/assets}"
//!
//! [store]
//! dir = ".lovpen/config"
//!
//! [cache]
//! enabled = true
//!
//! [resources]
//! templates_dir = "templates"
//!
//! [plugins.footnote]
//! enabled = true
//! config = { style = "roman" }
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `${VAR}` and `${VAR:-default}` are expanded in `render.asset_base_url`,
//! `store.dir`, `cache.dir`, `resources.templates_dir` and
//! `resources.themes_dir`.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub theme: Option<String>,
    pub highlight: Option<String>,
    pub template: Option<String>,
    pub asset_base_url: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub cache_enabled: Option<bool>,
    pub templates_dir: Option<PathBuf>,
}

const CONFIG_FILENAME: &str = "lovpen.toml";

/// Directory holding Lovpen data, relative to the config file.
const PROJECT_DIR: &str = ".lovpen";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    store: StoreConfigRaw,
    cache: CacheConfigRaw,
    resources: ResourcesConfigRaw,
    /// Per-plugin overrides keyed by plugin name.
    pub plugins: BTreeMap<String, PluginSection>,

    /// Resolved filesystem locations (set after loading).
    #[serde(skip)]
    pub paths: PathsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Render defaults.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub theme: String,
    pub highlight: String,
    /// Template identifier; `"none"` disables templating.
    pub template: String,
    pub gfm: bool,
    pub footnotes: bool,
    pub math: bool,
    /// Prefix for relative image and link targets.
    pub asset_base_url: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_owned(),
            highlight: "github".to_owned(),
            template: "none".to_owned(),
            gfm: true,
            footnotes: true,
            math: true,
            asset_base_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreConfigRaw {
    dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ResourcesConfigRaw {
    templates_dir: Option<String>,
    themes_dir: Option<String>,
}

/// Resolved locations with absolute paths.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PathsConfig {
    /// Durable plugin config records.
    pub store_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_enabled: bool,
    /// Dynamic template directory, if configured.
    pub templates_dir: Option<PathBuf>,
    /// Dynamic theme directory, if configured.
    pub themes_dir: Option<PathBuf>,
}

/// `[plugins.<name>]` section.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PluginSection {
    pub enabled: Option<bool>,
    /// Raw config values, normalized against the plugin schema when applied.
    pub config: BTreeMap<String, toml::Value>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g. `store.dir`).
        field: String,
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration with optional CLI settings.
    ///
    /// With `config_path`, that file must exist. Otherwise `lovpen.toml` is
    /// searched in the current directory and its parents, and defaults are
    /// used when none is found. CLI settings take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` doesn't exist, or if reading,
    /// parsing, expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(theme) = &settings.theme {
            self.render.theme.clone_from(theme);
        }
        if let Some(highlight) = &settings.highlight {
            self.render.highlight.clone_from(highlight);
        }
        if let Some(template) = &settings.template {
            self.render.template.clone_from(template);
        }
        if let Some(url) = &settings.asset_base_url {
            self.render.asset_base_url = Some(url.clone());
        }
        if let Some(dir) = &settings.store_dir {
            self.paths.store_dir.clone_from(dir);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.paths.cache_enabled = enabled;
        }
        if let Some(dir) = &settings.templates_dir {
            self.paths.templates_dir = Some(dir.clone());
        }
    }

    /// Template identifier, `None` when templating is disabled.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        Some(self.render.template.as_str()).filter(|t| *t != "none")
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        let project_dir = base.join(PROJECT_DIR);
        Self {
            render: RenderConfig::default(),
            store: StoreConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            resources: ResourcesConfigRaw::default(),
            plugins: BTreeMap::new(),
            paths: PathsConfig {
                store_dir: project_dir.join("config"),
                cache_dir: project_dir.join("cache"),
                cache_enabled: true,
                templates_dir: None,
                themes_dir: None,
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content, path.parent().unwrap_or(Path::new(".")))
            .map(|config| Self {
                config_path: Some(path.to_path_buf()),
                ..config
            })
    }

    /// Parse, expand, resolve and validate TOML text whose relative paths
    /// are anchored at `base`.
    pub fn from_toml(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.render.theme, "render.theme")?;
        require_non_empty(&self.render.highlight, "render.highlight")?;
        require_non_empty(&self.render.template, "render.template")?;
        if let Some(url) = &self.render.asset_base_url
            && !(url.is_empty()
                || url.starts_with('/')
                || url.starts_with("http://")
                || url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "render.asset_base_url must be absolute (/, http:// or https://)".to_owned(),
            ));
        }
        for (name, section) in &self.plugins {
            require_non_empty(name, "plugins.<name>")?;
            for (key, value) in &section.config {
                if !matches!(value, toml::Value::Boolean(_) | toml::Value::String(_) | toml::Value::Integer(_)) {
                    return Err(ConfigError::Validation(format!(
                        "plugins.{name}.config.{key} must be a boolean, string or integer"
                    )));
                }
            }
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.render.asset_base_url, "render.asset_base_url")?;
        expand::expand_opt(&mut self.store.dir, "store.dir")?;
        expand::expand_opt(&mut self.cache.dir, "cache.dir")?;
        expand::expand_opt(&mut self.resources.templates_dir, "resources.templates_dir")?;
        expand::expand_opt(&mut self.resources.themes_dir, "resources.themes_dir")?;
        Ok(())
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        let project_dir = config_dir.join(PROJECT_DIR);
        let resolve = |path: Option<&str>, default: &str| match path {
            Some(p) => config_dir.join(p),
            None => project_dir.join(default),
        };
        self.paths = PathsConfig {
            store_dir: resolve(self.store.dir.as_deref(), "config"),
            cache_dir: resolve(self.cache.dir.as_deref(), "cache"),
            cache_enabled: self.cache.enabled.unwrap_or(true),
            templates_dir: self.resources.templates_dir.as_deref().map(|d| config_dir.join(d)),
            themes_dir: self.resources.themes_dir.as_deref().map(|d| config_dir.join(d)),
        };
    }
}
