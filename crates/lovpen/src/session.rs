//! Application wiring shared by every command.

use std::collections::BTreeMap;
use std::sync::Arc;

use lovpen_cache::{Cache, FileCache, NullCache};
use lovpen_config::{Config, PluginSection};
use lovpen_renderer::{
    ConfigValue, ParseOptions, Pipeline, PluginConfig, PluginManager, RenderRequest, Styling,
    TransformContext, plugins::register_builtins,
};
use lovpen_resources::{DirectorySource, ResourceCatalog, ResourceKind};
use lovpen_store::{
    CacheBackend, ConfigStore, FsBackend, LoadOutcome, SettingsSurface, TieredBackends,
};

use crate::VERSION;
use crate::error::CliError;
use crate::output::Output;

/// Loaded config, hydrated plugin state and resource catalog.
pub(crate) struct Session {
    pub(crate) config: Config,
    pub(crate) pipeline: Pipeline,
    pub(crate) settings: SettingsSurface,
    pub(crate) catalog: ResourceCatalog,
}

impl Session {
    /// Register the built-in plugins, apply `[plugins.*]` from the config file
    /// and then any persisted settings on top.
    pub(crate) async fn open(config: Config, output: &Output) -> Result<Self, CliError> {
        let mut manager = PluginManager::new();
        register_builtins(&mut manager)?;
        apply_plugin_sections(&manager, &config.plugins)?;
        let manager = Arc::new(manager);

        let store = ConfigStore::new(Arc::clone(&manager), tiers(&config));
        for (plugin, outcome) in store.hydrate().await {
            match outcome {
                LoadOutcome::Applied => tracing::info!(plugin = %plugin, "restored saved settings"),
                LoadOutcome::Failed => {
                    output.warning(&format!("Could not restore saved settings for '{plugin}'"));
                }
                LoadOutcome::Absent | LoadOutcome::Discarded => {}
            }
        }

        Ok(Self {
            catalog: catalog(&config),
            pipeline: Pipeline::new(manager),
            settings: SettingsSurface::new(store),
            config,
        })
    }

    /// Build a render request from the config and the resource catalog.
    pub(crate) async fn request(&self, source_path: Option<&str>) -> RenderRequest {
        let render = &self.config.render;
        let theme = self
            .catalog
            .select(ResourceKind::Theme, Some(&render.theme))
            .await;
        let highlight = self
            .catalog
            .select(ResourceKind::Highlight, Some(&render.highlight))
            .await;

        let template = match self.config.template() {
            Some(requested) => {
                let option = self.catalog.select(ResourceKind::Template, Some(requested)).await;
                (!option.is_no_template()).then_some(option.identifier)
            }
            None => None,
        };
        let template_body = match &template {
            Some(id) => self.catalog.template_body(id).await,
            None => None,
        };

        let mut context = TransformContext::default();
        if let Some(path) = source_path {
            context = context.with_source_path(path);
        }
        if let Some(url) = &render.asset_base_url {
            context = context.with_asset_base_url(url.as_str());
        }

        RenderRequest {
            options: ParseOptions {
                gfm: render.gfm,
                footnotes: render.footnotes,
                math: render.math,
                ..ParseOptions::default()
            },
            context,
            styling: Styling {
                theme: theme.identifier,
                highlight: highlight.identifier,
                template,
                template_body,
            },
        }
    }
}

/// Durable tier first, then the local cache.
fn tiers(config: &Config) -> TieredBackends {
    let paths = &config.paths;
    let cache: Box<dyn Cache> = if paths.cache_enabled {
        Box::new(FileCache::new(paths.cache_dir.clone(), VERSION))
    } else {
        Box::new(NullCache)
    };
    TieredBackends::new()
        .with_tier(Arc::new(FsBackend::new(paths.store_dir.clone())))
        .with_tier(Arc::new(CacheBackend::from_cache(cache.as_ref())))
}

fn catalog(config: &Config) -> ResourceCatalog {
    let mut catalog = ResourceCatalog::new();
    if let Some(dir) = &config.paths.themes_dir {
        catalog = catalog.with_dynamic_source(Arc::new(DirectorySource::themes(dir.clone())));
    }
    if let Some(dir) = &config.paths.templates_dir {
        catalog = catalog.with_dynamic_source(Arc::new(DirectorySource::templates(dir.clone())));
    }
    catalog
}

fn apply_plugin_sections(
    manager: &PluginManager,
    sections: &BTreeMap<String, PluginSection>,
) -> Result<(), CliError> {
    for (name, section) in sections {
        if !manager.contains(name) {
            return Err(CliError::Validation(format!(
                "[plugins.{name}] does not match any plugin"
            )));
        }
        if let Some(enabled) = section.enabled {
            manager.set_enabled(name, enabled);
        }
        if !section.config.is_empty() {
            let mut config = manager.config(name).unwrap_or_default();
            config.extend(
                section
                    .config
                    .iter()
                    .map(|(key, value)| (key.clone(), config_value(value))),
            );
            manager.set_config(name, &config)?;
        }
    }
    Ok(())
}

fn config_value(value: &toml::Value) -> ConfigValue {
    match value {
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::String(s) => ConfigValue::Text(s.clone()),
        other => ConfigValue::Text(other.to_string()),
    }
}

/// Parse a `key=value` pair typed on the command line.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, ConfigValue), CliError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::Validation(format!("expected key=value, got '{raw}'")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Validation(format!("missing key in '{raw}'")));
    }
    let value = match value.trim() {
        "true" => ConfigValue::Bool(true),
        "false" => ConfigValue::Bool(false),
        text => ConfigValue::from(text),
    };
    Ok((key.to_owned(), value))
}

/// Collapse a parsed config into a JSON object for display.
pub(crate) fn config_json(config: &PluginConfig) -> serde_json::Value {
    config
        .iter()
        .map(|(key, value)| {
            let value = match value {
                ConfigValue::Bool(b) => serde_json::Value::Bool(*b),
                ConfigValue::Text(s) => serde_json::Value::String(s.clone()),
            };
            (key.clone(), value)
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovpen_renderer::plugins::builtin_manager;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("style=roman").unwrap(),
            ("style".to_owned(), ConfigValue::from("roman"))
        );
        assert_eq!(
            parse_assignment(" back_links = false ").unwrap(),
            ("back_links".to_owned(), ConfigValue::Bool(false))
        );
        assert!(parse_assignment("style").is_err());
        assert!(parse_assignment("=roman").is_err());
    }

    #[test]
    fn test_plugin_sections_apply() {
        let toml = r#"
[plugins.math]
enabled = true
config = { engine = "mathjax" }

[plugins.icon]
config = { size = 24 }
"#;
        let config = Config::from_toml(toml, Path::new("/vault")).unwrap();
        let manager = builtin_manager();
        apply_plugin_sections(&manager, &config.plugins).unwrap();

        assert_eq!(manager.is_enabled("math"), Some(true));
        assert_eq!(manager.config("math").unwrap()["engine"], ConfigValue::from("mathjax"));
        assert_eq!(manager.config("icon").unwrap()["size"], ConfigValue::from("24"));
    }

    #[test]
    fn test_unknown_plugin_section_is_fatal() {
        let config = Config::from_toml("[plugins.ghost]\nenabled = true", Path::new("/vault")).unwrap();
        let err = apply_plugin_sections(&builtin_manager(), &config.plugins).unwrap_err();
        assert_eq!(err.to_string(), "[plugins.ghost] does not match any plugin");
    }

    #[test]
    fn test_config_json() {
        let mut config = PluginConfig::new();
        config.insert("line_numbers".to_owned(), ConfigValue::Bool(true));
        config.insert("theme".to_owned(), ConfigValue::from("github"));
        assert_eq!(
            config_json(&config),
            serde_json::json!({"line_numbers": true, "theme": "github"})
        );
    }

    #[tokio::test]
    async fn test_session_request_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("templates")).unwrap();
        std::fs::write(
            dir.path().join("templates/weekly.html"),
            "<main>{{content}}</main>",
        )
        .unwrap();
        let toml = r#"
[render]
theme = "dark"
highlight = "nonexistent"
template = "weekly"
asset_base_url = "/assets"

[resources]
templates_dir = "templates"
"#;
        let config = Config::from_toml(toml, dir.path()).unwrap();
        let session = Session::open(config, &Output::new()).await.unwrap();

        let request = session.request(Some("notes/today.md")).await;
        assert_eq!(request.styling.theme, "dark");
        assert_eq!(request.styling.highlight, "default");
        assert_eq!(request.styling.template.as_deref(), Some("weekly"));
        assert_eq!(
            request.styling.template_body.as_deref(),
            Some("<main>{{content}}</main>")
        );
        assert_eq!(request.context.asset_base_url.as_deref(), Some("/assets"));

        let out = session.pipeline.render("# Today", &request);
        assert!(out.html.starts_with("<main><section class=\"lovpen theme-dark\""));
    }
}
