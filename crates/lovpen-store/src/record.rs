//! Persisted plugin configuration record.

use chrono::{DateTime, Utc};
use lovpen_renderer::{MetaConfig, PluginConfig};
use serde::{Deserialize, Serialize};

/// One plugin's persisted settings. A single record per plugin, overwritten on
/// every save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfigRecord {
    pub plugin_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub config: PluginConfig,
    #[serde(default)]
    pub meta_config: MetaConfig,
    /// Time of the last content change.
    pub updated_at: DateTime<Utc>,
    /// Monotonic per-plugin counter, bumped on every content change.
    pub version: u64,
}

fn default_enabled() -> bool {
    true
}

impl PersistedConfigRecord {
    /// Whether `other` carries the same settings, ignoring version and time.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.plugin_name == other.plugin_name
            && self.enabled == other.enabled
            && self.config == other.config
            && self.meta_config == other.meta_config
    }

    /// Cache etag for this record.
    #[must_use]
    pub fn etag(&self) -> String {
        self.version.to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lovpen_renderer::{ConfigField, ConfigValue};
    use pretty_assertions::assert_eq;

    pub(crate) fn sample() -> PersistedConfigRecord {
        let mut config = PluginConfig::new();
        config.insert("style".to_owned(), ConfigValue::from("roman"));
        config.insert("back_links".to_owned(), ConfigValue::Bool(false));
        let mut meta = MetaConfig::new();
        meta.insert(
            "style".to_owned(),
            ConfigField::select("Numbering", &[("numeric", "1"), ("roman", "i")], "numeric"),
        );
        meta.insert("back_links".to_owned(), ConfigField::switch("Back links", true));
        PersistedConfigRecord {
            plugin_name: "footnote".to_owned(),
            enabled: true,
            config,
            meta_config: meta,
            updated_at: DateTime::parse_from_rfc3339("2026-10-16T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            version: 3,
        }
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["pluginName"], "footnote");
        assert_eq!(json["config"]["style"], "roman");
        assert_eq!(json["config"]["back_links"], false);
        assert_eq!(json["metaConfig"]["style"]["type"], "select");
        assert_eq!(json["metaConfig"]["style"]["options"][1]["value"], "roman");
        assert_eq!(json["metaConfig"]["back_links"]["type"], "switch");
        assert_eq!(json["updatedAt"], "2026-10-16T08:30:00Z");
        assert_eq!(json["version"], 3);
    }

    #[test]
    fn test_json_round_trip_keeps_field_order() {
        let record = sample();
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: PersistedConfigRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, record);
        let keys: Vec<&String> = back.meta_config.keys().collect();
        assert_eq!(keys, vec!["style", "back_links"]);
        assert_eq!(serde_json::to_vec(&back).unwrap(), bytes);
    }

    #[test]
    fn test_same_content_ignores_version() {
        let a = sample();
        let mut b = sample();
        b.version = 9;
        assert!(a.same_content(&b));
        b.enabled = false;
        assert!(!a.same_content(&b));
    }
}
