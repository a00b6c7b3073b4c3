//! CLI error types.

use lovpen_config::ConfigError;
use lovpen_renderer::PluginError;
use lovpen_store::StoreError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Plugin(#[from] PluginError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}
