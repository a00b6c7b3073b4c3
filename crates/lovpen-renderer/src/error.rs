//! Error types for plugin registration, configuration and transforms.

use crate::node::NodeKind;
use crate::plugin::Phase;

/// Error raised by [`PluginManager`](crate::PluginManager) operations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// A plugin with the same name is already registered.
    #[error("plugin '{name}' is already registered ({phase})")]
    DuplicateName { name: String, phase: Phase },

    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// The normalized config was rejected by the plugin's `validate`.
    #[error("invalid config for plugin '{name}': {message}")]
    InvalidConfig { name: String, message: String },
}

/// Error returned by a plugin's `transform`.
///
/// The manager treats it like a panic: the plugin is skipped for this run and
/// the previous tree is kept.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("malformed {kind:?} node: {message}")]
    Malformed { kind: NodeKind, message: String },

    #[error("{0}")]
    Failed(String),
}

impl TransformError {
    #[must_use]
    pub fn malformed(kind: NodeKind, message: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            message: message.into(),
        }
    }
}
