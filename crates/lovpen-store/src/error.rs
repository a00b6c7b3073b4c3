//! Store error with semantic kind and backend-specific source.

use lovpen_renderer::PluginError;

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// The plugin is not registered.
    UnknownPlugin,
    /// The plugin rejected the config.
    InvalidConfig,
    /// A tier could not be read.
    ReadFailed,
    /// A tier could not be written.
    WriteFailed,
    /// Stored data could not be decoded.
    Corrupt,
    /// The background write task did not finish.
    Interrupted,
}

/// Config store error.
///
/// Persistence failures are never fatal: they are reported per tier and the
/// in-memory config stays authoritative.
#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// Name of the tier that failed (e.g. `"fs"`, `"cache"`).
    pub backend: Option<String>,
    pub plugin: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            backend: None,
            plugin: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach a plain message as the source.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.source = Some(message.into().into());
        self
    }

    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    #[must_use]
    pub fn unknown_plugin(name: &str) -> Self {
        Self::new(StoreErrorKind::UnknownPlugin).with_plugin(name)
    }
}

impl From<PluginError> for StoreError {
    fn from(err: PluginError) -> Self {
        let (kind, plugin) = match &err {
            PluginError::UnknownPlugin(name) => (StoreErrorKind::UnknownPlugin, name.clone()),
            PluginError::InvalidConfig { name, .. } => (StoreErrorKind::InvalidConfig, name.clone()),
            PluginError::DuplicateName { name, .. } => (StoreErrorKind::InvalidConfig, name.clone()),
        };
        Self::new(kind).with_plugin(plugin).with_source(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[backend] Kind: source (plugin: name)"
        if let Some(backend) = &self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StoreErrorKind::UnknownPlugin => "Unknown plugin",
            StoreErrorKind::InvalidConfig => "Invalid config",
            StoreErrorKind::ReadFailed => "Read failed",
            StoreErrorKind::WriteFailed => "Write failed",
            StoreErrorKind::Corrupt => "Corrupt record",
            StoreErrorKind::Interrupted => "Interrupted",
        };
        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(plugin) = &self.plugin {
            write!(f, " (plugin: {plugin})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        let err = StoreError::new(StoreErrorKind::WriteFailed)
            .with_backend("fs")
            .with_plugin("footnote")
            .with_message("disk full");
        assert_eq!(err.to_string(), "[fs] Write failed: disk full (plugin: footnote)");
    }

    #[test]
    fn test_downcast_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::new(StoreErrorKind::ReadFailed).with_source(io_err);
        assert_eq!(
            err.downcast_source::<std::io::Error>().map(std::io::Error::kind),
            Some(std::io::ErrorKind::PermissionDenied)
        );
    }

    #[test]
    fn test_from_plugin_error() {
        let err = StoreError::from(PluginError::UnknownPlugin("ghost".to_owned()));
        assert_eq!(err.kind, StoreErrorKind::UnknownPlugin);
        assert_eq!(err.plugin.as_deref(), Some("ghost"));
    }
}
