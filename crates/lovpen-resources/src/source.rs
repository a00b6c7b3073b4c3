//! Resource sources.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ResourceError;
use crate::option::{ResourceKind, ResourceOption};

/// A provider of resource option lists.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Options of `kind`, in display order.
    async fn load(&self, kind: ResourceKind) -> Result<Vec<ResourceOption>, ResourceError>;

    /// Markup of the template `identifier`, if this source has it.
    async fn template_body(&self, _identifier: &str) -> Result<Option<String>, ResourceError> {
        Ok(None)
    }
}

/// Lists files of one kind from a directory.
///
/// Every `*.{extension}` file becomes an option named after its stem. Hidden
/// files are skipped and options are sorted by name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    dir: PathBuf,
    kind: ResourceKind,
    extension: String,
}

impl DirectorySource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, kind: ResourceKind, extension: &str) -> Self {
        let dir = dir.into();
        Self {
            name: format!("{kind} directory {}", dir.display()),
            dir,
            kind,
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// `*.html` template files.
    #[must_use]
    pub fn templates(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, ResourceKind::Template, "html")
    }

    /// `*.css` theme files.
    #[must_use]
    pub fn themes(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, ResourceKind::Theme, "css")
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(&self, source: io::Error) -> ResourceError {
        ResourceError::Io {
            path: self.dir.clone(),
            source,
        }
    }
}

#[async_trait]
impl ResourceSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, kind: ResourceKind) -> Result<Vec<ResourceOption>, ResourceError> {
        if kind != self.kind {
            return Err(ResourceError::Unsupported {
                source_name: self.name.clone(),
                kind,
            });
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| self.io_error(e))?;
        let mut options = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.io_error(e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            options.push(ResourceOption::new(stem, stem));
        }
        options.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(dir = %self.dir.display(), %kind, count = options.len(), "scanned resource directory");
        Ok(options)
    }

    async fn template_body(&self, identifier: &str) -> Result<Option<String>, ResourceError> {
        if self.kind != ResourceKind::Template || identifier.contains(['/', '\\']) {
            return Ok(None);
        }
        let path = self.dir.join(format!("{identifier}.{}", self.extension));
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ResourceError::Io { path, source }),
        }
    }
}

const BUNDLED_THEMES: &str = include_str!("../assets/themes.json");
const BUNDLED_HIGHLIGHTS: &str = include_str!("../assets/highlights.json");
const BUNDLED_TEMPLATES: &str = include_str!("../assets/templates.json");

#[derive(Deserialize)]
struct BundledEntry {
    #[serde(flatten)]
    option: ResourceOption,
    #[serde(default)]
    body: Option<String>,
}

/// Static catalogs compiled into the binary.
#[derive(Debug, Clone)]
pub struct BundledSource {
    themes: Cow<'static, str>,
    highlights: Cow<'static, str>,
    templates: Cow<'static, str>,
}

impl Default for BundledSource {
    fn default() -> Self {
        Self {
            themes: Cow::Borrowed(BUNDLED_THEMES),
            highlights: Cow::Borrowed(BUNDLED_HIGHLIGHTS),
            templates: Cow::Borrowed(BUNDLED_TEMPLATES),
        }
    }
}

impl BundledSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog data of one kind.
    #[must_use]
    pub fn with_json(mut self, kind: ResourceKind, json: impl Into<String>) -> Self {
        let json = Cow::Owned(json.into());
        match kind {
            ResourceKind::Theme => self.themes = json,
            ResourceKind::Highlight => self.highlights = json,
            ResourceKind::Template => self.templates = json,
        }
        self
    }

    fn entries(&self, kind: ResourceKind) -> Result<Vec<BundledEntry>, ResourceError> {
        let json = match kind {
            ResourceKind::Theme => &self.themes,
            ResourceKind::Highlight => &self.highlights,
            ResourceKind::Template => &self.templates,
        };
        serde_json::from_str(json).map_err(|source| ResourceError::Parse {
            source_name: "bundled".to_owned(),
            kind,
            source,
        })
    }
}

#[async_trait]
impl ResourceSource for BundledSource {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn load(&self, kind: ResourceKind) -> Result<Vec<ResourceOption>, ResourceError> {
        Ok(self.entries(kind)?.into_iter().map(|e| e.option).collect())
    }

    async fn template_body(&self, identifier: &str) -> Result<Option<String>, ResourceError> {
        Ok(self
            .entries(ResourceKind::Template)?
            .into_iter()
            .find(|e| e.option.identifier == identifier)
            .and_then(|e| e.body))
    }
}

/// Host-supplied lists.
#[derive(Debug, Clone, Default)]
pub struct ListSource {
    name: String,
    options: HashMap<ResourceKind, Vec<ResourceOption>>,
    bodies: HashMap<String, String>,
}

impl ListSource {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_options(mut self, kind: ResourceKind, options: Vec<ResourceOption>) -> Self {
        self.options.insert(kind, options);
        self
    }

    /// Add a template option together with its markup.
    #[must_use]
    pub fn with_template(mut self, option: ResourceOption, body: &str) -> Self {
        self.bodies.insert(option.identifier.clone(), body.to_owned());
        self.options
            .entry(ResourceKind::Template)
            .or_default()
            .push(option);
        self
    }
}

#[async_trait]
impl ResourceSource for ListSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, kind: ResourceKind) -> Result<Vec<ResourceOption>, ResourceError> {
        self.options
            .get(&kind)
            .cloned()
            .ok_or_else(|| ResourceError::Unsupported {
                source_name: self.name.clone(),
                kind,
            })
    }

    async fn template_body(&self, identifier: &str) -> Result<Option<String>, ResourceError> {
        Ok(self.bodies.get(identifier).cloned())
    }
}

/// Source that always fails.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone)]
pub struct FailingSource {
    name: String,
}

#[cfg(any(test, feature = "mock"))]
impl FailingSource {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl ResourceSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, _kind: ResourceKind) -> Result<Vec<ResourceOption>, ResourceError> {
        Err(ResourceError::Unavailable(self.name.clone()))
    }

    async fn template_body(&self, _identifier: &str) -> Result<Option<String>, ResourceError> {
        Err(ResourceError::Unavailable(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bundled_catalogs_parse() {
        let source = BundledSource::new();
        for kind in ResourceKind::ALL {
            let options = source.load(kind).await.unwrap();
            assert!(!options.is_empty(), "{kind}");
        }
        let templates = source.load(ResourceKind::Template).await.unwrap();
        assert!(templates[0].is_no_template());
    }

    #[tokio::test]
    async fn test_bundled_template_body() {
        let source = BundledSource::new();
        let body = source.template_body("card").await.unwrap().unwrap();
        assert!(body.contains("{{content}}"));
        assert_eq!(source.template_body("none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bundled_corrupt_data() {
        let source = BundledSource::new().with_json(ResourceKind::Theme, "[{");
        assert!(matches!(
            source.load(ResourceKind::Theme).await,
            Err(ResourceError::Parse { kind: ResourceKind::Theme, .. })
        ));
        assert!(source.load(ResourceKind::Highlight).await.is_ok());
    }

    #[tokio::test]
    async fn test_directory_source_lists_sorted_stems() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Weekly.html"), "<div>{{content}}</div>").unwrap();
        std::fs::write(dir.path().join("Bento 1.html"), "{{content}}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join(".hidden.html"), "").unwrap();

        let source = DirectorySource::templates(dir.path());
        let names: Vec<String> = source
            .load(ResourceKind::Template)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.identifier)
            .collect();

        assert_eq!(names, vec!["Bento 1", "Weekly"]);
        assert_eq!(
            source.template_body("Weekly").await.unwrap().as_deref(),
            Some("<div>{{content}}</div>")
        );
        assert_eq!(source.template_body("missing").await.unwrap(), None);
        assert_eq!(source.template_body("../Weekly").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_directory_source_other_kind_unsupported() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::templates(dir.path());
        assert!(matches!(
            source.load(ResourceKind::Theme).await,
            Err(ResourceError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_directory_source_missing_dir() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::themes(dir.path().join("absent"));
        assert!(matches!(
            source.load(ResourceKind::Theme).await,
            Err(ResourceError::Io { .. })
        ));
    }
}
