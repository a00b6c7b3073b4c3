//! Fallback-chained resource catalog.

use std::sync::Arc;

use crate::option::{NO_TEMPLATE, ResourceKind, ResourceOption, minimal_options};
use crate::source::{BundledSource, ResourceSource};

/// Theme, highlight and template lists with a fallback chain.
///
/// Sources are tried in order; a source that fails or answers with an empty
/// list is skipped. The built-in minimal list ends every chain, so the
/// catalog never fails and never returns an empty list.
#[derive(Clone)]
pub struct ResourceCatalog {
    sources: Vec<Arc<dyn ResourceSource>>,
}

impl Default for ResourceCatalog {
    /// Bundled catalogs only.
    fn default() -> Self {
        Self::empty().with_source(Arc::new(BundledSource::new()))
    }
}

impl ResourceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with no sources, answering from the minimal lists.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a lower-priority source.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ResourceSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Put `source` ahead of every existing source.
    #[must_use]
    pub fn with_dynamic_source(mut self, source: Arc<dyn ResourceSource>) -> Self {
        self.sources.insert(0, source);
        self
    }

    #[must_use]
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Options of `kind` from the first source that has any.
    ///
    /// Template lists always start with the "no template" entry.
    pub async fn load(&self, kind: ResourceKind) -> Vec<ResourceOption> {
        for source in &self.sources {
            match source.load(kind).await {
                Ok(options) if !options.is_empty() => {
                    tracing::debug!(source = source.name(), %kind, count = options.len(), "loaded resources");
                    return finish(kind, options);
                }
                Ok(_) => {
                    tracing::warn!(source = source.name(), %kind, "resource source returned nothing");
                }
                Err(e) => {
                    tracing::debug!(source = source.name(), %kind, error = %e, "resource source failed");
                }
            }
        }
        tracing::warn!(%kind, "all resource sources failed, using built-in list");
        minimal_options(kind)
    }

    pub async fn load_themes(&self) -> Vec<ResourceOption> {
        self.load(ResourceKind::Theme).await
    }

    pub async fn load_highlights(&self) -> Vec<ResourceOption> {
        self.load(ResourceKind::Highlight).await
    }

    pub async fn load_templates(&self) -> Vec<ResourceOption> {
        self.load(ResourceKind::Template).await
    }

    /// The option whose identifier is `requested`, else the first option.
    pub async fn select(&self, kind: ResourceKind, requested: Option<&str>) -> ResourceOption {
        let mut options = self.load(kind).await;
        let index = requested
            .and_then(|id| options.iter().position(|o| o.identifier == id))
            .unwrap_or_else(|| {
                if let Some(id) = requested {
                    tracing::warn!(%kind, requested = id, "unknown resource, using the first option");
                }
                0
            });
        options.swap_remove(index)
    }

    /// Markup of template `identifier` from the first source that has it.
    ///
    /// `None` for the "no template" entry and for unknown templates.
    pub async fn template_body(&self, identifier: &str) -> Option<String> {
        if identifier == NO_TEMPLATE {
            return None;
        }
        for source in &self.sources {
            match source.template_body(identifier).await {
                Ok(Some(body)) => return Some(body),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(source = source.name(), template = identifier, error = %e, "template body lookup failed");
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCatalog")
            .field("sources", &self.source_names())
            .finish()
    }
}

fn finish(kind: ResourceKind, mut options: Vec<ResourceOption>) -> Vec<ResourceOption> {
    if kind == ResourceKind::Template {
        options.retain(|o| !o.is_no_template());
        options.insert(0, ResourceOption::no_template());
    }
    options
}
