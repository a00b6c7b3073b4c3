//! Resource kinds and options.

use serde::{Deserialize, Serialize};

/// Identifier of the "no template" entry.
pub const NO_TEMPLATE: &str = "none";

/// Resource category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Theme,
    Highlight,
    Template,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::Theme, Self::Highlight, Self::Template];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Highlight => "highlight",
            Self::Template => "template",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable theme, highlight style or template.
///
/// Identity is `identifier` within its kind: a theme class name, a highlight
/// style name or a template file stem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOption {
    pub name: String,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Stylesheet location for highlight styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ResourceOption {
    #[must_use]
    pub fn new(name: &str, identifier: &str) -> Self {
        Self {
            name: name.to_owned(),
            identifier: identifier.to_owned(),
            description: None,
            author: None,
            url: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    /// The "no template" entry.
    #[must_use]
    pub fn no_template() -> Self {
        Self::new("No template", NO_TEMPLATE)
    }

    #[must_use]
    pub fn is_no_template(&self) -> bool {
        self.identifier == NO_TEMPLATE
    }
}

/// Last-resort list for `kind`. Never empty.
#[must_use]
pub fn minimal_options(kind: ResourceKind) -> Vec<ResourceOption> {
    match kind {
        ResourceKind::Theme => vec![
            ResourceOption::new("Default", "default"),
            ResourceOption::new("Dark", "dark"),
            ResourceOption::new("Light", "light"),
        ],
        ResourceKind::Highlight => vec![
            ResourceOption::new("default", "default"),
            ResourceOption::new("GitHub", "github"),
            ResourceOption::new("VS Code", "vscode"),
        ],
        ResourceKind::Template => vec![
            ResourceOption::no_template(),
            ResourceOption::new("Default", "default"),
            ResourceOption::new("Minimal", "minimal"),
        ],
    }
}
