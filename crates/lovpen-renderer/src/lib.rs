//! Plugin-based markdown rendering pipeline.
//!
//! Markdown is parsed into a [`SyntaxNode`] tree, rewritten by an ordered set
//! of runtime-configurable [`TransformPlugin`]s and serialized to HTML.
//!
//! # Architecture
//!
//! - [`parse`]: markdown text to tree, never fails
//! - [`PluginManager`]: registry, toggles, config normalization and the
//!   per-phase fold with failure isolation
//! - [`plugins`]: built-in plugins (callouts, embeds, footnotes, math, ...)
//! - [`HtmlSerializer`]: tree to HTML fragment
//! - [`Pipeline`]: all of the above plus the styling wrapper
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lovpen_renderer::{Pipeline, RenderRequest, plugins::builtin_manager};
//!
//! let pipeline = Pipeline::new(Arc::new(builtin_manager()));
//! let output = pipeline.render("# Hello\n\n> [!TIP]\n> Use ==marks==.", &RenderRequest::default());
//! assert_eq!(output.title.as_deref(), Some("Hello"));
//! assert!(output.html.contains("callout-tip"));
//! ```

mod error;
mod gate;
mod html;
pub mod icons;
mod manager;
mod node;
mod parser;
mod pipeline;
mod plugin;
pub mod plugins;
mod text;

pub use error::{PluginError, TransformError};
pub use gate::{RenderGate, RenderTicket};
pub use html::HtmlSerializer;
pub use manager::{PluginDescriptor, PluginFailure, PluginManager, RunReport};
pub use node::{ERROR, NodeKind, Rewrite, SyntaxNode, VALUE};
pub use parser::{FRONT_MATTER_PREFIX, ParseOptions, parse};
pub use pipeline::{
    CONTENT_PLACEHOLDER, Pipeline, RenderOutput, RenderRequest, Styling, TITLE_PLACEHOLDER,
};
pub use plugin::{
    ConfigField, ConfigValue, FieldKind, MetaConfig, Phase, PluginConfig, SelectOption,
    TransformContext, TransformPlugin, config_bool, config_str, default_config, normalize_config,
};
pub use text::{escape_html, slugify};
