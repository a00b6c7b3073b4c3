//! End-to-end rendering: parse, structural plugins, render plugins, HTML.

use std::sync::Arc;

use crate::html::HtmlSerializer;
use crate::manager::{PluginFailure, PluginManager};
use crate::node::{ERROR, NodeKind, SyntaxNode};
use crate::parser::{FRONT_MATTER_PREFIX, ParseOptions, parse};
use crate::plugin::{Phase, TransformContext};
use crate::text::escape_html;

/// Placeholder replaced by the rendered article inside a template body.
pub const CONTENT_PLACEHOLDER: &str = "{{content}}";

/// Placeholder replaced by the escaped document title inside a template body.
pub const TITLE_PLACEHOLDER: &str = "{{title}}";

/// Visual choices applied around the rendered article.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Styling {
    pub theme: String,
    pub highlight: String,
    /// Template identifier; `None` renders without a template.
    pub template: Option<String>,
    /// Template markup containing [`CONTENT_PLACEHOLDER`].
    pub template_body: Option<String>,
}

impl Default for Styling {
    fn default() -> Self {
        Self {
            theme: "default".to_owned(),
            highlight: "github".to_owned(),
            template: None,
            template_body: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RenderRequest {
    pub options: ParseOptions,
    pub context: TransformContext,
    pub styling: Styling,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutput {
    pub html: String,
    /// Front matter `title`, else the first level-1 heading.
    pub title: Option<String>,
    pub theme: String,
    pub highlight: String,
    pub template: Option<String>,
    /// Plugins applied, structural first.
    pub applied: Vec<String>,
    /// Degraded input and failed plugins.
    pub warnings: Vec<String>,
}

/// Markdown to HTML through a shared [`PluginManager`].
#[derive(Clone)]
pub struct Pipeline {
    manager: Arc<PluginManager>,
}

impl Pipeline {
    #[must_use]
    pub fn new(manager: Arc<PluginManager>) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// Parse and run both plugin phases.
    ///
    /// Returns the final tree together with the names of the applied plugins
    /// and every plugin failure.
    #[must_use]
    pub fn transform(
        &self,
        text: &str,
        request: &RenderRequest,
    ) -> (SyntaxNode, Vec<String>, Vec<PluginFailure>) {
        let mut tree = parse(text, &request.options);
        let mut applied = Vec::new();
        let mut failed = Vec::new();
        for phase in Phase::ALL {
            let report = self.manager.run(phase, tree, &request.context);
            tree = report.tree;
            applied.extend(report.applied);
            failed.extend(report.failed);
        }
        (tree, applied, failed)
    }

    /// Render `text` to styled HTML. Never fails; problems end up in
    /// [`RenderOutput::warnings`].
    #[must_use]
    pub fn render(&self, text: &str, request: &RenderRequest) -> RenderOutput {
        let (tree, applied, failed) = self.transform(text, request);

        let mut warnings = parse_warnings(&tree);
        warnings.extend(
            failed
                .iter()
                .map(|f| format!("plugin '{}' ({}) failed: {}", f.plugin, f.phase, f.message)),
        );

        let title = document_title(&tree);
        let styling = &request.styling;
        let article = HtmlSerializer::serialize(&tree);
        let mut html = format!(
            r#"<section class="lovpen theme-{}" data-highlight="{}">{article}</section>"#,
            escape_html(&styling.theme),
            escape_html(&styling.highlight),
        );
        let template = match (&styling.template, &styling.template_body) {
            (Some(id), Some(body)) if body.contains(CONTENT_PLACEHOLDER) => {
                let escaped_title = escape_html(title.as_deref().unwrap_or_default());
                html = fill_template(body, &escaped_title, &html);
                Some(id.clone())
            }
            (Some(id), _) => {
                tracing::warn!(template = %id, "template body missing or has no content placeholder");
                warnings.push(format!("template '{id}' could not be applied"));
                None
            }
            (None, _) => None,
        };

        tracing::debug!(
            applied = applied.len(),
            warnings = warnings.len(),
            "rendered document"
        );
        RenderOutput {
            html,
            title,
            theme: styling.theme.clone(),
            highlight: styling.highlight.clone(),
            template,
            applied,
            warnings,
        }
    }
}

/// Substitute both placeholders in one left-to-right pass, so text inserted
/// for one placeholder is never scanned for the other.
fn fill_template(body: &str, title: &str, content: &str) -> String {
    let mut out = String::with_capacity(body.len() + content.len());
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(TITLE_PLACEHOLDER) {
            out.push_str(title);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTENT_PLACEHOLDER) {
            out.push_str(content);
            rest = after;
        } else {
            out.push_str("{{");
            rest = &tail[2..];
        }
    }
    out.push_str(rest);
    out
}

fn parse_warnings(tree: &SyntaxNode) -> Vec<String> {
    let mut warnings = Vec::new();
    tree.walk(&mut |node| {
        if let Some(message) = node.attr(ERROR) {
            warnings.push(format!("{:?}: {message}", node.kind));
        }
    });
    warnings
}

fn document_title(tree: &SyntaxNode) -> Option<String> {
    if let Some(title) = tree.attr(&format!("{FRONT_MATTER_PREFIX}title")) {
        return Some(title.to_owned());
    }
    tree.children
        .iter()
        .find(|n| n.is(NodeKind::Heading) && n.attr("level") == Some("1"))
        .map(SyntaxNode::text_content)
        .filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::plugin::{ConfigValue, MetaConfig, PluginConfig, TransformPlugin};
    use crate::plugins::builtin_manager;
    use pretty_assertions::assert_eq;

    fn pipeline() -> Pipeline {
        Pipeline::new(Arc::new(builtin_manager()))
    }

    const FOOTNOTE_DOC: &str = "Claim[^1].\n\n[^1]: Source.";

    #[test]
    fn test_render_wraps_in_styling_section() {
        let out = pipeline().render("# Hello\n\nWorld", &RenderRequest::default());
        assert_eq!(
            out.html,
            r#"<section class="lovpen theme-default" data-highlight="github"><h1 id="hello">Hello</h1><p>World</p></section>"#
        );
        assert_eq!(out.title.as_deref(), Some("Hello"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_footnote_toggle() {
        let pipeline = pipeline();
        let request = RenderRequest::default();

        let on = pipeline.render(FOOTNOTE_DOC, &request);
        assert!(on.html.contains(r#"<section class="footnotes">"#));
        assert!(on.applied.iter().any(|p| p == "footnote"));

        pipeline.manager().set_enabled("footnote", false);
        let off = pipeline.render(FOOTNOTE_DOC, &request);
        assert!(!off.html.contains(r#"<section class="footnotes">"#));
        assert!(off.html.contains("Claim[^1]."));
        assert!(off.html.contains("Source."));
    }

    #[test]
    fn test_math_toggle() {
        let pipeline = pipeline();
        let request = RenderRequest::default();

        let off = pipeline.render("Area $a^2$", &request);
        assert!(off.html.contains("Area $a^2$"));

        pipeline.manager().set_enabled("math", true);
        let on = pipeline.render("Area $a^2$", &request);
        assert!(on.html.contains(r#"<span class="math math-inline" data-engine="katex">\(a^2\)</span>"#));

        pipeline.manager().set_enabled("math", false);
        let off_again = pipeline.render("Area $a^2$", &request);
        assert_eq!(off_again, off);
    }

    #[test]
    fn test_numeric_footnotes_leave_math_untouched() {
        let pipeline = pipeline();
        let manager = pipeline.manager();
        manager.set_enabled("footnote", true);
        manager.set_enabled("math", false);
        let mut config = PluginConfig::new();
        config.insert("style".to_owned(), ConfigValue::from("numeric"));
        manager.set_config("footnote", &config).unwrap();

        let out = pipeline.render("Energy $E=mc^2$ holds[^1].\n\n[^1]: Einstein, 1905.", &RenderRequest::default());
        assert!(out.html.contains(r#"<section class="footnotes">"#));
        assert!(out.html.contains("Einstein, 1905."));
        assert!(out.html.contains("Energy $E=mc^2$ holds"));
        assert!(!out.html.contains("math-inline"));
        assert!(out.applied.iter().any(|p| p == "footnote"));
        assert!(!out.applied.iter().any(|p| p == "math"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let pipeline = pipeline();
        let text = "---\ntitle: T\n---\n\n> [!NOTE]\n> n\n\n==x== [l](https://e.test)[^a]\n\n[^a]: b";
        let request = RenderRequest::default();
        assert_eq!(pipeline.render(text, &request), pipeline.render(text, &request));
    }

    #[test]
    fn test_all_disabled_matches_bare_serialization() {
        let pipeline = pipeline();
        for name in pipeline.manager().names() {
            pipeline.manager().set_enabled(name, false);
        }
        let text = "# A\n\n> [!TIP]\n> b\n\n```rust\nfn x() {}\n```";
        let (tree, applied, _) = pipeline.transform(text, &RenderRequest::default());
        assert!(applied.is_empty());
        assert_eq!(tree, parse(text, &ParseOptions::default()));
    }

    struct Broken;

    impl TransformPlugin for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn phase(&self) -> Phase {
            Phase::Render
        }
        fn description(&self) -> &str {
            "fails"
        }
        fn meta_config(&self) -> MetaConfig {
            MetaConfig::new()
        }
        fn transform(
            &self,
            node: &SyntaxNode,
            _config: &PluginConfig,
            _ctx: &TransformContext,
        ) -> Result<SyntaxNode, TransformError> {
            Err(TransformError::malformed(node.kind, "cannot handle documents"))
        }
    }

    #[test]
    fn test_failing_plugin_is_reported_and_skipped() {
        let mut manager = builtin_manager();
        manager.register(Box::new(Broken)).unwrap();
        let pipeline = Pipeline::new(Arc::new(manager));

        let out = pipeline.render("text", &RenderRequest::default());
        assert!(out.html.contains("<p>text</p>"));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("plugin 'broken' (render) failed"));
    }

    #[test]
    fn test_template_and_front_matter_title() {
        let request = RenderRequest {
            styling: Styling {
                theme: "dark".to_owned(),
                highlight: "monokai".to_owned(),
                template: Some("card".to_owned()),
                template_body: Some("<div class=\"card\"><h6>{{title}}</h6>{{content}}</div>".to_owned()),
            },
            ..RenderRequest::default()
        };
        let out = pipeline().render("---\ntitle: A & B\n---\n\nbody", &request);
        assert_eq!(
            out.html,
            r#"<div class="card"><h6>A &amp; B</h6><section class="lovpen theme-dark" data-highlight="monokai"><p>body</p></section></div>"#
        );
        assert_eq!(out.template.as_deref(), Some("card"));
    }

    #[test]
    fn test_title_cannot_smuggle_content_placeholder() {
        assert_eq!(
            fill_template("<h1>{{title}}</h1>{{content}}{{other}}", "{{content}}", "<p>x</p>"),
            "<h1>{{content}}</h1><p>x</p>{{other}}"
        );
    }

    #[test]
    fn test_degraded_front_matter_is_a_warning() {
        let out = pipeline().render("---\n: [\n---\n\nbody", &RenderRequest::default());
        assert!(out.html.contains("lovpen-error"));
        assert_eq!(out.warnings.len(), 1);
    }
}
