//! External link presentation.
//!
//! `inline` keeps external links in place (optionally opening in a new tab).
//! `footnote` replaces each external link with its text plus a numbered
//! citation and appends a reference list, for platforms that strip links.

use std::collections::HashMap;

use crate::error::TransformError;
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_bool,
    config_str,
};

pub struct LinkPlugin;

fn is_external(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//")
}

fn citation_list(urls: &[String]) -> SyntaxNode {
    let items = urls.iter().enumerate().map(|(i, url)| {
        SyntaxNode::element("li")
            .with_attr("id", format!("link-ref-{}", i + 1))
            .with_child(
                SyntaxNode::new(NodeKind::Link)
                    .with_attr("href", url.clone())
                    .with_child(SyntaxNode::text(url.clone())),
            )
    });
    SyntaxNode::element("section")
        .with_attr("class", "link-references")
        .with_child(SyntaxNode::element("ol").with_children(items))
}

impl TransformPlugin for LinkPlugin {
    fn name(&self) -> &str {
        "link"
    }

    fn phase(&self) -> Phase {
        Phase::Render
    }

    fn description(&self) -> &str {
        "External links inline or as numbered references"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "style".to_owned(),
            ConfigField::select(
                "Link style",
                &[("inline", "Inline"), ("footnote", "Numbered references")],
                "inline",
            ),
        );
        meta.insert(
            "open_new_tab".to_owned(),
            ConfigField::switch("Open in new tab", true),
        );
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let as_citations = config_str(config, "style", "inline") == "footnote";
        let new_tab = config_bool(config, "open_new_tab", true);

        let mut urls: Vec<String> = Vec::new();
        let mut numbers: HashMap<String, usize> = HashMap::new();
        let mut out = node.rewrite(&mut |child| {
            if !child.is(NodeKind::Link) {
                return Rewrite::Keep;
            }
            let href = child.attr("href").unwrap_or_default();
            if !is_external(href) {
                return Rewrite::Keep;
            }
            if as_citations {
                // A bare URL link cites itself; keep just the number.
                let n = *numbers.entry(href.to_owned()).or_insert_with(|| {
                    urls.push(href.to_owned());
                    urls.len()
                });
                let mut nodes = if child.text_content() == href {
                    Vec::new()
                } else {
                    child.children.clone()
                };
                nodes.push(
                    SyntaxNode::element("sup")
                        .with_attr("class", "link-ref")
                        .with_child(SyntaxNode::text(format!("[{n}]"))),
                );
                return Rewrite::Splice(nodes);
            }
            let mut link = child.clone().with_attr("class", "external-link");
            if new_tab {
                link = link
                    .with_attr("target", "_blank")
                    .with_attr("rel", "noopener noreferrer");
            }
            Rewrite::Replace(link)
        });
        if !urls.is_empty() {
            out.children.push(citation_list(&urls));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::HtmlSerializer;
    use crate::parser::{ParseOptions, parse};
    use crate::plugin::default_config;
    use pretty_assertions::assert_eq;

    fn render(markdown: &str, style: &str, new_tab: bool) -> String {
        let mut config = default_config(&LinkPlugin.meta_config());
        config.insert("style".to_owned(), style.into());
        config.insert("open_new_tab".to_owned(), new_tab.into());
        let tree = LinkPlugin
            .transform(
                &parse(markdown, &ParseOptions::default()),
                &config,
                &TransformContext::default(),
            )
            .unwrap();
        HtmlSerializer::serialize(&tree)
    }

    #[test]
    fn test_inline_external_link() {
        assert_eq!(
            render("[Rust](https://rust-lang.org)", "inline", true),
            r#"<p><a href="https://rust-lang.org" class="external-link" target="_blank" rel="noopener noreferrer">Rust</a></p>"#
        );
    }

    #[test]
    fn test_internal_link_untouched() {
        assert_eq!(
            render("[Next](./next.md)", "footnote", true),
            r#"<p><a href="./next.md">Next</a></p>"#
        );
    }

    #[test]
    fn test_footnote_style_numbers_and_dedupes() {
        assert_eq!(
            render(
                "[A](https://a.example) [again](https://a.example) [B](https://b.example)",
                "footnote",
                false
            ),
            concat!(
                r#"<p>A<sup class="link-ref">[1]</sup> again<sup class="link-ref">[1]</sup> "#,
                r#"B<sup class="link-ref">[2]</sup></p>"#,
                r#"<section class="link-references"><ol>"#,
                r#"<li id="link-ref-1"><a href="https://a.example">https://a.example</a></li>"#,
                r#"<li id="link-ref-2"><a href="https://b.example">https://b.example</a></li>"#,
                r#"</ol></section>"#
            )
        );
    }
}
