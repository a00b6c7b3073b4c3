//! Footnote numbering and the trailing footnotes section.
//!
//! Definitions are lifted out of the document flow and collected into a
//! [`NodeKind::FootnoteSection`] appended to the root, ordered by first
//! reference (unreferenced definitions follow). References get a `marker` in
//! the configured numbering style; references to unknown labels degrade to
//! their literal text with an `error` attribute.

use std::collections::HashMap;

use crate::error::TransformError;
use crate::node::{ERROR, NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_bool,
    config_str,
};
use crate::text::slugify;

pub struct FootnotePlugin;

/// Render `n` (1-based) in the given numbering style.
fn marker(n: usize, style: &str) -> String {
    match style {
        "roman" => to_roman(n),
        "alpha" => to_alpha(n),
        _ => n.to_string(),
    }
}

fn to_roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// `a`..`z`, then `aa`, `ab`, ...
fn to_alpha(mut n: usize) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'a' + u8::try_from(n % 26).unwrap_or(0));
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn ref_id(label: &str, occurrence: usize) -> String {
    if occurrence == 0 {
        format!("fnref-{}", slugify(label))
    } else {
        format!("fnref-{}-{occurrence}", slugify(label))
    }
}

impl TransformPlugin for FootnotePlugin {
    fn name(&self) -> &str {
        "footnote"
    }

    fn phase(&self) -> Phase {
        Phase::Structural
    }

    fn description(&self) -> &str {
        "Numbered footnotes collected at the end of the document"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "style".to_owned(),
            ConfigField::select(
                "Numbering",
                &[("numeric", "1, 2, 3"), ("roman", "i, ii, iii"), ("alpha", "a, b, c")],
                "numeric",
            ),
        );
        meta.insert(
            "back_links".to_owned(),
            ConfigField::switch("Back links", true)
                .with_description("Link each footnote back to its first reference"),
        );
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let style = config_str(config, "style", "numeric");
        let back_links = config_bool(config, "back_links", true);

        let mut definitions: Vec<SyntaxNode> = Vec::new();
        let mut order: Vec<String> = Vec::new();
        node.walk(&mut |n| match n.kind {
            NodeKind::FootnoteDefinition => definitions.push(n.clone()),
            NodeKind::FootnoteReference => {
                let label = n.attr("label").unwrap_or_default();
                if !order.iter().any(|l| l == label) {
                    order.push(label.to_owned());
                }
            }
            _ => {}
        });
        if definitions.is_empty() && order.is_empty() {
            return Ok(node.clone());
        }

        // First definition of a label wins.
        let mut by_label: HashMap<String, SyntaxNode> = HashMap::new();
        let mut definition_order = Vec::new();
        for definition in definitions {
            let label = definition.attr("label").unwrap_or_default().to_owned();
            if !by_label.contains_key(&label) {
                definition_order.push(label.clone());
                by_label.insert(label, definition);
            }
        }

        let mut numbered: Vec<String> = order
            .iter()
            .filter(|label| by_label.contains_key(*label))
            .cloned()
            .collect();
        for label in definition_order {
            if !numbered.contains(&label) {
                numbered.push(label);
            }
        }
        let markers: HashMap<&str, String> = numbered
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), marker(i + 1, style)))
            .collect();

        let mut body = node.rewrite(&mut |n| {
            if n.is(NodeKind::FootnoteDefinition) {
                Rewrite::Splice(Vec::new())
            } else {
                Rewrite::Keep
            }
        });
        if !numbered.is_empty() {
            let items = numbered.iter().filter_map(|label| {
                let definition = by_label.get(label)?;
                let mut item = definition
                    .clone()
                    .with_attr("marker", markers.get(label.as_str())?.clone());
                if back_links && order.contains(label) {
                    item = item.with_attr("back_ref", ref_id(label, 0));
                }
                Some(item)
            });
            body.children
                .push(SyntaxNode::new(NodeKind::FootnoteSection).with_children(items));
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        Ok(body.rewrite(&mut |n| {
            if !n.is(NodeKind::FootnoteReference) {
                return Rewrite::Keep;
            }
            let label = n.attr("label").unwrap_or_default();
            let Some(marker) = markers.get(label) else {
                tracing::debug!(label, "reference to undefined footnote");
                return Rewrite::Replace(
                    SyntaxNode::text(format!("[^{label}]"))
                        .with_attr(ERROR, format!("undefined footnote '{label}'")),
                );
            };
            let occurrence = seen.entry(label.to_owned()).or_insert(0);
            let id = ref_id(label, *occurrence);
            *occurrence += 1;
            Rewrite::Replace(
                n.clone()
                    .with_attr("marker", marker.clone())
                    .with_attr("ref_id", id),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::HtmlSerializer;
    use crate::parser::{ParseOptions, parse};
    use crate::plugin::default_config;
    use pretty_assertions::assert_eq;

    fn run(markdown: &str, style: &str) -> SyntaxNode {
        let mut config = default_config(&FootnotePlugin.meta_config());
        config.insert("style".to_owned(), style.into());
        FootnotePlugin
            .transform(
                &parse(markdown, &ParseOptions::default()),
                &config,
                &TransformContext::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_markers() {
        assert_eq!(marker(4, "roman"), "iv");
        assert_eq!(marker(14, "roman"), "xiv");
        assert_eq!(marker(1, "alpha"), "a");
        assert_eq!(marker(27, "alpha"), "aa");
        assert_eq!(marker(3, "numeric"), "3");
    }

    #[test]
    fn test_definitions_move_to_section_in_reference_order() {
        let tree = run("B[^b] then A[^a].\n\n[^a]: Alpha.\n\n[^b]: Beta.", "numeric");
        let section = tree.children.last().unwrap();
        assert_eq!(section.kind, NodeKind::FootnoteSection);
        let labels: Vec<&str> = section
            .children
            .iter()
            .map(|d| d.attr("label").unwrap())
            .collect();
        assert_eq!(labels, vec!["b", "a"]);
        assert_eq!(tree.count(NodeKind::FootnoteDefinition), 2);
        assert_eq!(section.children[0].attr("back_ref"), Some("fnref-b"));
    }

    #[test]
    fn test_reference_markers_and_repeat_ids() {
        let tree = run("x[^n] y[^n]\n\n[^n]: Note.", "roman");
        let paragraph = &tree.children[0];
        let refs: Vec<(&str, &str)> = paragraph
            .children
            .iter()
            .filter(|n| n.is(NodeKind::FootnoteReference))
            .map(|n| (n.attr("marker").unwrap(), n.attr("ref_id").unwrap()))
            .collect();
        assert_eq!(refs, vec![("i", "fnref-n"), ("i", "fnref-n-1")]);
    }

    #[test]
    fn test_html_output() {
        let html = HtmlSerializer::serialize(&run("Text[^1].\n\n[^1]: Note.", "numeric"));
        assert_eq!(
            html,
            concat!(
                r##"<p>Text<sup class="footnote-ref"><a href="#fn-1" id="fnref-1">1</a></sup>.</p>"##,
                r##"<section class="footnotes"><ol><li id="fn-1"><p>Note.</p>"##,
                r##"<a class="footnote-backref" href="#fnref-1">↩</a></li></ol></section>"##
            )
        );
    }

    #[test]
    fn test_tree_without_footnotes_is_unchanged() {
        let source = parse("Plain.", &ParseOptions::default());
        let out = FootnotePlugin
            .transform(
                &source,
                &default_config(&FootnotePlugin.meta_config()),
                &TransformContext::default(),
            )
            .unwrap();
        assert_eq!(out, source);
    }
}
