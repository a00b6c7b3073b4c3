//! `==highlighted==` text spans.

use crate::error::TransformError;
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_str,
};

pub struct TextHighlightPlugin;

/// Split `text` into plain and highlighted segments.
///
/// Returns `None` when the text holds no complete `==...==` pair.
fn split_marks(text: &str) -> Option<Vec<(bool, &str)>> {
    let mut segments = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("==") {
        let after = &rest[start + 2..];
        let Some(len) = after.find("==") else { break };
        let inner = &after[..len];
        if inner.is_empty() || inner.starts_with(char::is_whitespace) || inner.ends_with(char::is_whitespace) {
            // Not a highlight; keep the opening `==` as text and move on.
            segments.push((false, &rest[..start + 2]));
            rest = after;
            continue;
        }
        if start > 0 {
            segments.push((false, &rest[..start]));
        }
        segments.push((true, inner));
        rest = &after[len + 2..];
    }
    if !segments.iter().any(|(mark, _)| *mark) {
        return None;
    }
    if !rest.is_empty() {
        segments.push((false, rest));
    }
    Some(segments)
}

impl TransformPlugin for TextHighlightPlugin {
    fn name(&self) -> &str {
        "text-highlight"
    }

    fn phase(&self) -> Phase {
        Phase::Structural
    }

    fn description(&self) -> &str {
        "Highlighted text with ==marks=="
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "color".to_owned(),
            ConfigField::input("Highlight color", "")
                .with_description("CSS color; empty uses the theme color"),
        );
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let color = config_str(config, "color", "").trim();
        Ok(node.rewrite(&mut |child| {
            if !child.is(NodeKind::Text) {
                return Rewrite::Keep;
            }
            let Some(segments) = split_marks(child.value()) else {
                return Rewrite::Keep;
            };
            Rewrite::Splice(
                segments
                    .into_iter()
                    .map(|(mark, text)| {
                        if !mark {
                            return SyntaxNode::text(text);
                        }
                        let node = SyntaxNode::new(NodeKind::Mark).with_child(SyntaxNode::text(text));
                        if color.is_empty() {
                            node
                        } else {
                            node.with_attr("color", color)
                        }
                    })
                    .collect(),
            )
        }))
    }
}
