//! Inline SVG icons.
//!
//! Resolves [`NodeKind::Icon`] nodes (such as callout icons) and `:name:`
//! shortcodes in text to inline SVG. Unknown icon names are left alone.

use crate::error::TransformError;
use crate::icons::{ICON_NAMES, icon_svg};
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_str,
};

pub struct IconPlugin;

const DEFAULT_SIZE: u32 = 16;

fn parse_size(value: &str) -> Result<u32, String> {
    match value.trim().parse::<u32>() {
        Ok(size) if (8..=128).contains(&size) => Ok(size),
        _ => Err(format!("icon size must be a number between 8 and 128, got '{value}'")),
    }
}

/// Replace `:name:` shortcodes of known icons with SVG.
fn expand_shortcodes(text: &str, size: u32) -> Option<Vec<SyntaxNode>> {
    let mut nodes = Vec::new();
    let mut plain = String::new();
    let mut rest = text;
    let mut found = false;
    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        let svg = after
            .find(':')
            .map(|end| &after[..end])
            .filter(|name| ICON_NAMES.contains(name))
            .and_then(|name| Some((name.len(), icon_svg(name, size)?)));
        match svg {
            Some((len, svg)) => {
                plain.push_str(&rest[..start]);
                if !plain.is_empty() {
                    nodes.push(SyntaxNode::text(std::mem::take(&mut plain)));
                }
                nodes.push(SyntaxNode::raw(svg));
                rest = &after[len + 1..];
                found = true;
            }
            None => {
                plain.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }
    if !found {
        return None;
    }
    plain.push_str(rest);
    if !plain.is_empty() {
        nodes.push(SyntaxNode::text(plain));
    }
    Some(nodes)
}

impl TransformPlugin for IconPlugin {
    fn name(&self) -> &str {
        "icon"
    }

    fn phase(&self) -> Phase {
        Phase::Render
    }

    fn description(&self) -> &str {
        "Inline SVG icons for :name: shortcodes and callouts"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "size".to_owned(),
            ConfigField::input("Icon size (px)", "16"),
        );
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let size = parse_size(config_str(config, "size", "16")).unwrap_or(DEFAULT_SIZE);
        Ok(node.rewrite(&mut |child| match child.kind {
            NodeKind::Icon => match icon_svg(child.attr("name").unwrap_or_default(), size) {
                Some(svg) => Rewrite::Replace(SyntaxNode::raw(svg)),
                None => Rewrite::Keep,
            },
            NodeKind::Text => match expand_shortcodes(child.value(), size) {
                Some(nodes) => Rewrite::Splice(nodes),
                None => Rewrite::Keep,
            },
            _ => Rewrite::Keep,
        }))
    }

    fn validate(&self, config: &PluginConfig) -> Result<(), String> {
        parse_size(config_str(config, "size", "16")).map(|_| ())
    }
}
