//! Note embeds (`![[target#anchor|alias]]`) and block ids (`^block-id`).
//!
//! A paragraph made only of embed markers (one per line) becomes one
//! [`NodeKind::Embed`] per marker. A paragraph ending in ` ^block-id` gets an
//! `id` attribute and loses the marker text.

use crate::error::TransformError;
use crate::node::{NodeKind, Rewrite, SyntaxNode, VALUE};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_bool,
};

pub struct EmbedPlugin;

struct EmbedTarget<'a> {
    target: &'a str,
    anchor: Option<&'a str>,
    alias: Option<&'a str>,
}

fn parse_embed(text: &str) -> Option<EmbedTarget<'_>> {
    let inner = text.trim().strip_prefix("![[")?.strip_suffix("]]")?;
    if inner.is_empty() || inner.contains("[[") || inner.contains("]]") {
        return None;
    }
    let (link, alias) = match inner.split_once('|') {
        Some((link, alias)) => (link, Some(alias.trim())),
        None => (inner, None),
    };
    let (target, anchor) = match link.split_once('#') {
        Some((target, anchor)) => (target.trim(), Some(anchor.trim())),
        None => (link.trim(), None),
    };
    if target.is_empty() && anchor.is_none() {
        return None;
    }
    Some(EmbedTarget {
        target,
        anchor: anchor.filter(|a| !a.is_empty()),
        alias: alias.filter(|a| !a.is_empty()),
    })
}

/// Split a trailing ` ^block-id` off `text`.
fn split_block_id(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_end();
    let (head, tail) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail),
        None => ("", trimmed),
    };
    let id = tail.strip_prefix('^')?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    Some((head.trim_end(), id))
}

fn embed_node(embed: &EmbedTarget<'_>, show_title: bool) -> SyntaxNode {
    let mut node = SyntaxNode::new(NodeKind::Embed).with_attr("target", embed.target);
    if let Some(anchor) = embed.anchor {
        node = node.with_attr("anchor", anchor);
    }
    let label = match (embed.alias, embed.anchor) {
        (Some(alias), _) => alias.to_owned(),
        (None, Some(anchor)) if embed.target.is_empty() => anchor.to_owned(),
        (None, Some(anchor)) => format!("{} > {anchor}", embed.target),
        (None, None) => embed.target.to_owned(),
    };
    if show_title {
        node = node.with_child(
            SyntaxNode::element("div")
                .with_attr("class", "lovpen-embed-title")
                .with_child(SyntaxNode::text(label.clone())),
        );
    }
    let mut href = String::new();
    if !embed.target.is_empty() {
        href.push_str(embed.target);
        if !embed.target.contains('.') {
            href.push_str(".md");
        }
    }
    if let Some(anchor) = embed.anchor {
        href.push('#');
        href.push_str(anchor);
    }
    node.with_child(
        SyntaxNode::new(NodeKind::Link)
            .with_attr("href", href)
            .with_attr("class", "internal-embed")
            .with_child(SyntaxNode::text(label)),
    )
}

/// Embeds for a paragraph consisting only of embed markers.
fn embed_paragraph(paragraph: &SyntaxNode, show_title: bool) -> Option<Vec<SyntaxNode>> {
    let mut embeds = Vec::new();
    for child in &paragraph.children {
        match child.kind {
            NodeKind::SoftBreak | NodeKind::HardBreak => {}
            NodeKind::Text => {
                for line in child.value().lines().filter(|l| !l.trim().is_empty()) {
                    embeds.push(embed_node(&parse_embed(line)?, show_title));
                }
            }
            _ => return None,
        }
    }
    (!embeds.is_empty()).then_some(embeds)
}

fn with_block_id(paragraph: &SyntaxNode) -> Option<SyntaxNode> {
    let last = paragraph.children.last()?;
    if !last.is(NodeKind::Text) {
        return None;
    }
    let (rest, id) = split_block_id(last.value())?;
    let mut out = paragraph.clone().with_attr("id", id);
    let len = out.children.len();
    if rest.is_empty() {
        out.children.truncate(len - 1);
    } else {
        out.children[len - 1]
            .attrs
            .insert(VALUE.to_owned(), rest.to_owned());
    }
    Some(out)
}

impl TransformPlugin for EmbedPlugin {
    fn name(&self) -> &str {
        "embed"
    }

    fn phase(&self) -> Phase {
        Phase::Structural
    }

    fn description(&self) -> &str {
        "Note and block embeds (![[target#anchor]]) and ^block-id anchors"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "show_title".to_owned(),
            ConfigField::switch("Show embed title", true),
        );
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let show_title = config_bool(config, "show_title", true);
        Ok(node.rewrite(&mut |child| {
            if !child.is(NodeKind::Paragraph) {
                return Rewrite::Keep;
            }
            if let Some(embeds) = embed_paragraph(child, show_title) {
                return Rewrite::Splice(embeds);
            }
            match with_block_id(child) {
                Some(paragraph) => Rewrite::Replace(paragraph),
                None => Rewrite::Keep,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use crate::plugin::default_config;
    use pretty_assertions::assert_eq;

    fn run(markdown: &str, show_title: bool) -> SyntaxNode {
        let mut config = default_config(&EmbedPlugin.meta_config());
        config.insert("show_title".to_owned(), show_title.into());
        EmbedPlugin
            .transform(
                &parse(markdown, &ParseOptions::default()),
                &config,
                &TransformContext::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_single_embed() {
        let tree = run("![[Daily Note#Tasks]]", true);
        let embed = &tree.children[0];
        assert_eq!(embed.kind, NodeKind::Embed);
        assert_eq!(embed.attr("target"), Some("Daily Note"));
        assert_eq!(embed.attr("anchor"), Some("Tasks"));
        assert_eq!(embed.children[0].text_content(), "Daily Note > Tasks");
        assert_eq!(embed.children[1].attr("href"), Some("Daily Note.md#Tasks"));
    }

    #[test]
    fn test_multiple_embeds_without_title() {
        let tree = run("![[a]]\n![[b.png|Picture]]", false);
        assert_eq!(tree.count(NodeKind::Embed), 2);
        let second = &tree.children[1];
        assert_eq!(second.children.len(), 1);
        assert_eq!(second.children[0].attr("href"), Some("b.png"));
        assert_eq!(second.text_content(), "Picture");
    }

    #[test]
    fn test_mixed_paragraph_is_not_embedded() {
        let tree = run("see ![[a]] inline", true);
        assert_eq!(tree.count(NodeKind::Embed), 0);
    }

    #[test]
    fn test_block_id() {
        let tree = run("Some claim ^claim-1", true);
        let paragraph = &tree.children[0];
        assert_eq!(paragraph.attr("id"), Some("claim-1"));
        assert_eq!(paragraph.text_content(), "Some claim");
    }

    #[test]
    fn test_unrelated_tree_is_unchanged() {
        let source = parse("# Title\n\nPlain text.", &ParseOptions::default());
        let out = EmbedPlugin
            .transform(
                &source,
                &default_config(&EmbedPlugin.meta_config()),
                &TransformContext::default(),
            )
            .unwrap();
        assert_eq!(out, source);
    }
}
