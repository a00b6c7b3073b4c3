//! Callouts from block quotes.
//!
//! Recognizes GitHub alerts (`> [!NOTE]`) and Obsidian callouts
//! (`> [!type] Title`, with `-` or `+` after the marker for a collapsed or
//! expanded foldable callout). The result is a [`NodeKind::Callout`] with a
//! title row (icon plus title) and a content container.

use crate::error::TransformError;
use crate::icons::callout_icon;
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_bool,
    config_str,
};

pub struct CalloutPlugin;

#[derive(Debug, PartialEq, Eq)]
struct Marker {
    kind: String,
    fold: Option<&'static str>,
    /// Title text on the marker line, if any.
    title: String,
}

/// Parse `[!type]`, `[!type]-` or `[!type]+ Title` at the start of a line.
///
/// Also returns the raw text following the marker.
fn parse_marker(line: &str) -> Option<(Marker, &str)> {
    let rest = line.trim_start().strip_prefix("[!")?;
    let (kind, rest) = rest.split_once(']')?;
    if kind.is_empty() || !kind.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    let (fold, rest) = match rest.chars().next() {
        Some('-') => (Some("closed"), &rest[1..]),
        Some('+') => (Some("open"), &rest[1..]),
        _ => (None, rest),
    };
    let marker = Marker {
        kind: kind.to_lowercase(),
        fold,
        title: rest.trim().to_owned(),
    };
    Some((marker, rest.trim_start()))
}

fn default_title(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split an Obsidian marker off the first paragraph of a block quote.
///
/// Returns the marker, the title inlines (rest of the marker line) and the
/// content blocks.
fn split_obsidian(quote: &SyntaxNode) -> Option<(Marker, Vec<SyntaxNode>, Vec<SyntaxNode>)> {
    let (first, rest) = quote.children.split_first()?;
    if !first.is(NodeKind::Paragraph) {
        return None;
    }
    let head = first.children.first().filter(|n| n.is(NodeKind::Text))?;
    let (mut marker, title_text) = parse_marker(head.value())?;

    let mut title_inlines = Vec::new();
    if !title_text.is_empty() {
        title_inlines.push(SyntaxNode::text(title_text));
    }
    let mut body_inlines = Vec::new();
    let mut in_body = false;
    for child in &first.children[1..] {
        if in_body {
            body_inlines.push(child.clone());
        } else if matches!(child.kind, NodeKind::SoftBreak | NodeKind::HardBreak) {
            in_body = true;
        } else {
            title_inlines.push(child.clone());
        }
    }
    marker.title = title_inlines
        .iter()
        .map(SyntaxNode::text_content)
        .collect::<String>()
        .trim()
        .to_owned();

    let mut blocks = Vec::new();
    if !body_inlines.is_empty() {
        blocks.push(SyntaxNode::new(NodeKind::Paragraph).with_children(body_inlines));
    }
    blocks.extend(rest.iter().cloned());
    Some((marker, title_inlines, blocks))
}

fn build_callout(
    marker: Marker,
    title_inlines: Vec<SyntaxNode>,
    blocks: Vec<SyntaxNode>,
    style: &str,
    show_icon: bool,
) -> SyntaxNode {
    let title = if marker.title.is_empty() {
        default_title(&marker.kind)
    } else {
        marker.title.clone()
    };
    let title_inlines = if title_inlines.is_empty() {
        vec![SyntaxNode::text(title.clone())]
    } else {
        title_inlines
    };

    let mut title_row = SyntaxNode::element(if marker.fold.is_some() { "summary" } else { "div" })
        .with_attr("class", "callout-title");
    if show_icon {
        title_row = title_row.with_child(
            SyntaxNode::new(NodeKind::Icon).with_attr("name", callout_icon(&marker.kind)),
        );
    }
    title_row = title_row.with_child(
        SyntaxNode::element("div")
            .with_attr("class", "callout-title-inner")
            .with_children(title_inlines),
    );

    let mut callout = SyntaxNode::new(NodeKind::Callout)
        .with_attr("callout_type", marker.kind.clone())
        .with_attr("title", title)
        .with_attr("style", style)
        .with_child(title_row)
        .with_child(
            SyntaxNode::element("div")
                .with_attr("class", "callout-content")
                .with_children(blocks),
        );
    if let Some(fold) = marker.fold {
        callout = callout.with_attr("foldable", fold);
    }
    callout
}

impl TransformPlugin for CalloutPlugin {
    fn name(&self) -> &str {
        "callout"
    }

    fn phase(&self) -> Phase {
        Phase::Structural
    }

    fn description(&self) -> &str {
        "Callout blocks from GitHub alerts and [!type] block quotes"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "style".to_owned(),
            ConfigField::select(
                "Style",
                &[("default", "Default"), ("minimal", "Minimal")],
                "default",
            ),
        );
        meta.insert("show_icon".to_owned(), ConfigField::switch("Show icon", true));
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let style = config_str(config, "style", "default");
        let show_icon = config_bool(config, "show_icon", true);
        Ok(node.rewrite(&mut |child| {
            if child.is(NodeKind::BlockQuote) {
                Rewrite::Replace(convert_quote(child, style, show_icon))
            } else {
                Rewrite::Keep
            }
        }))
    }
}

/// Convert `quote` and every block quote nested in it.
fn convert_quote(quote: &SyntaxNode, style: &str, show_icon: bool) -> SyntaxNode {
    let inner = quote.rewrite(&mut |n| {
        if n.is(NodeKind::BlockQuote) {
            Rewrite::Replace(convert_quote(n, style, show_icon))
        } else {
            Rewrite::Keep
        }
    });
    convert(&inner, style, show_icon)
}

fn convert(quote: &SyntaxNode, style: &str, show_icon: bool) -> SyntaxNode {
    if let Some(kind) = quote.attr("alert") {
        let marker = Marker {
            kind: kind.to_owned(),
            fold: None,
            title: String::new(),
        };
        return build_callout(marker, Vec::new(), quote.children.clone(), style, show_icon);
    }
    match split_obsidian(quote) {
        Some((marker, title, blocks)) => build_callout(marker, title, blocks, style, show_icon),
        None => quote.clone(),
    }
}
