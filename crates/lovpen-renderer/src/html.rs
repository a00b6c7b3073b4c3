//! HTML serializer for syntax trees.
//!
//! Produces semantic HTML5. Constructs that no plugin processed (footnote
//! references, math, icons) serialize to a plain fallback so that disabling a
//! plugin never drops content.

use std::collections::HashMap;

use crate::node::{ERROR, NodeKind, SyntaxNode};
use crate::text::{escape_html, slugify};

const VOID_TAGS: [&str; 6] = ["br", "hr", "img", "input", "source", "wbr"];

/// Serializes a [`SyntaxNode`] tree into an HTML fragment.
///
/// Heading ids are derived from heading text and made unique per document.
#[derive(Default)]
pub struct HtmlSerializer {
    out: String,
    heading_ids: HashMap<String, usize>,
}

impl HtmlSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize a whole tree.
    #[must_use]
    pub fn serialize(tree: &SyntaxNode) -> String {
        let mut serializer = Self::new();
        serializer.node(tree);
        serializer.out
    }

    fn children(&mut self, node: &SyntaxNode) {
        for child in &node.children {
            self.node(child);
        }
    }

    fn wrap(&mut self, tag: &str, node: &SyntaxNode) {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.children(node);
        self.close(tag);
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    fn attr(&mut self, key: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(key);
        self.out.push_str("=\"");
        self.out.push_str(&escape_html(value));
        self.out.push('"');
    }

    fn text(&mut self, value: &str) {
        self.out.push_str(&escape_html(value));
    }

    #[allow(clippy::too_many_lines)]
    fn node(&mut self, node: &SyntaxNode) {
        match node.kind {
            NodeKind::Document | NodeKind::HtmlBlock => self.children(node),
            NodeKind::Paragraph => self.wrap("p", node),
            NodeKind::Heading => self.heading(node),
            NodeKind::BlockQuote => self.wrap("blockquote", node),
            NodeKind::CodeBlock => {
                self.out.push_str("<pre><code");
                if let Some(lang) = node.attr("lang") {
                    self.attr("class", &format!("language-{lang}"));
                }
                self.out.push('>');
                self.text(node.value());
                self.out.push_str("</code></pre>");
            }
            NodeKind::List => {
                if node.attr("ordered") == Some("true") {
                    self.out.push_str("<ol");
                    if let Some(start) = node.attr("start").filter(|s| *s != "1") {
                        self.attr("start", start);
                    }
                    self.out.push('>');
                    self.children(node);
                    self.close("ol");
                } else {
                    self.wrap("ul", node);
                }
            }
            NodeKind::Item => self.wrap("li", node),
            NodeKind::Table => self.table(node),
            NodeKind::TableHead | NodeKind::TableRow => self.table_row(node, false),
            NodeKind::TableCell => self.table_cell(node, false),
            NodeKind::Rule => self.out.push_str("<hr>"),
            NodeKind::DefinitionList => self.wrap("dl", node),
            NodeKind::DefinitionTitle => self.wrap("dt", node),
            NodeKind::DefinitionDetail => self.wrap("dd", node),
            NodeKind::FootnoteDefinition => self.footnote_definition(node),
            NodeKind::FootnoteSection => {
                self.out.push_str(r#"<section class="footnotes"><ol>"#);
                self.children(node);
                self.out.push_str("</ol></section>");
            }
            NodeKind::FootnoteReference => self.footnote_reference(node),
            NodeKind::DisplayMath => self.text(&format!("$${}$$", node.value())),
            NodeKind::InlineMath => self.text(&format!("${}$", node.value())),
            NodeKind::Text => self.text(node.value()),
            NodeKind::Code => {
                self.out.push_str("<code>");
                self.text(node.value());
                self.out.push_str("</code>");
            }
            NodeKind::Html | NodeKind::Raw => self.out.push_str(node.value()),
            NodeKind::Emphasis => self.wrap("em", node),
            NodeKind::Strong => self.wrap("strong", node),
            NodeKind::Strikethrough => self.wrap("del", node),
            NodeKind::Superscript => self.wrap("sup", node),
            NodeKind::Subscript => self.wrap("sub", node),
            NodeKind::Link => {
                self.out.push_str("<a");
                for key in ["href", "title", "class", "target", "rel"] {
                    if let Some(value) = node.attr(key) {
                        self.attr(key, value);
                    }
                }
                self.out.push('>');
                self.children(node);
                self.close("a");
            }
            NodeKind::Image => {
                self.out.push_str("<img");
                self.attr("src", node.attr("src").unwrap_or_default());
                if let Some(title) = node.attr("title") {
                    self.attr("title", title);
                }
                self.attr("alt", node.attr("alt").unwrap_or_default());
                self.out.push('>');
            }
            NodeKind::SoftBreak => self.out.push('\n'),
            NodeKind::HardBreak => self.out.push_str("<br>"),
            NodeKind::TaskMarker => {
                self.out.push_str(r#"<input type="checkbox" disabled"#);
                if node.attr("checked") == Some("true") {
                    self.out.push_str(" checked");
                }
                self.out.push('>');
            }
            NodeKind::Callout => self.callout(node),
            NodeKind::Embed => {
                self.out.push_str(r#"<div class="lovpen-embed""#);
                self.attr("data-target", node.attr("target").unwrap_or_default());
                if let Some(anchor) = node.attr("anchor") {
                    self.attr("data-anchor", anchor);
                }
                self.out.push('>');
                self.children(node);
                self.out.push_str("</div>");
            }
            NodeKind::Mark => {
                self.out.push_str("<mark");
                if let Some(color) = node.attr("color").filter(|c| !c.is_empty()) {
                    self.attr("style", &format!("background-color: {color}"));
                }
                self.out.push('>');
                self.children(node);
                self.close("mark");
            }
            NodeKind::Icon => {
                self.out.push_str("<span");
                self.attr(
                    "class",
                    &format!("icon icon-{}", node.attr("name").unwrap_or_default()),
                );
                self.out.push_str(r#" aria-hidden="true"></span>"#);
            }
            NodeKind::Element => self.element(node),
            NodeKind::Error => {
                let tag = if node.attr("block").is_some() { "pre" } else { "span" };
                self.out.push('<');
                self.out.push_str(tag);
                self.attr("class", "lovpen-error");
                self.attr("title", node.attr(ERROR).unwrap_or_default());
                self.out.push('>');
                self.text(node.value());
                self.close(tag);
            }
        }
    }

    fn heading(&mut self, node: &SyntaxNode) {
        let level = node
            .attr("level")
            .and_then(|l| l.parse::<u8>().ok())
            .filter(|l| (1..=6).contains(l))
            .unwrap_or(1);
        let base = match node.attr("id") {
            Some(id) => id.to_owned(),
            None => slugify(&node.text_content()),
        };
        let id = self.unique_id(base);
        let tag = format!("h{level}");
        self.out.push('<');
        self.out.push_str(&tag);
        if !id.is_empty() {
            self.attr("id", &id);
        }
        if let Some(class) = node.attr("class") {
            self.attr("class", class);
        }
        self.out.push('>');
        self.children(node);
        self.close(&tag);
    }

    fn unique_id(&mut self, base: String) -> String {
        if base.is_empty() {
            return base;
        }
        let seen = self.heading_ids.entry(base.clone()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            base
        } else {
            format!("{base}-{}", *seen - 1)
        }
    }

    fn table(&mut self, node: &SyntaxNode) {
        self.out.push_str("<table>");
        let mut body_open = false;
        for child in &node.children {
            if child.is(NodeKind::TableHead) {
                self.out.push_str("<thead>");
                self.table_row(child, true);
                self.out.push_str("</thead>");
            } else {
                if !body_open {
                    self.out.push_str("<tbody>");
                    body_open = true;
                }
                self.node(child);
            }
        }
        if body_open {
            self.out.push_str("</tbody>");
        }
        self.out.push_str("</table>");
    }

    fn table_row(&mut self, node: &SyntaxNode, head: bool) {
        self.out.push_str("<tr>");
        for cell in &node.children {
            if cell.is(NodeKind::TableCell) {
                self.table_cell(cell, head);
            } else {
                self.node(cell);
            }
        }
        self.out.push_str("</tr>");
    }

    fn table_cell(&mut self, node: &SyntaxNode, head: bool) {
        let tag = if head { "th" } else { "td" };
        self.out.push('<');
        self.out.push_str(tag);
        if let Some(align) = node.attr("align") {
            self.attr("style", &format!("text-align: {align}"));
        }
        self.out.push('>');
        self.children(node);
        self.close(tag);
    }

    fn footnote_reference(&mut self, node: &SyntaxNode) {
        let label = node.attr("label").unwrap_or_default();
        match node.attr("marker") {
            Some(marker) => {
                self.out.push_str(r#"<sup class="footnote-ref"><a"#);
                self.attr("href", &format!("#fn-{}", slugify(label)));
                if let Some(id) = node.attr("ref_id") {
                    self.attr("id", id);
                }
                self.out.push('>');
                self.text(marker);
                self.out.push_str("</a></sup>");
            }
            None => self.text(&format!("[^{label}]")),
        }
    }

    fn footnote_definition(&mut self, node: &SyntaxNode) {
        let label = node.attr("label").unwrap_or_default();
        if node.attr("marker").is_none() {
            self.out.push_str(r#"<div class="footnote-definition""#);
            self.attr("data-label", label);
            self.out.push('>');
            self.text(&format!("[^{label}]: "));
            self.children(node);
            self.out.push_str("</div>");
            return;
        }
        self.out.push_str("<li");
        self.attr("id", &format!("fn-{}", slugify(label)));
        self.out.push('>');
        self.children(node);
        if let Some(back) = node.attr("back_ref") {
            self.out.push_str(r#"<a class="footnote-backref""#);
            self.attr("href", &format!("#{back}"));
            self.out.push_str(">\u{21a9}</a>");
        }
        self.out.push_str("</li>");
    }

    fn callout(&mut self, node: &SyntaxNode) {
        let kind = node.attr("callout_type").unwrap_or("note");
        let mut class = format!("callout callout-{kind}");
        if let Some(style) = node.attr("style").filter(|s| *s != "default") {
            class.push_str(" callout-");
            class.push_str(style);
        }
        let foldable = node.attr("foldable");
        let tag = if foldable.is_some() { "details" } else { "div" };
        self.out.push('<');
        self.out.push_str(tag);
        self.attr("class", &class);
        self.attr("data-callout", kind);
        if foldable == Some("open") {
            self.out.push_str(" open");
        }
        self.out.push('>');
        self.children(node);
        self.close(tag);
    }

    fn element(&mut self, node: &SyntaxNode) {
        let tag = node
            .attr("tag")
            .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("span")
            .to_ascii_lowercase();
        self.out.push('<');
        self.out.push_str(&tag);
        for (key, value) in &node.attrs {
            if key == "tag" || !is_attr_name(key) {
                continue;
            }
            self.attr(key, value);
        }
        self.out.push('>');
        if VOID_TAGS.contains(&tag.as_str()) {
            return;
        }
        self.children(node);
        self.close(&tag);
    }
}

fn is_attr_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, parse};
    use pretty_assertions::assert_eq;

    fn render(markdown: &str) -> String {
        HtmlSerializer::serialize(&parse(markdown, &ParseOptions::default()))
    }

    #[test]
    fn test_paragraph_and_inline() {
        assert_eq!(
            render("Hello **bold** <x> `code`"),
            "<p>Hello <strong>bold</strong> <x> <code>code</code></p>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(render("a & b"), "<p>a &amp; b</p>");
    }

    #[test]
    fn test_heading_ids_are_unique() {
        assert_eq!(
            render("# Intro\n\n## Intro"),
            r#"<h1 id="intro">Intro</h1><h2 id="intro-1">Intro</h2>"#
        );
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            render("```rust\nlet a = 1 < 2;\n```"),
            "<pre><code class=\"language-rust\">let a = 1 &lt; 2;\n</code></pre>"
        );
    }

    #[test]
    fn test_table() {
        assert_eq!(
            render("| a | b |\n|---|:-:|\n| 1 | 2 |"),
            r#"<table><thead><tr><th>a</th><th style="text-align: center">b</th></tr></thead><tbody><tr><td>1</td><td style="text-align: center">2</td></tr></tbody></table>"#
        );
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            render("- [x] done"),
            r#"<ul><li><input type="checkbox" disabled checked>done</li></ul>"#
        );
    }

    #[test]
    fn test_unprocessed_footnote_and_math_render_literally() {
        let html = render("Text[^1] and $x$\n\n[^1]: Note.");
        assert!(html.contains("Text[^1] and $x$"));
        assert!(html.contains(r#"<div class="footnote-definition" data-label="1">[^1]: <p>Note.</p></div>"#));
    }

    #[test]
    fn test_error_node() {
        let tree = SyntaxNode::new(NodeKind::Document)
            .with_child(SyntaxNode::error("<bad>", "oops \"x\""));
        assert_eq!(
            HtmlSerializer::serialize(&tree),
            r#"<span class="lovpen-error" title="oops &quot;x&quot;">&lt;bad&gt;</span>"#
        );
    }

    #[test]
    fn test_element_sanitizes_tag_and_attrs() {
        let tree = SyntaxNode::element("div onclick")
            .with_attr("class", "a")
            .with_attr("on click", "x")
            .with_child(SyntaxNode::element("br"))
            .with_child(SyntaxNode::text("t"));
        assert_eq!(
            HtmlSerializer::serialize(&tree),
            r#"<span class="a"><br>t</span>"#
        );
    }

    #[test]
    fn test_callout_and_icon_fallback() {
        let tree = SyntaxNode::new(NodeKind::Callout)
            .with_attr("callout_type", "tip")
            .with_attr("foldable", "closed")
            .with_child(SyntaxNode::new(NodeKind::Icon).with_attr("name", "lightbulb"));
        assert_eq!(
            HtmlSerializer::serialize(&tree),
            r#"<details class="callout callout-tip" data-callout="tip"><span class="icon icon-lightbulb" aria-hidden="true"></span></details>"#
        );
    }
}
