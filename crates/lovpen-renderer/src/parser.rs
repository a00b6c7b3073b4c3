//! Markdown text to [`SyntaxNode`] tree.
//!
//! Parsing is delegated to `pulldown-cmark`; this module folds its event
//! stream onto a node stack. The parser never fails: anything it cannot
//! interpret becomes an [`NodeKind::Error`] node (or an `error` attribute on
//! the affected node) and parsing carries on.

use std::collections::HashMap;

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

use crate::node::{ERROR, NodeKind, SyntaxNode, VALUE};

/// Document attribute prefix for flattened front matter keys.
pub const FRONT_MATTER_PREFIX: &str = "front_matter.";

/// Parser feature switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Tables, strikethrough, task lists and GitHub alerts.
    pub gfm: bool,
    pub footnotes: bool,
    /// `$inline$` and `$$display$$` math.
    pub math: bool,
    /// Leading `---` YAML block.
    pub front_matter: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            footnotes: true,
            math: true,
            front_matter: true,
        }
    }
}

impl ParseOptions {
    /// Map onto `pulldown-cmark` options.
    #[must_use]
    pub fn to_options(self) -> Options {
        let mut options = Options::ENABLE_HEADING_ATTRIBUTES | Options::ENABLE_DEFINITION_LIST;
        if self.gfm {
            options |= Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM;
        }
        if self.footnotes {
            options |= Options::ENABLE_FOOTNOTES;
        }
        if self.math {
            options |= Options::ENABLE_MATH;
        }
        if self.front_matter {
            options |= Options::ENABLE_YAML_STYLE_METADATA_BLOCKS;
        }
        options
    }
}

/// Parse markdown into a fresh syntax tree rooted at a [`NodeKind::Document`].
#[must_use]
pub fn parse(text: &str, options: &ParseOptions) -> SyntaxNode {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(text, options.to_options()) {
        builder.event(event);
    }
    builder.finish()
}

struct TreeBuilder {
    stack: Vec<SyntaxNode>,
    /// Column alignments of the open tables, innermost last.
    alignments: Vec<Vec<&'static str>>,
    cell_index: usize,
    front_matter: Option<String>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![SyntaxNode::new(NodeKind::Document)],
            alignments: Vec::new(),
            cell_index: 0,
            front_matter: None,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.append(SyntaxNode::new(NodeKind::Code).with_attr(VALUE, &*code)),
            Event::InlineMath(math) => {
                self.append(SyntaxNode::new(NodeKind::InlineMath).with_attr(VALUE, &*math));
            }
            Event::DisplayMath(math) => {
                self.append(SyntaxNode::new(NodeKind::DisplayMath).with_attr(VALUE, &*math));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.append(SyntaxNode::new(NodeKind::Html).with_attr(VALUE, &*html));
            }
            Event::FootnoteReference(label) => {
                self.append(SyntaxNode::new(NodeKind::FootnoteReference).with_attr("label", &*label));
            }
            Event::SoftBreak => self.append(SyntaxNode::new(NodeKind::SoftBreak)),
            Event::HardBreak => self.append(SyntaxNode::new(NodeKind::HardBreak)),
            Event::Rule => self.append(SyntaxNode::new(NodeKind::Rule)),
            Event::TaskListMarker(checked) => self.append(
                SyntaxNode::new(NodeKind::TaskMarker).with_attr("checked", checked.to_string()),
            ),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let node = match tag {
            Tag::Paragraph => SyntaxNode::new(NodeKind::Paragraph),
            Tag::Heading {
                level,
                id,
                classes,
                attrs,
            } => {
                let mut node =
                    SyntaxNode::new(NodeKind::Heading)
                    .with_attr("level", heading_level_to_num(level).to_string());
                if let Some(id) = id {
                    node = node.with_attr("id", &*id);
                }
                if !classes.is_empty() {
                    let classes: Vec<&str> = classes.iter().map(|c| &**c).collect();
                    node = node.with_attr("class", classes.join(" "));
                }
                for (key, value) in attrs {
                    node = node.with_attr(&key, value.as_deref().unwrap_or_default());
                }
                node
            }
            Tag::BlockQuote(kind) => {
                let node = SyntaxNode::new(NodeKind::BlockQuote);
                match kind {
                    Some(kind) => node.with_attr("alert", alert_name(kind)),
                    None => node,
                }
            }
            Tag::CodeBlock(kind) => {
                let node = SyntaxNode::new(NodeKind::CodeBlock);
                match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => {
                        with_fence_info(node, &info)
                    }
                    _ => node,
                }
            }
            Tag::HtmlBlock => SyntaxNode::new(NodeKind::HtmlBlock),
            Tag::List(start) => {
                let node = SyntaxNode::new(NodeKind::List);
                match start {
                    Some(n) => node.with_attr("ordered", "true").with_attr("start", n.to_string()),
                    None => node.with_attr("ordered", "false"),
                }
            }
            Tag::Item => SyntaxNode::new(NodeKind::Item),
            Tag::FootnoteDefinition(label) => {
                SyntaxNode::new(NodeKind::FootnoteDefinition).with_attr("label", &*label)
            }
            Tag::DefinitionList => SyntaxNode::new(NodeKind::DefinitionList),
            Tag::DefinitionListTitle => SyntaxNode::new(NodeKind::DefinitionTitle),
            Tag::DefinitionListDefinition => SyntaxNode::new(NodeKind::DefinitionDetail),
            Tag::Table(alignments) => {
                self.alignments
                    .push(alignments.iter().map(|a| alignment_name(*a)).collect());
                SyntaxNode::new(NodeKind::Table)
            }
            Tag::TableHead => {
                self.cell_index = 0;
                SyntaxNode::new(NodeKind::TableHead)
            }
            Tag::TableRow => {
                self.cell_index = 0;
                SyntaxNode::new(NodeKind::TableRow)
            }
            Tag::TableCell => {
                let align = self
                    .alignments
                    .last()
                    .and_then(|cols| cols.get(self.cell_index))
                    .copied()
                    .unwrap_or("none");
                self.cell_index += 1;
                let node = SyntaxNode::new(NodeKind::TableCell);
                if align == "none" {
                    node
                } else {
                    node.with_attr("align", align)
                }
            }
            Tag::Emphasis => SyntaxNode::new(NodeKind::Emphasis),
            Tag::Strong => SyntaxNode::new(NodeKind::Strong),
            Tag::Strikethrough => SyntaxNode::new(NodeKind::Strikethrough),
            Tag::Superscript => SyntaxNode::new(NodeKind::Superscript),
            Tag::Subscript => SyntaxNode::new(NodeKind::Subscript),
            Tag::Link {
                dest_url, title, ..
            } => with_title(SyntaxNode::new(NodeKind::Link).with_attr("href", &*dest_url), &title),
            Tag::Image {
                dest_url, title, ..
            } => with_title(SyntaxNode::new(NodeKind::Image).with_attr("src", &*dest_url), &title),
            Tag::MetadataBlock(_) => {
                self.front_matter = Some(String::new());
                return;
            }
        };
        self.stack.push(node);
    }

    fn end(&mut self, tag: TagEnd) {
        if let TagEnd::MetadataBlock(_) = tag {
            let source = self.front_matter.take().unwrap_or_default();
            self.apply_front_matter(&source);
            return;
        }
        if self.stack.len() <= 1 {
            tracing::debug!(?tag, "unmatched end event");
            self.append(SyntaxNode::error("", format!("unmatched end of {tag:?}")));
            return;
        }
        let Some(mut node) = self.stack.pop() else {
            return;
        };
        match tag {
            TagEnd::CodeBlock => {
                let code = node.text_content();
                node.children.clear();
                node = node.with_attr(VALUE, code);
            }
            TagEnd::Image => {
                let alt = node.text_content();
                node.children.clear();
                node = node.with_attr("alt", alt);
            }
            TagEnd::Table => {
                self.alignments.pop();
            }
            _ => {}
        }
        self.append(node);
    }

    fn text(&mut self, text: &str) {
        if let Some(buffer) = self.front_matter.as_mut() {
            buffer.push_str(text);
            return;
        }
        self.append(SyntaxNode::text(text));
    }

    /// Append to the innermost open node, merging adjacent text runs.
    fn append(&mut self, node: SyntaxNode) {
        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        if node.is(NodeKind::Text)
            && let Some(last) = parent.children.last_mut()
            && last.is(NodeKind::Text)
        {
            let merged = format!("{}{}", last.value(), node.value());
            last.attrs.insert(VALUE.to_owned(), merged);
            return;
        }
        parent.children.push(node);
    }

    fn apply_front_matter(&mut self, source: &str) {
        let literal = || format!("---\n{source}---");
        let parsed = match serde_yaml::from_str::<serde_yaml::Value>(source) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "front matter is not valid YAML");
                self.append(
                    SyntaxNode::error(literal(), format!("invalid front matter: {e}"))
                        .with_attr("block", "true"),
                );
                return;
            }
        };
        let mapping = match parsed {
            serde_yaml::Value::Mapping(mapping) => mapping,
            serde_yaml::Value::Null => return,
            _ => {
                self.append(
                    SyntaxNode::error(literal(), "front matter must be a mapping")
                        .with_attr("block", "true"),
                );
                return;
            }
        };
        let mut fields = HashMap::new();
        for (key, value) in mapping {
            if let (Some(key), Some(value)) = (scalar_string(&key), yaml_to_string(&value)) {
                fields.insert(key, value);
            }
        }
        if let Some(root) = self.stack.first_mut() {
            for (key, value) in fields {
                root.attrs.insert(format!("{FRONT_MATTER_PREFIX}{key}"), value);
            }
        }
    }

    fn finish(mut self) -> SyntaxNode {
        while self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                tracing::debug!(kind = ?node.kind, "closing unterminated node");
                self.append(node.with_attr(ERROR, "unclosed"));
            }
        }
        self.stack
            .pop()
            .unwrap_or_else(|| SyntaxNode::new(NodeKind::Document))
    }
}

fn with_title(node: SyntaxNode, title: &str) -> SyntaxNode {
    if title.is_empty() {
        node
    } else {
        node.with_attr("title", title)
    }
}

/// Record the fence language and `key=value` pairs as `fence.<key>` attributes.
fn with_fence_info(node: SyntaxNode, info: &str) -> SyntaxNode {
    let mut parts = info.split_whitespace();
    let mut node = node.with_attr("info", info);
    if let Some(lang) = parts.next() {
        node = node.with_attr("lang", lang);
    }
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim_matches('"').trim_matches('\'');
            node = node.with_attr(&format!("fence.{key}"), value);
        }
    }
    node
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alert_name(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "note",
        BlockQuoteKind::Tip => "tip",
        BlockQuoteKind::Important => "important",
        BlockQuoteKind::Warning => "warning",
        BlockQuoteKind::Caution => "caution",
    }
}

fn alignment_name(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::None => "none",
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
    }
}

fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Sequence(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar_string).collect();
            Some(items.join(", "))
        }
        other => scalar_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_default(text: &str) -> SyntaxNode {
        parse(text, &ParseOptions::default())
    }

    #[test]
    fn test_parse_heading_and_paragraph() {
        let tree = parse_default("# Title {#intro}\n\nSome *text*.");
        assert_eq!(tree.children.len(), 2);
        let heading = &tree.children[0];
        assert_eq!(heading.kind, NodeKind::Heading);
        assert_eq!(heading.attr("level"), Some("1"));
        assert_eq!(heading.attr("id"), Some("intro"));
        assert_eq!(tree.children[1].text_content(), "Some text.");
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let tree = parse_default("see ![[Daily Note#^abc]] and ==this==");
        let paragraph = &tree.children[0];
        assert_eq!(paragraph.children.len(), 1);
        assert_eq!(
            paragraph.children[0].value(),
            "see ![[Daily Note#^abc]] and ==this=="
        );
    }

    #[test]
    fn test_code_block_keeps_source_and_fence_attrs() {
        let tree = parse_default("```rust title=main.rs\nfn main() {}\n```\n");
        let code = &tree.children[0];
        assert_eq!(code.kind, NodeKind::CodeBlock);
        assert_eq!(code.attr("lang"), Some("rust"));
        assert_eq!(code.attr("fence.title"), Some("main.rs"));
        assert_eq!(code.value(), "fn main() {}\n");
        assert!(code.children.is_empty());
    }

    #[test]
    fn test_alert_blockquote() {
        let tree = parse_default("> [!WARNING]\n> Careful.");
        let quote = &tree.children[0];
        assert_eq!(quote.kind, NodeKind::BlockQuote);
        assert_eq!(quote.attr("alert"), Some("warning"));
    }

    #[test]
    fn test_footnotes_and_math() {
        let tree = parse_default("Text[^1] and $x^2$.\n\n$$e=mc^2$$\n\n[^1]: A note.");
        assert_eq!(tree.count(NodeKind::FootnoteReference), 1);
        assert_eq!(tree.count(NodeKind::FootnoteDefinition), 1);
        assert_eq!(tree.count(NodeKind::InlineMath), 1);
        assert_eq!(tree.count(NodeKind::DisplayMath), 1);
    }

    #[test]
    fn test_table_alignment() {
        let tree = parse_default("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        let table = &tree.children[0];
        let head = &table.children[0];
        assert_eq!(head.children[0].attr("align"), Some("left"));
        assert_eq!(head.children[1].attr("align"), Some("right"));
        let row = &table.children[1];
        assert_eq!(row.children[1].attr("align"), Some("right"));
    }

    #[test]
    fn test_front_matter_is_flattened() {
        let tree = parse_default("---\ntitle: Hello\ntags: [a, b]\n---\n\nBody");
        assert_eq!(tree.attr("front_matter.title"), Some("Hello"));
        assert_eq!(tree.attr("front_matter.tags"), Some("a, b"));
        assert!(!tree.has_error());
    }

    #[test]
    fn test_invalid_front_matter_degrades() {
        let tree = parse_default("---\ntitle: [unclosed\n---\n\nBody");
        assert!(tree.has_error());
        let error = &tree.children[0];
        assert_eq!(error.kind, NodeKind::Error);
        assert!(error.value().contains("title: [unclosed"));
        assert_eq!(tree.children.last().unwrap().text_content(), "Body");
    }

    #[test]
    fn test_parse_is_deterministic_and_fresh() {
        let text = "# A\n\n- one\n- two\n";
        let first = parse_default(text);
        let second = parse_default(text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_options_disable_math() {
        let options = ParseOptions {
            math: false,
            ..ParseOptions::default()
        };
        let tree = parse("$x$", &options);
        assert_eq!(tree.count(NodeKind::InlineMath), 0);
        assert_eq!(tree.text_content(), "$x$");
    }
}
