//! Syntax tree produced by the parser and rewritten by plugins.
//!
//! A [`SyntaxNode`] owns its children outright. Trees are never shared and
//! never mutated once handed to a plugin: every transform builds a new tree
//! (usually via [`SyntaxNode::rewrite`]) and returns it.

use std::collections::BTreeMap;

/// Attribute key holding literal content (text, code, math source, raw HTML).
pub const VALUE: &str = "value";

/// Attribute key marking a node that was produced by error recovery.
pub const ERROR: &str = "error";

/// Kind tag of a [`SyntaxNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    HtmlBlock,
    List,
    Item,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Rule,
    DefinitionList,
    DefinitionTitle,
    DefinitionDetail,
    FootnoteDefinition,
    FootnoteSection,
    DisplayMath,
    Text,
    Code,
    Html,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link,
    Image,
    SoftBreak,
    HardBreak,
    TaskMarker,
    FootnoteReference,
    InlineMath,
    /// Block-level admonition built by the callout plugin.
    Callout,
    /// Transclusion of another note or block (`![[target]]`).
    Embed,
    /// Highlighted text span (`==text==`).
    Mark,
    /// Named icon, resolved to inline SVG by the icon plugin.
    Icon,
    /// Arbitrary HTML element; the tag name lives in the `tag` attribute.
    Element,
    /// Pre-rendered HTML emitted verbatim.
    Raw,
    /// Literal content that could not be interpreted.
    Error,
}

impl NodeKind {
    /// Whether nodes of this kind only carry a literal `value` and never children.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Code
                | Self::Html
                | Self::Raw
                | Self::SoftBreak
                | Self::HardBreak
                | Self::Rule
                | Self::TaskMarker
                | Self::FootnoteReference
                | Self::InlineMath
                | Self::DisplayMath
                | Self::CodeBlock
                | Self::Icon
        )
    }
}

/// Result of inspecting one node during [`SyntaxNode::rewrite`].
#[derive(Debug)]
pub enum Rewrite {
    /// Keep the node and keep descending into its children.
    Keep,
    /// Replace the node; the replacement is not visited again.
    Replace(SyntaxNode),
    /// Replace the node with zero or more siblings.
    Splice(Vec<SyntaxNode>),
}

/// Typed tree node: a kind tag, string attributes and ordered children.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntaxNode {
    pub kind: NodeKind,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "BTreeMap::is_empty")
    )]
    pub attrs: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Text leaf.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text).with_attr(VALUE, value)
    }

    /// Verbatim HTML leaf.
    #[must_use]
    pub fn raw(html: impl Into<String>) -> Self {
        Self::new(NodeKind::Raw).with_attr(VALUE, html)
    }

    /// Generic element with the given tag.
    #[must_use]
    pub fn element(tag: &str) -> Self {
        Self::new(NodeKind::Element).with_attr("tag", tag)
    }

    /// Literal content that failed to parse, annotated with `message`.
    #[must_use]
    pub fn error(literal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NodeKind::Error)
            .with_attr(VALUE, literal)
            .with_attr(ERROR, message)
    }

    #[must_use]
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: SyntaxNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = SyntaxNode>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Literal content of a leaf node (empty for containers).
    #[must_use]
    pub fn value(&self) -> &str {
        self.attr(VALUE).unwrap_or_default()
    }

    #[must_use]
    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }

    /// Whether this node or any descendant carries an error marker.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.attrs.contains_key(ERROR) || self.children.iter().any(SyntaxNode::has_error)
    }

    /// Concatenated plain text of this subtree.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind {
            NodeKind::Text | NodeKind::Code | NodeKind::InlineMath | NodeKind::Error => {
                out.push_str(self.value());
            }
            NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Visit every node in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SyntaxNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Count nodes of `kind` in this subtree.
    #[must_use]
    pub fn count(&self, kind: NodeKind) -> usize {
        let mut n = 0;
        self.walk(&mut |node| {
            if node.kind == kind {
                n += 1;
            }
        });
        n
    }

    /// Build a new tree by consulting `f` for every descendant, top-down.
    ///
    /// The receiver itself is always kept; only descendants can be replaced.
    #[must_use]
    pub fn rewrite<F>(&self, f: &mut F) -> SyntaxNode
    where
        F: FnMut(&SyntaxNode) -> Rewrite,
    {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            match f(child) {
                Rewrite::Keep => children.push(child.rewrite(f)),
                Rewrite::Replace(node) => children.push(node),
                Rewrite::Splice(nodes) => children.extend(nodes),
            }
        }
        SyntaxNode {
            kind: self.kind,
            attrs: self.attrs.clone(),
            children,
        }
    }

    /// Fallible variant of [`rewrite`](Self::rewrite); stops at the first error.
    pub fn try_rewrite<F, E>(&self, f: &mut F) -> Result<SyntaxNode, E>
    where
        F: FnMut(&SyntaxNode) -> Result<Rewrite, E>,
    {
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            match f(child)? {
                Rewrite::Keep => children.push(child.try_rewrite(f)?),
                Rewrite::Replace(node) => children.push(node),
                Rewrite::Splice(nodes) => children.extend(nodes),
            }
        }
        Ok(SyntaxNode {
            kind: self.kind,
            attrs: self.attrs.clone(),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> SyntaxNode {
        SyntaxNode::new(NodeKind::Document).with_child(
            SyntaxNode::new(NodeKind::Paragraph)
                .with_child(SyntaxNode::text("hello "))
                .with_child(SyntaxNode::new(NodeKind::Strong).with_child(SyntaxNode::text("world"))),
        )
    }

    #[test]
    fn test_text_content() {
        assert_eq!(sample().text_content(), "hello world");
    }

    #[test]
    fn test_rewrite_keep_is_identity() {
        let tree = sample();
        assert_eq!(tree.rewrite(&mut |_| Rewrite::Keep), tree);
    }

    #[test]
    fn test_rewrite_replace_and_splice() {
        let tree = sample();
        let out = tree.rewrite(&mut |node| match node.kind {
            NodeKind::Strong => Rewrite::Replace(SyntaxNode::text("WORLD")),
            NodeKind::Text if node.value() == "hello " => Rewrite::Splice(vec![]),
            _ => Rewrite::Keep,
        });
        assert_eq!(out.text_content(), "WORLD");
        assert_eq!(out.children[0].children.len(), 1);
        // Source tree is untouched.
        assert_eq!(tree.text_content(), "hello world");
    }

    #[test]
    fn test_try_rewrite_propagates_error() {
        let result: Result<SyntaxNode, &str> = sample().try_rewrite(&mut |node| {
            if node.is(NodeKind::Strong) {
                Err("boom")
            } else {
                Ok(Rewrite::Keep)
            }
        });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_has_error_and_count() {
        let tree = sample().with_child(SyntaxNode::error("---", "bad yaml"));
        assert!(tree.has_error());
        assert_eq!(tree.count(NodeKind::Text), 2);
        assert!(!sample().has_error());
    }
}
