//! TeX math for client-side typesetting (KaTeX or MathJax).
//!
//! Inline math becomes `<span class="math math-inline">\(...\)</span>`; a
//! paragraph holding a single display formula becomes a block
//! `<div class="math math-display">\[...\]</div>`. Disabled by default.

use crate::error::TransformError;
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_bool,
    config_str,
};

pub struct MathPlugin;

fn inline_math(source: &str, engine: &str) -> SyntaxNode {
    SyntaxNode::element("span")
        .with_attr("class", "math math-inline")
        .with_attr("data-engine", engine)
        .with_child(SyntaxNode::text(format!("\\({source}\\)")))
}

fn display_math(source: &str, engine: &str, tag: &str, number: Option<usize>) -> SyntaxNode {
    let mut node = SyntaxNode::element(tag)
        .with_attr("class", "math math-display")
        .with_attr("data-engine", engine)
        .with_child(SyntaxNode::text(format!("\\[{source}\\]")));
    if let Some(n) = number {
        node = node.with_attr("data-equation", n.to_string()).with_child(
            SyntaxNode::element("span")
                .with_attr("class", "math-number")
                .with_child(SyntaxNode::text(format!("({n})"))),
        );
    }
    node
}

/// The display formula of a paragraph that holds nothing else.
fn lone_display(paragraph: &SyntaxNode) -> Option<&SyntaxNode> {
    let mut found = None;
    for child in &paragraph.children {
        match child.kind {
            NodeKind::DisplayMath if found.is_none() => found = Some(child),
            NodeKind::SoftBreak | NodeKind::HardBreak => {}
            NodeKind::Text if child.value().trim().is_empty() => {}
            _ => return None,
        }
    }
    found
}

impl TransformPlugin for MathPlugin {
    fn name(&self) -> &str {
        "math"
    }

    fn phase(&self) -> Phase {
        Phase::Structural
    }

    fn description(&self) -> &str {
        "Inline ($...$) and display ($$...$$) math"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "engine".to_owned(),
            ConfigField::select("Engine", &[("katex", "KaTeX"), ("mathjax", "MathJax")], "katex"),
        );
        meta.insert(
            "display_numbering".to_owned(),
            ConfigField::switch("Number display equations", false),
        );
        meta
    }

    fn default_enabled(&self) -> bool {
        false
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let engine = config_str(config, "engine", "katex");
        let numbering = config_bool(config, "display_numbering", false);
        let mut equations = 0;
        let mut next_number = || {
            equations += 1;
            numbering.then_some(equations)
        };
        Ok(node.rewrite(&mut |child| match child.kind {
            NodeKind::Paragraph => match lone_display(child) {
                Some(math) => {
                    Rewrite::Replace(display_math(math.value(), engine, "div", next_number()))
                }
                None => Rewrite::Keep,
            },
            NodeKind::InlineMath => Rewrite::Replace(inline_math(child.value(), engine)),
            NodeKind::DisplayMath => Rewrite::Replace(display_math(
                child.value(),
                engine,
                "span",
                next_number(),
            )),
            _ => Rewrite::Keep,
        }))
    }
}
