//! Code block markup for highlight.js themes.
//!
//! Fenced code blocks become `<pre class="hljs"><code class="hljs language-x">`
//! The highlight style itself comes from the enclosing section's
//! `data-highlight`, chosen from the resource catalog. With line numbers on,
//! every source line is wrapped in `<span class="line" data-line="n">`. A
//! `title="..."` fence attribute adds a caption above the block.

use crate::error::TransformError;
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_bool,
};

pub struct CodeHighlightPlugin;

fn code_lines(source: &str, numbered: bool) -> Vec<SyntaxNode> {
    if !numbered {
        return vec![SyntaxNode::text(source)];
    }
    let mut out = Vec::new();
    for (i, line) in source.lines().enumerate() {
        if i > 0 {
            out.push(SyntaxNode::text("\n"));
        }
        out.push(
            SyntaxNode::element("span")
                .with_attr("class", "line")
                .with_attr("data-line", (i + 1).to_string())
                .with_child(SyntaxNode::text(line)),
        );
    }
    out
}

fn highlight(block: &SyntaxNode, numbered: bool) -> Vec<SyntaxNode> {
    let class = match block.attr("lang") {
        Some(lang) => format!("hljs language-{lang}"),
        None => "hljs".to_owned(),
    };
    let mut pre = SyntaxNode::element("pre").with_attr("class", "hljs");
    if numbered {
        pre = pre.with_attr("data-line-numbers", "true");
    }
    let pre = pre.with_child(
        SyntaxNode::element("code")
            .with_attr("class", class)
            .with_children(code_lines(block.value(), numbered)),
    );
    match block.attr("fence.title") {
        Some(title) => vec![
            SyntaxNode::element("div")
                .with_attr("class", "code-title")
                .with_child(SyntaxNode::text(title)),
            pre,
        ],
        None => vec![pre],
    }
}

impl TransformPlugin for CodeHighlightPlugin {
    fn name(&self) -> &str {
        "code-highlight"
    }

    fn phase(&self) -> Phase {
        Phase::Render
    }

    fn description(&self) -> &str {
        "Code block markup for syntax highlighting themes"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "line_numbers".to_owned(),
            ConfigField::switch("Line numbers", false),
        );
        meta
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        _ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let numbered = config_bool(config, "line_numbers", false);
        Ok(node.rewrite(&mut |child| {
            if child.is(NodeKind::CodeBlock) {
                Rewrite::Splice(highlight(child, numbered))
            } else {
                Rewrite::Keep
            }
        }))
    }
}
