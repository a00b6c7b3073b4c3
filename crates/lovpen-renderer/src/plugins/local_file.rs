//! Local file references.
//!
//! Relative image and embed sources are rewritten against an asset base URL
//! (the `base_url` setting, or the context's `asset_base_url` when set).
//! Relative `.md` links are resolved against the source document's directory
//! into clean absolute paths.

use crate::error::TransformError;
use crate::node::{NodeKind, Rewrite, SyntaxNode};
use crate::plugin::{
    ConfigField, MetaConfig, Phase, PluginConfig, TransformContext, TransformPlugin, config_str,
};

pub struct LocalFilePlugin;

const REMOTE_PREFIXES: &[&str] = &["http://", "https://", "//", "mailto:", "tel:", "data:"];

fn is_remote(url: &str) -> bool {
    REMOTE_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

/// Relative reference into the vault: no scheme, not rooted, not a fragment.
fn is_relative(url: &str) -> bool {
    !url.is_empty() && !url.starts_with(['#', '/']) && !is_remote(url)
}

/// Prefix a relative asset path with `base`.
fn with_base(url: &str, base: &str) -> String {
    let path = url.trim_start_matches("./");
    format!("{}/{path}", base.trim_end_matches('/'))
}

/// Split a link to another note into its path without `.md` and its
/// fragment. Anything else yields `None`.
fn note_parts(href: &str) -> Option<(&str, Option<&str>)> {
    if is_remote(href) {
        return None;
    }
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };
    Some((path.strip_suffix(".md")?, fragment))
}

/// Vault route of a note link written in a document under `doc_dir`.
///
/// `index` names its directory and `..` stops at the vault root, so
/// `../guide/index.md#setup` from `notes/daily` routes to `/notes/guide#setup`.
fn note_route(stem: &str, fragment: Option<&str>, doc_dir: &str) -> String {
    let (mut segments, relative) = match stem.strip_prefix('/') {
        Some(rooted) => (Vec::new(), rooted),
        None => (
            doc_dir.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>(),
            stem,
        ),
    };
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    if segments.last() == Some(&"index") {
        segments.pop();
    }

    let mut route = format!("/{}", segments.join("/"));
    if let Some(fragment) = fragment {
        route.push('#');
        route.push_str(fragment);
    }
    route
}

/// Directory of a document path (`notes/a/b.md` is in `notes/a`).
fn document_dir(source_path: &str) -> &str {
    source_path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

impl TransformPlugin for LocalFilePlugin {
    fn name(&self) -> &str {
        "local-file"
    }

    fn phase(&self) -> Phase {
        Phase::Render
    }

    fn description(&self) -> &str {
        "Rewrites local image, embed and note links"
    }

    fn meta_config(&self) -> MetaConfig {
        let mut meta = MetaConfig::new();
        meta.insert(
            "base_url".to_owned(),
            ConfigField::input("Asset base URL", "")
                .with_description("Prefix for relative image and attachment paths"),
        );
        meta
    }

    fn priority(&self) -> i32 {
        // Links must be resolved before the link plugin classifies them.
        -10
    }

    fn transform(
        &self,
        node: &SyntaxNode,
        config: &PluginConfig,
        ctx: &TransformContext,
    ) -> Result<SyntaxNode, TransformError> {
        let base = ctx
            .asset_base_url
            .as_deref()
            .unwrap_or_else(|| config_str(config, "base_url", ""))
            .trim();
        let doc_dir = ctx.source_path.as_deref().map(document_dir);
        Ok(node.rewrite(&mut |child| match child.kind {
            NodeKind::Image => {
                let src = child.attr("src").unwrap_or_default();
                if base.is_empty() || !is_relative(src) {
                    return Rewrite::Keep;
                }
                Rewrite::Replace(child.clone().with_attr("src", with_base(src, base)))
            }
            NodeKind::Link => {
                let href = child.attr("href").unwrap_or_default();
                let rewritten = match (note_parts(href), doc_dir) {
                    (Some((stem, fragment)), Some(dir)) => Some(note_route(stem, fragment, dir)),
                    (Some(_), None) => None,
                    (None, _) if !base.is_empty() && is_relative(href) => Some(with_base(href, base)),
                    (None, _) => None,
                };
                match rewritten {
                    Some(url) if url != href => Rewrite::Replace(child.clone().with_attr("href", url)),
                    _ => Rewrite::Keep,
                }
            }
            _ => Rewrite::Keep,
        }))
    }
}
