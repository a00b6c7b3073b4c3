//! `lovpen resources` command implementation.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use lovpen_config::Config;
use lovpen_resources::{ResourceKind, ResourceOption};

use crate::error::CliError;
use crate::output::Output;
use crate::session::Session;

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum KindArg {
    Themes,
    Highlights,
    Templates,
}

impl From<KindArg> for ResourceKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Themes => ResourceKind::Theme,
            KindArg::Highlights => ResourceKind::Highlight,
            KindArg::Templates => ResourceKind::Template,
        }
    }
}

/// Arguments for the resources command.
#[derive(Args)]
pub(crate) struct ResourcesArgs {
    /// Category to list (default: all).
    #[arg(value_enum)]
    kind: Option<KindArg>,

    /// Print options as JSON.
    #[arg(long)]
    json: bool,

    /// Path to configuration file (default: auto-discover lovpen.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ResourcesArgs {
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let session = Session::open(config, &output).await?;

        let kinds = match self.kind {
            Some(kind) => vec![ResourceKind::from(kind)],
            None => ResourceKind::ALL.to_vec(),
        };

        let mut listing = serde_json::Map::new();
        for kind in kinds {
            let options = session.catalog.load(kind).await;
            let selected = selected(&session, kind);
            if self.json {
                listing.insert(kind.to_string(), serde_json::to_value(&options)?);
                continue;
            }
            output.heading(&format!("{kind}s"));
            for option in &options {
                output.row(&option.identifier, &describe(option, selected));
            }
        }
        if self.json {
            output.document(&serde_json::to_string_pretty(&listing)?)?;
        }
        Ok(())
    }
}

/// Identifier configured for `kind`.
fn selected(session: &Session, kind: ResourceKind) -> &str {
    let render = &session.config.render;
    match kind {
        ResourceKind::Theme => &render.theme,
        ResourceKind::Highlight => &render.highlight,
        ResourceKind::Template => &render.template,
    }
}

fn describe(option: &ResourceOption, selected: &str) -> String {
    let mut line = option.name.clone();
    if let Some(description) = option.description.as_deref().or(option.url.as_deref()) {
        line.push_str(" - ");
        line.push_str(description);
    }
    if let Some(author) = &option.author {
        line.push_str(&format!(" ({author})"));
    }
    if option.identifier == selected {
        line.push_str(" *");
    }
    line
}
