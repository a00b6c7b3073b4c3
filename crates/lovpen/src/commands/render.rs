//! `lovpen render` command implementation.

use std::path::PathBuf;

use clap::Args;
use lovpen_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;
use crate::session::Session;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render (`-` reads stdin).
    input: PathBuf,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Theme identifier (overrides config).
    #[arg(long)]
    theme: Option<String>,

    /// Code highlight style (overrides config).
    #[arg(long)]
    highlight: Option<String>,

    /// Template identifier, `none` to disable (overrides config).
    #[arg(long)]
    template: Option<String>,

    /// Prefix for relative images and links (overrides config).
    #[arg(long, env = "LOVPEN_ASSET_BASE_URL")]
    asset_base_url: Option<String>,

    /// Disable the local config cache.
    #[arg(long)]
    no_cache: bool,

    /// Path to configuration file (default: auto-discover lovpen.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RenderArgs {
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            theme: self.theme,
            highlight: self.highlight,
            template: self.template,
            asset_base_url: self.asset_base_url,
            cache_enabled: self.no_cache.then_some(false),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let session = Session::open(config, &output).await?;

        let from_stdin = self.input.as_os_str() == "-";
        let text = if from_stdin {
            tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
                .await
                .map_err(|e| CliError::Validation(format!("reading stdin: {e}")))??
        } else {
            tokio::fs::read_to_string(&self.input).await?
        };

        let source_path = (!from_stdin).then(|| self.input.to_string_lossy().into_owned());
        let request = session.request(source_path.as_deref()).await;
        let rendered = session.pipeline.render(&text, &request);

        for warning in &rendered.warnings {
            output.warning(&format!("Warning: {warning}"));
        }
        tracing::info!(
            applied = ?rendered.applied,
            theme = %rendered.theme,
            highlight = %rendered.highlight,
            "rendered"
        );

        match self.output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, &rendered.html).await?;
                let title = rendered.title.as_deref().unwrap_or("untitled");
                output.success(&format!("Rendered '{title}' to {}", path.display()));
            }
            None => output.document(&rendered.html)?,
        }
        Ok(())
    }
}
