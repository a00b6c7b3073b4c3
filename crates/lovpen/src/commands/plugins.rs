//! `lovpen plugins` subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use lovpen_config::Config;
use lovpen_renderer::Phase;
use lovpen_store::{PendingSave, SaveStatus, SettingsSurface};

use crate::error::CliError;
use crate::output::Output;
use crate::session::{Session, config_json, parse_assignment};

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum PhaseArg {
    Structural,
    Render,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Structural => Phase::Structural,
            PhaseArg::Render => Phase::Render,
        }
    }
}

/// Options shared by every plugins subcommand.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover lovpen.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Plugin management commands.
#[derive(Subcommand)]
pub(crate) enum PluginsCommand {
    /// List plugins in execution order.
    List {
        /// Only show plugins of this phase.
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
        /// Print descriptors as JSON.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Enable a plugin and save the setting.
    Enable {
        name: String,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Disable a plugin and save the setting.
    Disable {
        name: String,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Change config values (`key=value`) and save them.
    Set {
        name: String,
        #[arg(required = true)]
        values: Vec<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Show the saved settings of a plugin.
    Show {
        name: String,
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl PluginsCommand {
    fn common(&self) -> &CommonArgs {
        match self {
            Self::List { common, .. }
            | Self::Enable { common, .. }
            | Self::Disable { common, .. }
            | Self::Set { common, .. }
            | Self::Show { common, .. } => common,
        }
    }

    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.common().config.as_deref(), None)?;
        let session = Session::open(config, &output).await?;
        let settings = &session.settings;

        match self {
            Self::List { phase, json, .. } => {
                let plugins = settings.list_plugins(phase.map(Phase::from));
                if json {
                    output.document(&serde_json::to_string_pretty(&plugins)?)?;
                    return Ok(());
                }
                let mut current = None;
                for plugin in &plugins {
                    if current != Some(plugin.phase) {
                        output.heading(&format!("{} phase", plugin.phase));
                        current = Some(plugin.phase);
                    }
                    let state = if plugin.enabled { "on " } else { "off" };
                    output.row(
                        &plugin.name,
                        &format!("[{state}] {} {}", plugin.description, config_json(&plugin.config)),
                    );
                }
            }
            Self::Enable { name, .. } => {
                finish(&output, settings, &name, settings.on_toggle(&name, true)?).await?;
            }
            Self::Disable { name, .. } => {
                finish(&output, settings, &name, settings.on_toggle(&name, false)?).await?;
            }
            Self::Set { name, values, .. } => {
                let manager = settings.store().manager();
                let (Some(mut config), Some(meta)) = (manager.config(&name), manager.meta_config(&name)) else {
                    return Err(CliError::Validation(format!("unknown plugin '{name}'")));
                };
                for raw in &values {
                    let (key, value) = parse_assignment(raw)?;
                    if !meta.contains_key(&key) {
                        return Err(CliError::Validation(format!(
                            "plugin '{name}' has no setting '{key}'"
                        )));
                    }
                    config.insert(key, value);
                }
                let pending = settings.store().save(&name, &config, meta)?;
                finish(&output, settings, &name, pending).await?;
            }
            Self::Show { name, .. } => match settings.get_plugin_config(&name).await? {
                Some(record) => output.document(&serde_json::to_string_pretty(&record)?)?,
                None => output.info(&format!("No saved settings for '{name}'")),
            },
        }
        Ok(())
    }
}

async fn finish(
    output: &Output,
    settings: &SettingsSurface,
    name: &str,
    pending: PendingSave,
) -> Result<(), CliError> {
    let report = pending.wait().await?;
    match settings.save_status(name) {
        SaveStatus::Saved => {
            output.success(&format!("Saved '{name}' (version {})", report.version));
            Ok(())
        }
        SaveStatus::Error(message) if report.outcomes.iter().any(|(_, r)| r.is_ok()) => {
            output.warning(&format!("Saved '{name}' to some tiers only: {message}"));
            Ok(())
        }
        SaveStatus::Error(_) => report.into_result().map_err(CliError::from),
        SaveStatus::Idle | SaveStatus::Saving => Ok(()),
    }
}
