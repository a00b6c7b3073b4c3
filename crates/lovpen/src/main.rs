//! Lovpen CLI - plugin-based markdown renderer.
//!
//! Provides commands for:
//! - `render`: Render a markdown file to styled HTML
//! - `plugins`: List, toggle and configure transform plugins
//! - `resources`: List available themes, highlight styles and templates

mod commands;
mod error;
mod output;
mod session;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PluginsCommand, RenderArgs, ResourcesArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lovpen - markdown to platform-ready HTML.
#[derive(Parser)]
#[command(name = "lovpen", version, about)]
struct Cli {
    /// Enable verbose output (plugin and persistence logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to HTML.
    Render(RenderArgs),
    /// Plugin management commands.
    #[command(subcommand)]
    Plugins(PluginsCommand),
    /// List themes, highlight styles or templates.
    Resources(ResourcesArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // RUST_LOG applies unless --verbose asks for INFO.
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::runtime::Runtime::new()
        .map_err(CliError::from)
        .and_then(|rt| {
            rt.block_on(async {
                match cli.command {
                    Commands::Render(args) => args.execute().await,
                    Commands::Plugins(cmd) => cmd.execute().await,
                    Commands::Resources(args) => args.execute().await,
                }
            })
        });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
