//! `herald` -- CLI binary for the herald assistant.
//!
//! Provides the following subcommands:
//!
//! - `herald repl` -- Open a session and type commands interactively.
//! - `herald config show` -- Show the resolved configuration.
//! - `herald plugins` -- List the registered plugins.

use clap::{Parser, Subcommand};

mod commands;

/// herald assistant CLI.
#[derive(Parser)]
#[command(name = "herald", about = "herald assistant CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Open a session and dispatch commands typed on stdin.
    Repl(commands::repl::ReplArgs),

    /// Show resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },

    /// List registered plugins and the arguments they declare.
    Plugins {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Subcommands for `herald config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the full resolved configuration.
    Show {
        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show a specific configuration section.
    Section {
        /// Section name (e.g., "sessions", "plugins", "keys").
        name: String,

        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Repl(args) => commands::repl::run(args).await?,
        Commands::Config { action } => match action {
            ConfigCmd::Show { config } => {
                let cfg = commands::load_config(config.as_deref())?;
                commands::config_cmd::config_show(&cfg);
            }
            ConfigCmd::Section { name, config } => {
                let cfg = commands::load_config(config.as_deref())?;
                commands::config_cmd::config_section(&cfg, &name)?;
            }
        },
        Commands::Plugins { config } => {
            let cfg = commands::load_config(config.as_deref())?;
            commands::plugins_cmd::plugins_list(&cfg)?;
        }
    }

    Ok(())
}
