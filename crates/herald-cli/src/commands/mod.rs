//! CLI command implementations for `herald`.
//!
//! - [`repl`] -- interactive session on stdin.
//! - [`config_cmd`] -- resolved configuration display.
//! - [`plugins_cmd`] -- plugin listing.

pub mod config_cmd;
pub mod plugins_cmd;
pub mod repl;

use std::path::Path;

use herald_core::plugins::PluginRegistry;
use herald_core::stores::Parser;
use herald_types::config::Config;

/// Load configuration from the given path override or via auto-discovery.
///
/// Discovery: `HERALD_CONFIG`, then `~/.herald/config.json`, then the
/// built-in defaults. The loaded config is validated.
pub fn load_config(config_override: Option<&str>) -> anyhow::Result<Config> {
    herald_core::config_loader::load_config(config_override.map(Path::new))
        .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))
}

/// The plugin set the CLI runs with, matched against commands parsed by
/// `parser`.
pub fn build_registry(parser: &dyn Parser, config: &Config) -> anyhow::Result<PluginRegistry> {
    Ok(PluginRegistry::with_builtins(parser, &config.plugins)?)
}
