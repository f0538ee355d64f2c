//! `herald plugins` -- list registered plugins.

use comfy_table::{Table, presets};

use herald_core::BasicParser;
use herald_core::plugins::PluginRegistry;
use herald_types::config::Config;

/// Print the registered plugins as a table.
pub fn plugins_list(config: &Config) -> anyhow::Result<()> {
    let registry = super::build_registry(&BasicParser::new(), config)?;
    println!("{}", render_table(&registry, config.plugins.default_plugin.as_deref()));
    println!();
    println!("Total: {} plugin(s)", registry.len());
    Ok(())
}

fn render_table(registry: &PluginRegistry, default_plugin: Option<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(["NAME", "ARGUMENTS", "DESCRIPTION"]);

    for plugin in registry.iter() {
        let mut name = plugin.name().to_string();
        if default_plugin.is_some_and(|d| d.eq_ignore_ascii_case(plugin.name())) {
            name.push_str(" (default)");
        }
        let arguments: Vec<&str> = plugin.arguments().iter().map(|a| a.name()).collect();
        table.add_row([name, arguments.join(", "), plugin.description().to_string()]);
    }
    table
}
