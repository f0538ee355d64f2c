//! `herald config` -- display resolved configuration.
//!
//! ```text
//! herald config show
//! herald config section sessions
//! ```

use herald_types::config::Config;

/// Display the resolved configuration as formatted JSON.
pub fn config_show(config: &Config) {
    match serde_json::to_string_pretty(config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize config: {e}"),
    }
}

/// Display one configuration section.
pub fn config_section(config: &Config, section: &str) -> anyhow::Result<()> {
    let value = serde_json::to_value(config)?;
    match value.get(section) {
        Some(v) => {
            println!("{}", serde_json::to_string_pretty(v)?);
            Ok(())
        }
        None => {
            let available: Vec<&str> = value
                .as_object()
                .map(|m| m.keys().map(|k| k.as_str()).collect())
                .unwrap_or_default();
            anyhow::bail!(
                "unknown section '{section}'\navailable sections: {}",
                available.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_section_valid() {
        assert!(config_section(&Config::default(), "sessions").is_ok());
    }

    #[test]
    fn config_section_invalid() {
        let err = config_section(&Config::default(), "nonexistent").unwrap_err();
        assert!(err.to_string().contains("available sections"));
    }
}
