//! Configuration file discovery and loading.
//!
//! Discovery order:
//! 1. `HERALD_CONFIG` environment variable.
//! 2. `~/.herald/config.json`
//! 3. Nothing found: built-in defaults.
//!
//! Keys are normalised from camelCase to snake_case before deserializing,
//! and the result is validated. Any failure here is fatal to start-up.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use herald_types::config::Config;
use herald_types::{HeraldError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "HERALD_CONFIG";

/// Pick the config file to load, if any.
///
/// `env_path` is the value of [`CONFIG_ENV`]; it wins even if the file is
/// missing, so a typo surfaces as an error instead of silent defaults.
pub fn discover_config_path(env_path: Option<String>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = env_path.filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    let candidate = home_dir?.join(".herald").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Load the configuration from `override_path`, or by discovery.
pub fn load_config(override_path: Option<&Path>) -> Result<Config> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_path(std::env::var(CONFIG_ENV).ok(), dirs::home_dir()),
    };

    let raw = match path {
        Some(path) => read_config_file(&path)?,
        None => {
            info!("no config file found, using defaults");
            Value::Object(serde_json::Map::new())
        }
    };

    let config: Config = serde_json::from_value(raw)?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(HeraldError::ConfigInvalid {
            reason: format!("config file not found: {}", path.display()),
        });
    }
    debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| HeraldError::ConfigInvalid {
        reason: format!("failed to parse {}: {e}", path.display()),
    })?;
    Ok(normalize_keys(value))
}

/// Convert camelCase object keys to snake_case, recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, val)| (camel_to_snake(&key), normalize_keys(val)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// `camelCase` to `snake_case`. Acronym runs stay together
/// (`HTMLParser` → `html_parser`).
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_to_snake("inactivityTimeoutSecs"), "inactivity_timeout_secs");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
        assert_eq!(camel_to_snake("HTMLParser"), "html_parser");
        assert_eq!(camel_to_snake(""), "");
    }

    #[test]
    fn normalize_nested() {
        let input = json!({"sessions": {"responseWindowSecs": 60}, "list": [{"pollSecs": 1}]});
        let expected = json!({"sessions": {"response_window_secs": 60}, "list": [{"poll_secs": 1}]});
        assert_eq!(normalize_keys(input), expected);
    }

    #[test]
    fn env_var_wins() {
        let path = discover_config_path(Some("/etc/herald.json".into()), Some("/home/ada".into()));
        assert_eq!(path, Some(PathBuf::from("/etc/herald.json")));
    }

    #[test]
    fn missing_home_file_means_defaults() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(discover_config_path(None, Some(home.path().to_path_buf())), None);
        assert_eq!(discover_config_path(None, None), None);
    }

    #[test]
    fn home_file_is_found() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join(".herald");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();
        assert_eq!(
            discover_config_path(None, Some(home.path().to_path_buf())),
            Some(dir.join("config.json"))
        );
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"sessions": {"inactivityTimeoutSecs": 120}, "plugins": {"defaultPlugin": "echo"}}"#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.sessions.inactivity_timeout_secs, 120);
        assert_eq!(config.plugins.default_plugin.as_deref(), Some("echo"));
    }

    #[test]
    fn invalid_files_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(missing.is_fatal());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(load_config(Some(&bad)).unwrap_err().is_fatal());

        let zero = dir.path().join("zero.json");
        std::fs::write(&zero, r#"{"manager": {"statePollSecs": 0}}"#).unwrap();
        assert!(load_config(Some(&zero)).unwrap_err().is_fatal());
    }
}
