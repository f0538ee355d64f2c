//! Plugin registry.
//!
//! Plugins are registered once during start-up and the registry is then
//! shared read-only behind an `Arc`. Registration order is kept: it is the
//! order candidates are offered in when a command is ambiguous.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use herald_plugin::{Command, Plugin};
use herald_types::config::PluginsConfig;
use herald_types::{HeraldError, Result};

use super::builtin::EchoPlugin;
use crate::stores::Parser;

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugins. Phrase matchers are parsed
    /// with `parser` and use `config.similarity_threshold`.
    pub fn with_builtins(parser: &dyn Parser, config: &PluginsConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(EchoPlugin::new(parser, config)))?;
        Ok(registry)
    }

    /// Register a plugin. Names are unique, compared case-insensitively.
    ///
    /// A duplicate is a configuration error; callers abort start-up.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let key = plugin.name().to_lowercase();
        if self.index.contains_key(&key) {
            return Err(HeraldError::DuplicatePlugin {
                name: plugin.name().to_string(),
            });
        }
        debug!(plugin = %plugin.name(), "registering plugin");
        self.index.insert(key, self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| Arc::clone(&self.plugins[i]))
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Every plugin whose `check()` accepts `command`, in registration
    /// order. A panicking `check()` counts as no match.
    pub fn candidates(&self, command: &Command) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .filter(|plugin| match catch_unwind(AssertUnwindSafe(|| plugin.check(command))) {
                Ok(matched) => matched,
                Err(_) => {
                    warn!(plugin = %plugin.name(), command = %command.uid, "check() panicked");
                    false
                }
            })
            .cloned()
            .collect()
    }
}
