//! Shared fixtures for herald-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use herald_core::memory::{MemoryIdentityStore, MemoryKeyStore};
use herald_core::plugins::EchoPlugin;
use herald_core::{BasicParser, PluginRegistry, SessionContext, SessionManager};
use herald_plugin::{ArgumentKind, Command, Plugin, PluginError, PluginOutput, ResolvedArgs};
use herald_types::config::Config;
use herald_types::records::{ApiKey, ClientRecord, UserRecord};

/// Build a `Vec<Arc<dyn Plugin>>` from `Arc`s of concrete plugins.
macro_rules! plugins {
    ($($plugin:expr),* $(,)?) => {
        vec![$(::std::sync::Arc::clone(&$plugin) as ::std::sync::Arc<dyn ::herald_plugin::Plugin>),*]
    };
}

/// What a [`Recorder`] does when invoked.
#[derive(Clone)]
pub enum Behaviour {
    Succeed,
    Prompt,
    Fail,
    Panic,
    Sleep(Duration),
    Report,
    EmptyId,
}

/// A plugin that counts its invocations.
pub struct Recorder {
    name: String,
    matcher: Box<dyn Fn(&Command) -> bool + Send + Sync>,
    arguments: Vec<ArgumentKind>,
    behaviour: Behaviour,
    pub exec_calls: AtomicUsize,
    pub response_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub last_text: Mutex<Option<String>>,
}

impl Recorder {
    pub fn new(
        name: &str,
        matcher: impl Fn(&Command) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            matcher: Box::new(matcher),
            arguments: vec![ArgumentKind::CommandText],
            behaviour: Behaviour::Succeed,
            exec_calls: AtomicUsize::new(0),
            response_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_text: Mutex::new(None),
        }
    }

    /// Matches when `word` appears as a whitespace-separated word.
    pub fn word(name: &str, word: &'static str) -> Self {
        Self::new(name, move |c: &Command| {
            c.text.split_whitespace().any(|w| w.eq_ignore_ascii_case(word))
        })
    }

    pub fn never(name: &str) -> Self {
        Self::new(name, |_| false)
    }

    pub fn with_arguments(mut self, arguments: &[ArgumentKind]) -> Self {
        self.arguments = arguments.to_vec();
        self
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn execs(&self) -> usize {
        self.exec_calls.load(Ordering::SeqCst)
    }

    pub fn replies(&self) -> usize {
        self.response_calls.load(Ordering::SeqCst)
    }

    async fn run(&self, args: &ResolvedArgs) -> Result<PluginOutput, PluginError> {
        if let Ok(text) = args.text(ArgumentKind::CommandText) {
            *self.last_text.lock() = Some(text.to_string());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = match &self.behaviour {
            Behaviour::Succeed => Ok(PluginOutput::success(
                format!("{}_OK", self.name.to_uppercase()),
                self.name.clone(),
            )),
            Behaviour::Prompt => Ok(PluginOutput::prompt(
                format!("{}_ASK", self.name.to_uppercase()),
                "tell me more",
            )),
            Behaviour::Fail => Err(PluginError::ExecutionFailed("upstream returned 502".into())),
            Behaviour::Panic => panic!("plugin bug"),
            Behaviour::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok(PluginOutput::success("SLEPT", ""))
            }
            Behaviour::Report => Err(PluginError::reported("NOTHING_FOUND", "no results", 404)),
            Behaviour::EmptyId => Ok(PluginOutput::success("", "no id")),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn arguments(&self) -> &[ArgumentKind] {
        &self.arguments
    }

    fn check(&self, command: &Command) -> bool {
        (self.matcher)(command)
    }

    async fn exec(&self, args: ResolvedArgs) -> Result<PluginOutput, PluginError> {
        self.exec_calls.fetch_add(1, Ordering::SeqCst);
        self.run(&args).await
    }

    async fn response(&self, args: ResolvedArgs) -> Result<PluginOutput, PluginError> {
        self.response_calls.fetch_add(1, Ordering::SeqCst);
        let text = args.text(ArgumentKind::CommandText)?.to_string();
        Ok(PluginOutput::success(
            format!("{}_REPLY", self.name.to_uppercase()),
            text,
        ))
    }
}

/// The built-in echo plugin, matching phrases the way `config` says.
pub fn echo(config: &Config) -> Arc<dyn Plugin> {
    Arc::new(EchoPlugin::new(&BasicParser::new(), &config.plugins))
}

pub struct Harness {
    pub manager: SessionManager,
    pub identity: Arc<MemoryIdentityStore>,
    pub keys: Arc<MemoryKeyStore>,
}

pub fn ada() -> UserRecord {
    UserRecord::new("ada")
        .with_setting("temp_unit", "celsius")
        .with_setting("timezone", "+01:00")
}

pub fn harness(config: Config, plugins: Vec<Arc<dyn Plugin>>, keys: Vec<ApiKey>) -> Harness {
    let identity = Arc::new(MemoryIdentityStore::new());
    identity.insert_user(ada());
    identity.insert_user(UserRecord::new("bob"));
    identity.insert_client(ClientRecord::new("cli"));
    identity.insert_client(ClientRecord {
        scopes: vec!["admin".into()],
        ..ClientRecord::new("console")
    });

    let keys = Arc::new(MemoryKeyStore::new(keys, config.keys.rotation_period()));

    let mut registry = PluginRegistry::new();
    for plugin in plugins {
        registry.register(plugin).expect("unique plugin names");
    }

    let ctx = SessionContext::new(
        config,
        Arc::new(registry),
        Arc::new(BasicParser::new()),
        identity.clone(),
        keys.clone(),
    );
    Harness {
        manager: SessionManager::new(ctx),
        identity,
        keys,
    }
}
