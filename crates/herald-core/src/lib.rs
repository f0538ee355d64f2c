//! Core engine for herald.
//!
//! Routes free-form user commands to plugins, resolves the arguments each
//! plugin declares from a per-session cache, and manages the lifecycle of
//! interactive sessions.
//!
//! # Modules
//!
//! - [`session`] -- [`Session`]: command history, argument cache, dispatch
//! - [`manager`] -- [`SessionManager`]: live registry, expiry and refresh loops
//! - [`arguments`] -- per-session argument cells and their build logic
//! - [`plugins`] -- [`PluginRegistry`] and built-in plugins
//! - [`stores`] -- collaborator traits (parser, identity, keys, notifications)
//! - [`memory`] -- in-memory collaborator implementations
//! - [`parser`] -- lexicon-driven [`BasicParser`]
//! - [`notify`] -- shared [`NotificationQueue`]
//! - [`config_loader`] -- config discovery and loading

pub mod arguments;
pub mod config_loader;
pub mod manager;
pub mod memory;
pub mod notify;
pub mod parser;
pub mod plugins;
pub mod session;
pub mod stores;

pub use manager::SessionManager;
pub use notify::NotificationQueue;
pub use parser::BasicParser;
pub use plugins::PluginRegistry;
pub use session::{Session, SessionContext};
