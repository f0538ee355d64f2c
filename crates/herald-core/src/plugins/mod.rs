//! Plugin registry and built-in plugins.

pub mod builtin;
pub mod registry;

pub use builtin::EchoPlugin;
pub use registry::PluginRegistry;
