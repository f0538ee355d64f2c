//! Plugin trait and command types for herald.
//!
//! Plugins are the capabilities herald routes user commands to. This crate
//! holds everything a plugin author touches; the registry, argument cache
//! and dispatcher live in `herald-core`.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`traits`] | [`Plugin`] |
//! | [`command`] | [`Command`] and its reply state |
//! | [`parsed`] | [`ParsedText`], the parser's output |
//! | [`argument`] | [`ArgumentKind`], [`ArgValue`], [`ResolvedArgs`] |
//! | [`output`] | [`PluginOutput`] |
//! | [`matching`] | keyword, entity and phrase helpers for `check()` |

pub mod argument;
pub mod command;
pub mod error;
pub mod matching;
pub mod output;
pub mod parsed;
pub mod traits;

pub use argument::{ArgValue, ArgumentKind, ResolvedArgs};
pub use command::{Command, ResponseState};
pub use error::PluginError;
pub use output::{OutputKind, PluginOutput};
pub use parsed::{DependencyEdge, Entity, ParsedText, PartOfSpeech, Token};
pub use traits::Plugin;
