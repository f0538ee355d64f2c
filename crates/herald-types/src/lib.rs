//! # herald-types
//!
//! Core type definitions for the herald command dispatcher.
//!
//! This crate is the foundation of the dependency graph -- all other
//! herald crates depend on it. It contains:
//!
//! - **[`error`]** -- [`HeraldError`] and the crate-wide `Result` alias
//! - **[`response`]** -- the `{"data": ...}` / `{"errors": [...]}` envelope
//! - **[`config`]** -- configuration schema
//! - **[`records`]** -- user, client, API key and notification records

pub mod config;
pub mod error;
pub mod records;
pub mod response;

pub use error::{HeraldError, Result};
pub use response::{Response, ResponseCode};
