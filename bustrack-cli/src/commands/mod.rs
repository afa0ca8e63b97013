//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, show, path)
//! - [`polyline`] - Decode an encoded route polyline
//! - [`track`] - Follow a route live

pub mod common;
pub mod config;
pub mod polyline;
pub mod track;
