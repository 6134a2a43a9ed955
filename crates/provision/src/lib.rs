//! provision CLI library.
//!
//! The binary in `main.rs` is a thin wrapper: it parses [`cli::Cli`],
//! initializes [`tracing`](crate::tracing) with the event renderer and hands the
//! chosen command to [`commands::execute`].

/// Command-line definitions and error mapping.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;
