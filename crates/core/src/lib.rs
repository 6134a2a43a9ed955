//! Core types for the provision pipeline.
//!
//! This crate holds what every stage shares: the error taxonomy, the
//! configuration model, environment bindings, the stage state machine, and
//! the seams ([`process::CommandRunner`], [`download::Downloader`]) through
//! which the pipeline reaches external programs and the network.

pub mod config;
pub mod download;
pub mod environment;
pub mod error;
pub mod process;
pub mod stage;

pub use config::ProvisionConfig;
pub use download::Downloader;
pub use environment::EnvironmentBindings;
pub use error::{EXIT_CONFIG, EXIT_FAILURE, EXIT_NOT_FOUND, Error, Result};
pub use process::{
    CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner, exit_code_of, spawn_exit_code,
};
pub use stage::{PipelineState, Stage};
