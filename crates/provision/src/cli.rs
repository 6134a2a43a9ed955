//! Command-line interface and error mapping.

use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use provision_core::{EXIT_CONFIG, EXIT_FAILURE};
use provision_pipeline::StageFailure;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful run.
pub const EXIT_OK: i32 = 0;

/// Exit code for SIGINT (128 + signal number 2)
pub const EXIT_SIGINT: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(provision::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A provisioning step or the installed tool failed (its own exit code)
    #[error("{message}")]
    #[diagnostic(code(provision::cli::stage))]
    Stage {
        /// The error message
        message: String,
        /// Exit code to terminate with
        exit_code: i32,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 1)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(provision::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a failure that exits with `exit_code`
    #[must_use]
    pub fn stage(message: impl Into<String>, exit_code: i32) -> Self {
        Self::Stage {
            message: message.into(),
            exit_code,
            help: None,
        }
    }

    /// Add help text to an existing error, returning a new error with the help text set.
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Stage {
                message, exit_code, ..
            } => Self::Stage {
                message,
                exit_code,
                help,
            },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }
}

/// Convert `provision_core::Error` to the matching `CliError` variant.
///
/// Configuration problems exit with 2, local I/O failures with 1; everything
/// else keeps the exit code the error carries.
impl From<provision_core::Error> for CliError {
    fn from(err: provision_core::Error) -> Self {
        let help = err.help().map(|h| h.to_string());
        match err {
            // Extract just the message to avoid "Configuration error: Configuration error:"
            provision_core::Error::Configuration { message, help } => {
                Self::Config { message, help }
            }
            io @ provision_core::Error::Io { .. } => Self::Other {
                message: io.to_string(),
                help,
            },
            other => Self::Stage {
                message: other.to_string(),
                exit_code: other.exit_code(),
                help,
            },
        }
    }
}

impl From<StageFailure> for CliError {
    fn from(failure: StageFailure) -> Self {
        let help = failure.source.help().map(|h| h.to_string());
        Self::Stage {
            message: format!("{failure}: {}", failure.source),
            exit_code: failure.exit_code(),
            help,
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CONFIG,
        CliError::Stage { exit_code, .. } => *exit_code,
        CliError::Other { .. } => EXIT_FAILURE,
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Stage { .. } => "stage",
                CliError::Other { .. } => "other",
            },
            "exit_code": exit_code_for(err),
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        // Use miette for human-friendly error display
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        // Ensure output is flushed before potential process exit
        let _ = io::stderr().flush();
    }
}

/// Provision a host that builds and installs naabu.
///
/// Without a subcommand, runs the full provisioning pipeline.
#[derive(Parser, Debug)]
#[command(name = "provision")]
#[command(about = "Install build prerequisites, the Go toolchain and naabu on this host")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    /// Emit JSON event lines instead of human output.
    #[arg(long, global = true, help = "Emit JSON event lines instead of human output")]
    pub json: bool,

    /// Diagnostic log format on stderr.
    #[arg(
        long,
        global = true,
        value_enum,
        help = "Diagnostic log format (defaults to json with --json, otherwise compact)"
    )]
    pub log_format: Option<crate::tracing::TracingFormat>,

    /// Also print a line when each stage completes.
    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Print a line with the duration of each completed stage"
    )]
    pub verbose: bool,

    /// Configuration file overriding the built-in defaults.
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "PROVISION_CONFIG",
        help = "TOML file overriding packages, toolchain, workspace or module settings"
    )]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the provisioning pipeline (the default).
    #[command(about = "Run the provisioning pipeline (the default)")]
    Run,
    /// Check that the installed tool runs.
    #[command(about = "Check that the installed tool runs")]
    Verify,
    /// Scan a host with the installed tool and save the results.
    #[command(about = "Scan a host with the installed tool and save the results")]
    Scan {
        /// Host name or address to scan.
        host: String,
        /// Directory for result files.
        #[arg(long, default_value = "outputs", help = "Directory for result files")]
        output_dir: PathBuf,
    },
    /// Print shell exports for the toolchain environment.
    #[command(about = "Print shell exports for the toolchain environment")]
    Env,
}

impl Cli {
    /// The command to run, with `run` filled in when none was given.
    #[must_use]
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// Diagnostic format: the explicit `--log-format`, else one matching `--json`.
    #[must_use]
    pub fn tracing_format(&self) -> crate::tracing::TracingFormat {
        use crate::tracing::TracingFormat;
        self.log_format.unwrap_or(if self.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        })
    }
}

/// Parse command line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
