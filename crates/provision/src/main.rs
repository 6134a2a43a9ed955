//! provision CLI application
//!
//! Provisions a host able to build naabu: system packages, the Go toolchain,
//! the workspace environment and the module install, stopping at the first
//! failure with that step's exit code.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use provision::cli::{self, Cli, CliError, EXIT_OK, EXIT_SIGINT, exit_code_for, render_error};
use provision::commands;
use provision::tracing::{TracingConfig, init_tracing_with_events};
use provision_core::EXIT_FAILURE;
use provision_events::{CliRenderer, CliRendererConfig, JsonRenderer};

/// Main entry point
fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    // reqwest is built without a default crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code);
}

/// Run the CLI and map the outcome to an exit code
async fn run(cli: Cli) -> i32 {
    let json_mode = cli.json;

    tokio::select! {
        biased;

        _ = tokio::signal::ctrl_c() => EXIT_SIGINT,
        result = real_main(cli) => match result {
            Ok(()) => EXIT_OK,
            Err(err) => {
                render_error(&err, json_mode);
                exit_code_for(&err)
            }
        },
    }
}

/// Real main implementation that can return `CliError`
async fn real_main(cli: Cli) -> Result<(), CliError> {
    let tracing_config = TracingConfig {
        format: cli.tracing_format(),
        level: cli.level.into(),
    };

    // Events render on the emitting thread, so each marker is written before
    // the next child process shares the terminal
    let initialized = if cli.json {
        init_tracing_with_events(tracing_config, JsonRenderer::new())
    } else {
        let renderer = CliRenderer::with_config(CliRendererConfig {
            verbose: cli.verbose,
        });
        init_tracing_with_events(tracing_config, renderer)
    };
    initialized.map_err(|e| {
        CliError::config_with_help(
            format!("Failed to initialize tracing: {e}"),
            "Check the RUST_LOG filter directives",
        )
    })?;

    let config = commands::load_config(cli.config.as_deref())?;
    commands::execute(cli.effective_command(), config).await
}
