//! Command implementations.

pub mod env;
pub mod run;
pub mod scan;
pub mod verify;

use crate::cli::{CliError, Commands};
use provision_core::ProvisionConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// User-level configuration file, used when no `--config` is given.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("provision").join("config.toml"))
}

/// Load the configuration from `explicit`, else the user-level file if it
/// exists, else the built-in defaults.
///
/// # Errors
///
/// Returns a configuration error if the chosen file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<ProvisionConfig, CliError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| default_config_path().filter(|p| p.is_file()));
    if let Some(path) = &path {
        debug!(path = %path.display(), "Loading configuration");
    }
    Ok(ProvisionConfig::load(path.as_deref())?)
}

/// Where the module install places the tool.
#[must_use]
pub fn installed_executable(config: &ProvisionConfig) -> PathBuf {
    config
        .workspace
        .bin_dir()
        .join(config.module.executable_name())
}

/// Execute `command` against `config`.
///
/// # Errors
///
/// Returns the command's failure, carrying the exit code to terminate with.
pub async fn execute(command: Commands, config: ProvisionConfig) -> Result<(), CliError> {
    match command {
        Commands::Run => run::execute(config).await,
        Commands::Verify => verify::execute(&config).await,
        Commands::Scan { host, output_dir } => scan::execute(&config, &host, &output_dir).await,
        Commands::Env => env::execute(&config),
    }
}
