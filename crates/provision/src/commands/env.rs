//! Shell exports for the toolchain environment.

use crate::cli::CliError;
use provision_core::{EnvironmentBindings, ProvisionConfig};
use provision_events::emit_stdout;

/// Print `export` lines for the bindings the install stage uses.
///
/// # Errors
///
/// Never fails; returns `Result` for symmetry with the other commands.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(config: &ProvisionConfig) -> Result<(), CliError> {
    let inherited = std::env::var_os("PATH");
    let bindings =
        EnvironmentBindings::derive(&config.toolchain, &config.workspace, inherited.as_ref());
    emit_stdout!(bindings.to_shell_exports().trim_end());
    Ok(())
}
