//! Post-install verification.

use super::installed_executable;
use crate::cli::CliError;
use provision_core::{ProvisionConfig, SystemCommandRunner};
use provision_events::emit_stdout;
use provision_pipeline::ToolVerifier;
use std::sync::Arc;

/// Check that the installed tool runs and print its version.
///
/// # Errors
///
/// Fails with 127 when the tool is missing, or with the tool's own exit code.
pub async fn execute(config: &ProvisionConfig) -> Result<(), CliError> {
    let executable = installed_executable(config);
    let verifier = ToolVerifier::new(Arc::new(SystemCommandRunner::new()));

    let version = verifier.verify(&executable).await?;
    emit_stdout!(format!(
        "[+] {} is installed at {}: {version}",
        config.module.executable_name(),
        executable.display()
    ));
    Ok(())
}
