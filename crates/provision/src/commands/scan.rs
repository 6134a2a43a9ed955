//! Scan a host with the installed tool.

use super::installed_executable;
use crate::cli::CliError;
use provision_core::{ProvisionConfig, SystemCommandRunner};
use provision_events::{emit_stderr, emit_stdout};
use provision_pipeline::ToolVerifier;
use std::path::Path;
use std::sync::Arc;

/// Scan `host`, saving results under `output_dir`.
///
/// # Errors
///
/// Fails with the tool's exit code when the scan does not succeed.
pub async fn execute(
    config: &ProvisionConfig,
    host: &str,
    output_dir: &Path,
) -> Result<(), CliError> {
    let executable = installed_executable(config);
    let tool = config.module.executable_name();
    let verifier = ToolVerifier::new(Arc::new(SystemCommandRunner::new()));

    let outcome = verifier.scan(&executable, host, output_dir).await?;

    if let Some(results) = &outcome.results {
        emit_stdout!(format!("[+] Results saved to {}", results.display()));
    }
    if outcome.success() {
        return Ok(());
    }

    let stderr = outcome.stderr.trim();
    if !stderr.is_empty() {
        emit_stderr!(stderr);
    }

    let err = CliError::stage(
        format!("{tool} exited with status {}", outcome.exit_code),
        outcome.exit_code,
    );
    if outcome.killed() {
        return Err(err.with_help(format!(
            "{tool} was killed (SIGKILL), most likely by the OOM killer; \
             lower the scan rate or give the host more memory"
        )));
    }
    Err(err)
}
