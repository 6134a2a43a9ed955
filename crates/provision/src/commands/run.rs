//! The provisioning pipeline.

use crate::cli::CliError;
use provision_core::{CommandRunner, ProvisionConfig, SystemCommandRunner};
use provision_pipeline::{HttpDownloader, PipelineRunner, ToolVerifier};
use std::sync::Arc;
use tracing::debug;

/// Provision the host, then confirm the tool runs.
///
/// # Errors
///
/// Returns the failing stage with its exit code.
pub async fn execute(config: ProvisionConfig) -> Result<(), CliError> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
    let downloader = Arc::new(HttpDownloader::new()?);

    let mut pipeline = PipelineRunner::new(config, Arc::clone(&runner), downloader);
    let report = pipeline.run().await?;

    match ToolVerifier::new(runner)
        .verify(&report.executable.path)
        .await
    {
        Ok(version) => debug!(%version, "Installed tool responds"),
        Err(e) => debug!(error = %e, "Installed tool did not respond to -version"),
    }
    Ok(())
}
