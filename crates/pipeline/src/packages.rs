//! System package installation.
//!
//! Syncs the package index, then installs the configured set non-interactively.
//! Re-running against a host that already has every package is a no-op success
//! because the package manager itself is idempotent.

use provision_core::config::PackageSet;
use provision_core::{CommandRunner, CommandSpec, Error, Result, spawn_exit_code};
use std::sync::Arc;
use tracing::{debug, info};

/// Installs the build prerequisites through the system package manager.
pub struct PackageInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl PackageInstaller {
    /// Create an installer that spawns the package manager through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Sync the index and install `packages`.
    ///
    /// An empty package list still syncs the index but skips the install call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Package`] carrying the package manager's exit code when
    /// either invocation exits non-zero, or 127 when it cannot be spawned.
    pub async fn install(&self, packages: &PackageSet) -> Result<()> {
        self.run(packages, update_command(packages)).await?;

        if packages.names.is_empty() {
            debug!("No packages requested, skipping install");
            return Ok(());
        }

        info!(count = packages.names.len(), "Installing system packages");
        self.run(packages, install_command(packages)).await
    }

    async fn run(&self, packages: &PackageSet, command: CommandSpec) -> Result<()> {
        debug!(%command, "Running package manager");
        let code = self.runner.status(&command).await.map_err(|e| {
            Error::package(
                format!("failed to run {}: {e}", packages.manager),
                spawn_exit_code(&e),
            )
        })?;

        if code != 0 {
            return Err(Error::package(
                format!("`{command}` exited with status {code}"),
                code,
            ));
        }
        Ok(())
    }
}

fn update_command(packages: &PackageSet) -> CommandSpec {
    CommandSpec::new(&packages.manager)
        .arg("update")
        .env("DEBIAN_FRONTEND", "noninteractive")
}

fn install_command(packages: &PackageSet) -> CommandSpec {
    CommandSpec::new(&packages.manager)
        .args(["install", "-y", "--no-install-recommends"])
        .args(&packages.names)
        .env("DEBIAN_FRONTEND", "noninteractive")
}
