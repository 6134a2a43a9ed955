//! Remote module installation with the toolchain.

use provision_core::config::ModuleSpec;
use provision_core::{
    CommandRunner, CommandSpec, EXIT_FAILURE, EnvironmentBindings, Error, Result,
    spawn_exit_code,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// An executable produced by a successful module install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledExecutable {
    /// Location under the workspace `bin` directory.
    pub path: PathBuf,
    /// The `module@version` that was installed.
    pub target: String,
}

/// Runs `go install <module>@<version>` inside the derived environment.
pub struct RemoteModuleInstaller {
    runner: Arc<dyn CommandRunner>,
}

impl RemoteModuleInstaller {
    /// Create an installer that spawns the toolchain through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Install `module` and confirm its executable landed in the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Install`] with the toolchain's exit code when it exits
    /// non-zero (127 when it cannot be spawned), or with exit code 1 when it
    /// succeeds without producing the executable.
    pub async fn install(
        &self,
        module: &ModuleSpec,
        bindings: &EnvironmentBindings,
    ) -> Result<InstalledExecutable> {
        let target = module.install_target();
        if module.is_floating() {
            warn!(
                module = %module.path,
                "Installing floating version '{}'; repeated runs may build different releases",
                module.version
            );
        }

        let command = install_command(&target, bindings);
        info!(%target, "Installing module");

        let code = self.runner.status(&command).await.map_err(|e| {
            Error::install(
                format!("failed to run {}: {e}", command.program.display()),
                spawn_exit_code(&e),
            )
        })?;
        if code != 0 {
            return Err(Error::install(
                format!("`go install {target}` exited with status {code}"),
                code,
            ));
        }

        let path = bindings.installed_executable(module.executable_name());
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if !exists {
            return Err(Error::install(
                format!(
                    "`go install {target}` succeeded but {} was not produced",
                    path.display()
                ),
                EXIT_FAILURE,
            ));
        }

        info!(path = %path.display(), "Module installed");
        Ok(InstalledExecutable { path, target })
    }
}

fn install_command(target: &str, bindings: &EnvironmentBindings) -> CommandSpec {
    CommandSpec::new(bindings.driver())
        .args(["install", "-v", target])
        .envs(bindings.vars())
}
