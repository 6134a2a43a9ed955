//! Sequencing of the provisioning stages.
//!
//! The runner drives [`PipelineState`] from `NotStarted` through each
//! [`Stage`] in order and stops at the first failure. The start marker is
//! emitted before the first stage; the end marker only once every stage has
//! succeeded.

use miette::Diagnostic;
use provision_core::{
    CommandRunner, Downloader, EXIT_FAILURE, EnvironmentBindings, Error, PipelineState,
    ProvisionConfig, Stage,
};
use provision_events::{
    emit_pipeline_completed, emit_pipeline_failed, emit_pipeline_started, emit_stage_completed,
    emit_stage_failed, emit_stage_started,
};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::environment::EnvironmentConfigurer;
use crate::install::{InstalledExecutable, RemoteModuleInstaller};
use crate::packages::PackageInstaller;
use crate::toolchain::ToolchainFetcher;

/// A stage failed and the pipeline stopped.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("Provisioning failed at stage '{stage}'")]
pub struct StageFailure {
    /// The stage that failed.
    pub stage: Stage,
    /// What went wrong.
    #[source]
    #[diagnostic_source]
    pub source: Error,
}

impl StageFailure {
    /// Process exit code for this failure: the external program's own code,
    /// or 1 when no program was involved.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// The installed executable.
    pub executable: InstalledExecutable,
    /// Bindings the executable was built with.
    pub bindings: EnvironmentBindings,
    /// Wall-clock time of the whole run.
    pub duration: Duration,
}

/// Values carried from one stage to the next.
#[derive(Default)]
struct RunContext {
    bindings: Option<EnvironmentBindings>,
    executable: Option<InstalledExecutable>,
}

/// Runs the four provisioning stages in order, failing fast.
pub struct PipelineRunner {
    config: ProvisionConfig,
    packages: PackageInstaller,
    toolchain: ToolchainFetcher,
    environment: EnvironmentConfigurer,
    installer: RemoteModuleInstaller,
    state: PipelineState,
}

impl PipelineRunner {
    /// Create a runner using `runner` for external programs and `downloader`
    /// for the toolchain archive.
    #[must_use]
    pub fn new(
        config: ProvisionConfig,
        runner: Arc<dyn CommandRunner>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            config,
            packages: PackageInstaller::new(Arc::clone(&runner)),
            toolchain: ToolchainFetcher::new(downloader),
            environment: EnvironmentConfigurer::new(),
            installer: RemoteModuleInstaller::new(runner),
            state: PipelineState::NotStarted,
        }
    }

    /// Use `path` as the inherited `PATH` tail instead of the process `PATH`.
    #[must_use]
    pub fn with_inherited_path(mut self, path: Option<OsString>) -> Self {
        self.environment = EnvironmentConfigurer::with_inherited_path(path);
        self
    }

    /// Replace the toolchain fetcher (e.g. to stage downloads elsewhere).
    #[must_use]
    pub fn with_toolchain_fetcher(mut self, fetcher: ToolchainFetcher) -> Self {
        self.toolchain = fetcher;
        self
    }

    /// The configuration this runner provisions.
    #[must_use]
    pub const fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Current state of the last (or ongoing) run.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Run every stage.
    ///
    /// Each call starts from `NotStarted`; running again on a provisioned host
    /// repeats every stage.
    ///
    /// # Errors
    ///
    /// Returns the first [`StageFailure`]; later stages are not attempted.
    #[instrument(name = "provision_pipeline", skip(self))]
    pub async fn run(&mut self) -> Result<ProvisionReport, StageFailure> {
        let started = Instant::now();
        let tool = self.config.module.executable_name().to_string();
        self.state = PipelineState::NotStarted;

        emit_pipeline_started!(tool);

        let mut context = RunContext::default();
        while let Some(next) = self.state.advance() {
            self.state = next;
            let PipelineState::Running(stage) = next else {
                break;
            };

            let stage_started = Instant::now();
            emit_stage_started!(stage, self.describe(stage));

            if let Err(source) = self.run_stage(stage, &mut context).await {
                let exit_code = source.exit_code();
                if let Some(failed) = self.state.fail(exit_code) {
                    self.state = failed;
                }
                emit_stage_failed!(stage, exit_code, source);
                emit_pipeline_failed!(stage, exit_code);
                return Err(StageFailure { stage, source });
            }

            emit_stage_completed!(stage, millis(stage_started.elapsed()));
        }

        let (Some(executable), Some(bindings)) = (context.executable, context.bindings) else {
            return Err(StageFailure {
                stage: Stage::Install,
                source: Error::install("pipeline finished without an executable", EXIT_FAILURE),
            });
        };

        let duration = started.elapsed();
        emit_pipeline_completed!(tool, millis(duration));
        debug!(path = %executable.path.display(), "Provisioning complete");

        Ok(ProvisionReport {
            executable,
            bindings,
            duration,
        })
    }

    async fn run_stage(
        &self,
        stage: Stage,
        context: &mut RunContext,
    ) -> provision_core::Result<()> {
        match stage {
            Stage::Packages => self.packages.install(&self.config.packages).await,
            Stage::Toolchain => self.toolchain.fetch(&self.config.toolchain).await.map(drop),
            Stage::Environment => {
                let bindings = self
                    .environment
                    .configure(&self.config.toolchain, &self.config.workspace)
                    .await?;
                context.bindings = Some(bindings);
                Ok(())
            }
            Stage::Install => {
                let bindings = context.bindings.as_ref().ok_or_else(|| {
                    Error::install("environment bindings were not established", EXIT_FAILURE)
                })?;
                let executable = self.installer.install(&self.config.module, bindings).await?;
                context.executable = Some(executable);
                Ok(())
            }
        }
    }

    fn describe(&self, stage: Stage) -> String {
        match stage {
            Stage::Packages => format!(
                "Installing {} system packages with {}",
                self.config.packages.names.len(),
                self.config.packages.manager
            ),
            Stage::Toolchain => format!(
                "Fetching go {} from {}",
                self.config.toolchain.version, self.config.toolchain.url
            ),
            Stage::Environment => format!(
                "Preparing workspace {}",
                self.config.workspace.root.display()
            ),
            Stage::Install => format!("Installing {}", self.config.module.install_target()),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
