//! Post-install checks and scan invocation for the installed tool.

use chrono::Local;
use provision_core::{CommandRunner, CommandSpec, Error, Result, spawn_exit_code};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long `<tool> -version` may take.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a scan may take.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(300);

/// Exit code reported when the tool exceeds its time limit.
pub const EXIT_TIMEOUT: i32 = 124;

#[cfg(unix)]
const EXIT_KILLED: i32 = 128 + libc::SIGKILL;
#[cfg(not(unix))]
const EXIT_KILLED: i32 = 137;

/// Outcome of a scan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// The tool's exit code.
    pub exit_code: i32,
    /// File the results were written to, if any.
    pub results: Option<PathBuf>,
    /// The tool's standard error.
    pub stderr: String,
}

impl ScanOutcome {
    /// Whether the scan exited successfully.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether the tool was killed with SIGKILL, usually by the OOM killer.
    #[must_use]
    pub const fn killed(&self) -> bool {
        self.exit_code == EXIT_KILLED
    }
}

/// Runs the installed tool.
pub struct ToolVerifier {
    runner: Arc<dyn CommandRunner>,
}

impl ToolVerifier {
    /// Create a verifier that spawns the tool through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run `<executable> -version` and return the first line it prints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] if the executable is missing, times out
    /// or exits non-zero.
    pub async fn verify(&self, executable: &Path) -> Result<String> {
        ensure_present(executable).await?;

        let command = CommandSpec::new(executable)
            .arg("-version")
            .timeout(VERIFY_TIMEOUT);
        let output = self
            .runner
            .output(&command)
            .await
            .map_err(|e| run_error(executable, &e))?;

        if !output.success() {
            return Err(Error::verification(
                format!(
                    "{} -version exited with status {}",
                    executable.display(),
                    output.exit_code
                ),
                output.exit_code,
            ));
        }

        // Version banners go to stderr for most Go CLIs
        let version = output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();
        debug!(executable = %executable.display(), %version, "Tool verified");
        Ok(version)
    }

    /// Scan `host` and save the tool's output under `output_dir`.
    ///
    /// Output is written as `<YYYYmmddHHMMSSmmm>-<tool>.txt`. A failed scan
    /// still saves whatever partial output it produced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Verification`] if the executable is missing or the
    /// scan times out, and an I/O error if results cannot be written.
    pub async fn scan(
        &self,
        executable: &Path,
        host: &str,
        output_dir: &Path,
    ) -> Result<ScanOutcome> {
        ensure_present(executable).await?;

        let command = CommandSpec::new(executable)
            .args(["-host", host, "-silent"])
            .timeout(SCAN_TIMEOUT);
        info!(%host, "Scanning");
        let output = self
            .runner
            .output(&command)
            .await
            .map_err(|e| run_error(executable, &e))?;

        let save = output.success() || !output.stdout.trim().is_empty();
        let results = if save {
            Some(write_results(executable, output_dir, &output.stdout).await?)
        } else {
            None
        };

        let outcome = ScanOutcome {
            exit_code: output.exit_code,
            results,
            stderr: output.stderr,
        };
        if outcome.killed() {
            warn!(%host, "Scanner was killed, likely out of memory or another resource limit");
        }
        Ok(outcome)
    }
}

async fn ensure_present(executable: &Path) -> Result<()> {
    if tokio::fs::try_exists(executable).await.unwrap_or(false) {
        Ok(())
    } else {
        Err(Error::verification(
            format!("{} is not installed", executable.display()),
            provision_core::EXIT_NOT_FOUND,
        ))
    }
}

fn run_error(executable: &Path, err: &std::io::Error) -> Error {
    let exit_code = if err.kind() == std::io::ErrorKind::TimedOut {
        EXIT_TIMEOUT
    } else {
        spawn_exit_code(err)
    };
    Error::verification(format!("{}: {err}", executable.display()), exit_code)
}

async fn write_results(executable: &Path, output_dir: &Path, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| Error::io(e, output_dir, "create"))?;

    let tool = executable
        .file_name()
        .map_or_else(|| "scan".into(), |n| n.to_string_lossy());
    let path = output_dir.join(results_file_name(&Local::now(), &tool));
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| Error::io(e, &path, "write"))?;

    info!(path = %path.display(), "Scan results saved");
    Ok(path)
}

fn results_file_name<Tz: chrono::TimeZone>(at: &chrono::DateTime<Tz>, tool: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}-{tool}.txt", at.format("%Y%m%d%H%M%S%3f"))
}
