//! External process execution.
//!
//! Every stage that shells out goes through [`CommandRunner`], so tests can
//! substitute a recording fake for the package manager and the toolchain.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{EXIT_FAILURE, EXIT_NOT_FOUND};

/// Exit code reported for a process terminated by a signal with no number.
const EXIT_SIGNALED: i32 = 128;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run (name resolved through `PATH`, or an absolute path).
    pub program: PathBuf,
    /// Arguments.
    pub args: Vec<OsString>,
    /// Variables added to the inherited environment.
    pub envs: Vec<(String, OsString)>,
    /// Kill the process if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable for the child.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((name.into(), value.into()));
        self
    }

    /// Set several environment variables for the child.
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OsString>,
    {
        self.envs
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Bound the run time.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of an environment variable set on this command.
    #[must_use]
    pub fn env_value(&self, name: &str) -> Option<&OsString> {
        self.envs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Program name without directories, for matching and display.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.to_string_lossy(), |n| n.to_string_lossy())
            .into_owned()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_os_str())));
        cmd.kill_on_drop(true);
        cmd
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a command run with piped output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code (see [`exit_code_of`]).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with inherited stdio and return the exit code.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the program cannot be spawned or exceeds its
    /// timeout (`ErrorKind::TimedOut`).
    async fn status(&self, command: &CommandSpec) -> std::io::Result<i32>;

    /// Run with captured stdout/stderr.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CommandRunner::status`].
    async fn output(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Create a new runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn status(&self, command: &CommandSpec) -> std::io::Result<i32> {
        debug!(%command, "Spawning process");
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        let status = match command.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(timed_out(command, limit));
                }
            },
            None => child.wait().await?,
        };

        let code = exit_code_of(status);
        debug!(%command, exit_code = code, "Process exited");
        Ok(code)
    }

    async fn output(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        debug!(%command, "Spawning process with captured output");
        let child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // kill_on_drop reaps the child when the timeout drops the future
        let output = match command.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| timed_out(command, limit))??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            exit_code: exit_code_of(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn timed_out(command: &CommandSpec, limit: Duration) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!(
            "{} did not finish within {}s",
            command.program_name(),
            limit.as_secs()
        ),
    )
}

/// Convert an exit status to a shell-style exit code.
///
/// Signal deaths map to `128 + signal`, the convention shells use.
#[must_use]
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return EXIT_SIGNALED + signal;
        }
    }

    EXIT_SIGNALED
}

/// Exit code to report when a program could not be run at all.
///
/// A missing program reports 127 like a shell would; any other spawn or wait
/// failure is a generic failure.
#[must_use]
pub fn spawn_exit_code(err: &std::io::Error) -> i32 {
    match err.kind() {
        std::io::ErrorKind::NotFound => EXIT_NOT_FOUND,
        _ => EXIT_FAILURE,
    }
}
