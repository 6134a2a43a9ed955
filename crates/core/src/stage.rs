//! Pipeline stages and the run state machine.

use serde::{Deserialize, Serialize};

/// One of the four ordered provisioning steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// OS package installation.
    Packages,
    /// Toolchain download and extraction.
    Toolchain,
    /// Environment binding and workspace creation.
    Environment,
    /// Remote module install.
    Install,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Self; 4] = [Self::Packages, Self::Toolchain, Self::Environment, Self::Install];

    /// Stable identifier used in logs and events.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Packages => "packages",
            Self::Toolchain => "toolchain",
            Self::Environment => "environment",
            Self::Install => "install",
        }
    }

    /// Stage that runs after this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Packages => Some(Self::Toolchain),
            Self::Toolchain => Some(Self::Environment),
            Self::Environment => Some(Self::Install),
            Self::Install => None,
        }
    }

    /// Parse from the identifier returned by [`Stage::name`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.name() == s)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of a pipeline run.
///
/// `NotStarted → Packages → Toolchain → Environment → Install → Done`, with any
/// running stage able to move to `Failed`. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Nothing has run yet.
    #[default]
    NotStarted,
    /// The given stage is executing.
    Running(Stage),
    /// All stages succeeded.
    Done,
    /// A stage failed with the given exit code.
    Failed {
        /// The stage that failed.
        stage: Stage,
        /// Exit code propagated from the failure.
        exit_code: i32,
    },
}

impl PipelineState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Advance to the next stage, or to `Done` after the last one.
    ///
    /// Returns `None` from a terminal state.
    #[must_use]
    pub const fn advance(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Running(Stage::Packages)),
            Self::Running(stage) => match stage.next() {
                Some(next) => Some(Self::Running(next)),
                None => Some(Self::Done),
            },
            Self::Done | Self::Failed { .. } => None,
        }
    }

    /// Fail the running stage.
    ///
    /// Returns `None` unless a stage is running.
    #[must_use]
    pub const fn fail(self, exit_code: i32) -> Option<Self> {
        match self {
            Self::Running(stage) => Some(Self::Failed { stage, exit_code }),
            Self::NotStarted | Self::Done | Self::Failed { .. } => None,
        }
    }
}
