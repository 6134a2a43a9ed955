//! Error taxonomy for the provisioning pipeline.
//!
//! Each variant belongs to one of the stage categories (package, fetch,
//! workspace, install) or to the ambient concerns around them (configuration
//! files, plain I/O). External process failures carry the child's exit code so
//! the binary can surface it unchanged.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when a failure has no external process behind it.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for a configuration file that could not be loaded.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code reported when an external program could not be spawned at all.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Result type for provision operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the provisioning pipeline and its collaborators.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Package index sync or package installation failed.
    #[error("Package installation failed: {message}")]
    #[diagnostic(
        code(provision::packages),
        help("Check the package manager output above")
    )]
    Package {
        /// Description of the failing invocation.
        message: String,
        /// Exit code of the package manager, if it ran.
        exit_code: i32,
    },

    /// Toolchain archive download failed.
    #[error("Toolchain download failed for {url}: {message}")]
    #[diagnostic(
        code(provision::fetch),
        help("Check network connectivity and that the release URL exists")
    )]
    Fetch {
        /// Download URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Downloaded archive did not match the pinned digest.
    #[error("Checksum mismatch for toolchain archive: expected {expected}, got {actual}")]
    #[diagnostic(code(provision::fetch::checksum))]
    ChecksumMismatch {
        /// Configured SHA-256 digest.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: String,
    },

    /// Toolchain archive could not be unpacked into the installation root.
    #[error("Toolchain extraction failed: {message}")]
    #[diagnostic(code(provision::fetch::extract))]
    Extraction {
        /// Error message.
        message: String,
    },

    /// Workspace directory could not be created.
    #[error("Failed to create workspace directory {}: {source}", path.display())]
    #[diagnostic(
        code(provision::workspace),
        help("Check permissions on the workspace root")
    )]
    Workspace {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Remote module resolution or compilation failed.
    #[error("Module install failed: {message}")]
    #[diagnostic(code(provision::install))]
    Install {
        /// Error message.
        message: String,
        /// Exit code of the toolchain, if it ran.
        exit_code: i32,
    },

    /// The installed tool is missing or does not run.
    #[error("Verification failed: {message}")]
    #[diagnostic(
        code(provision::verify),
        help("Run `provision` to install the tool first")
    )]
    Verification {
        /// Error message.
        message: String,
        /// Exit code of the tool, if it ran.
        exit_code: i32,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(provision::config))]
    Configuration {
        /// Error message.
        message: String,
        /// Optional help text.
        #[help]
        help: Option<String>,
    },

    /// I/O error with context.
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(" on {}", p.display())))]
    #[diagnostic(code(provision::io))]
    Io {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path involved, if any.
        path: Option<PathBuf>,
        /// Operation that failed.
        operation: String,
    },
}

impl Error {
    /// Create a package error.
    #[must_use]
    pub fn package(message: impl Into<String>, exit_code: i32) -> Self {
        Self::Package {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a fetch error.
    #[must_use]
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error.
    #[must_use]
    pub fn checksum_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create a workspace directory error.
    #[must_use]
    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Create an install error.
    #[must_use]
    pub fn install(message: impl Into<String>, exit_code: i32) -> Self {
        Self::Install {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a verification error.
    #[must_use]
    pub fn verification(message: impl Into<String>, exit_code: i32) -> Self {
        Self::Verification {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text.
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }

    /// Exit code the process should terminate with for this error.
    ///
    /// External process failures report the child's own status; everything
    /// else collapses to a generic failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Package { exit_code, .. }
            | Self::Install { exit_code, .. }
            | Self::Verification { exit_code, .. } => *exit_code,
            Self::Configuration { .. } => EXIT_CONFIG,
            Self::Fetch { .. }
            | Self::ChecksumMismatch { .. }
            | Self::Extraction { .. }
            | Self::Workspace { .. }
            | Self::Io { .. } => EXIT_FAILURE,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "operation".to_string(),
        }
    }
}
