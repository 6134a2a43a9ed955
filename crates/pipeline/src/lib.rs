//! Provisioning stages for the naabu build host.
//!
//! Four stages run strictly in order:
//!
//! 1. [`PackageInstaller`] syncs the package index and installs build prerequisites.
//! 2. [`ToolchainFetcher`] downloads the Go release and stages it into place.
//! 3. [`EnvironmentConfigurer`] creates the workspace and derives
//!    [`EnvironmentBindings`](provision_core::EnvironmentBindings).
//! 4. [`RemoteModuleInstaller`] runs `go install` with those bindings.
//!
//! [`PipelineRunner`] sequences them, emits progress events and stops at the
//! first failure with a [`StageFailure`].

pub mod download;
pub mod environment;
pub mod extract;
pub mod install;
pub mod packages;
pub mod runner;
pub mod toolchain;
pub mod verify;

pub use download::HttpDownloader;
pub use environment::EnvironmentConfigurer;
pub use install::{InstalledExecutable, RemoteModuleInstaller};
pub use packages::PackageInstaller;
pub use runner::{PipelineRunner, ProvisionReport, StageFailure};
pub use toolchain::ToolchainFetcher;
pub use verify::{ScanOutcome, ToolVerifier};
