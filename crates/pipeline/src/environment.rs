//! Workspace preparation and environment binding derivation.

use provision_core::config::{ToolchainRelease, WorkspaceLayout};
use provision_core::{EnvironmentBindings, Error, Result};
use std::ffi::OsString;
use tracing::debug;

/// Prepares the module workspace and derives the toolchain environment.
///
/// The provisioner's own environment is only read (for the inherited `PATH`),
/// never written.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentConfigurer {
    inherited_path: Option<OsString>,
}

impl EnvironmentConfigurer {
    /// Create a configurer that appends the current process `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inherited_path: std::env::var_os("PATH"),
        }
    }

    /// Create a configurer that appends `path` instead of the process `PATH`.
    #[must_use]
    pub const fn with_inherited_path(path: Option<OsString>) -> Self {
        Self {
            inherited_path: path,
        }
    }

    /// Create the workspace directories and return the bindings.
    ///
    /// Existing directories are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Workspace`] if a directory cannot be created.
    pub async fn configure(
        &self,
        toolchain: &ToolchainRelease,
        workspace: &WorkspaceLayout,
    ) -> Result<EnvironmentBindings> {
        for dir in [workspace.source_dir(), workspace.bin_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::workspace(&dir, e))?;
            debug!(dir = %dir.display(), "Workspace directory ready");
        }

        let bindings =
            EnvironmentBindings::derive(toolchain, workspace, self.inherited_path.as_ref());
        debug!(
            goroot = %bindings.toolchain_root.display(),
            gopath = %bindings.workspace_root.display(),
            "Environment bindings derived"
        );
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_creates_workspace_and_orders_path() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = WorkspaceLayout {
            root: tmp.path().join("go"),
        };
        let toolchain = ToolchainRelease {
            install_root: PathBuf::from("/usr/local/go"),
            ..ToolchainRelease::default()
        };

        let configurer =
            EnvironmentConfigurer::with_inherited_path(Some(OsString::from("/usr/bin:/bin")));
        let bindings = configurer.configure(&toolchain, &workspace).await.unwrap();

        assert!(workspace.source_dir().is_dir());
        assert!(workspace.bin_dir().is_dir());

        let entries = bindings.search_path_entries();
        assert_eq!(entries[0], workspace.bin_dir());
        assert_eq!(entries[1], PathBuf::from("/usr/local/go/bin"));
        assert_eq!(entries[2], PathBuf::from("/usr/bin"));
    }

    #[tokio::test]
    async fn test_existing_directories_are_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = WorkspaceLayout {
            root: tmp.path().to_path_buf(),
        };
        std::fs::create_dir_all(workspace.bin_dir()).unwrap();
        std::fs::write(workspace.bin_dir().join("keep"), b"x").unwrap();

        EnvironmentConfigurer::with_inherited_path(None)
            .configure(&ToolchainRelease::default(), &workspace)
            .await
            .unwrap();

        assert!(workspace.bin_dir().join("keep").exists());
    }

    #[tokio::test]
    async fn test_uncreatable_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = EnvironmentConfigurer::with_inherited_path(None)
            .configure(
                &ToolchainRelease::default(),
                &WorkspaceLayout { root: blocker },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Workspace { .. }));
    }
}
