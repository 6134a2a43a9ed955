//! Environment bindings for the toolchain.
//!
//! Bindings are derived once and passed by value to whatever spawns toolchain
//! processes. They are never exported into the provisioner's own environment.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{ToolchainRelease, WorkspaceLayout};

/// Process-scoped variables the toolchain needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentBindings {
    /// Toolchain installation root (`GOROOT`).
    pub toolchain_root: PathBuf,
    /// Workspace root (`GOPATH`).
    pub workspace_root: PathBuf,
    /// Executable search path (`PATH`).
    pub search_path: OsString,
    /// Module-aware builds (`GO111MODULE=on`).
    pub module_mode: bool,
    /// Native interop via cgo (`CGO_ENABLED=1`).
    pub native_interop: bool,
}

impl EnvironmentBindings {
    /// Derive bindings for a toolchain and workspace.
    ///
    /// The search path starts with the workspace executable directory, then
    /// the toolchain executable directory, followed by `inherited` entries.
    /// Entries of `inherited` equal to either of those two are dropped.
    #[must_use]
    pub fn derive(
        toolchain: &ToolchainRelease,
        workspace: &WorkspaceLayout,
        inherited: Option<&OsString>,
    ) -> Self {
        let workspace_bin = workspace.bin_dir();
        let toolchain_bin = toolchain.bin_dir();

        let mut entries = vec![workspace_bin.clone(), toolchain_bin.clone()];
        if let Some(inherited) = inherited {
            entries.extend(
                std::env::split_paths(inherited)
                    .filter(|p| !p.as_os_str().is_empty())
                    .filter(|p| *p != workspace_bin && *p != toolchain_bin),
            );
        }

        // Only fails for entries containing the separator, which split_paths
        // never yields; fall back to the two toolchain directories.
        let search_path = std::env::join_paths(&entries).unwrap_or_else(|_| {
            let mut path = workspace_bin.into_os_string();
            path.push(":");
            path.push(toolchain_bin.as_os_str());
            path
        });

        Self {
            toolchain_root: toolchain.install_root.clone(),
            workspace_root: workspace.root.clone(),
            search_path,
            module_mode: true,
            native_interop: true,
        }
    }

    /// Render the bindings as ordered name/value pairs.
    #[must_use]
    pub fn vars(&self) -> Vec<(&'static str, OsString)> {
        vec![
            ("GOROOT", self.toolchain_root.clone().into_os_string()),
            ("GOPATH", self.workspace_root.clone().into_os_string()),
            // An inherited GOBIN would redirect `go install` away from the workspace
            ("GOBIN", self.workspace_root.join("bin").into_os_string()),
            ("PATH", self.search_path.clone()),
            ("GO111MODULE", flag(self.module_mode, "on", "off")),
            ("CGO_ENABLED", flag(self.native_interop, "1", "0")),
        ]
    }

    /// Search path split into its entries.
    #[must_use]
    pub fn search_path_entries(&self) -> Vec<PathBuf> {
        std::env::split_paths(&self.search_path).collect()
    }

    /// Where an executable named `name` lands after a module install.
    #[must_use]
    pub fn installed_executable(&self, name: &str) -> PathBuf {
        self.workspace_root.join("bin").join(name)
    }

    /// Toolchain driver executable.
    #[must_use]
    pub fn driver(&self) -> PathBuf {
        self.toolchain_root.join("bin").join("go")
    }

    /// Shell `export` lines for operators who want the bindings in a login shell.
    #[must_use]
    pub fn to_shell_exports(&self) -> String {
        self.vars()
            .into_iter()
            .map(|(name, value)| format!("export {name}=\"{}\"\n", Path::new(&value).display()))
            .collect()
    }
}

fn flag(enabled: bool, on: &str, off: &str) -> OsString {
    OsString::from(if enabled { on } else { off })
}
