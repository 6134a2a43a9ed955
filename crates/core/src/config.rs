//! Provisioning configuration.
//!
//! Every value has a built-in default describing the naabu build host, so the
//! pipeline runs without any file. A TOML file may override individual keys:
//!
//! ```toml
//! [toolchain]
//! version = "1.24.5"
//! url = "https://go.dev/dl/go1.24.5.linux-arm64.tar.gz"
//! sha256 = "..."
//!
//! [module]
//! version = "latest"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Pinned Go release used to build the target tool.
pub const DEFAULT_GO_VERSION: &str = "1.24.5";

/// Download location of [`DEFAULT_GO_VERSION`].
pub const DEFAULT_GO_URL: &str = "https://go.dev/dl/go1.24.5.linux-amd64.tar.gz";

/// Module path of the target tool's command.
pub const DEFAULT_MODULE_PATH: &str = "github.com/projectdiscovery/naabu/v2/cmd/naabu";

/// Version selector for the module install.
pub const LATEST: &str = "latest";

/// Complete provisioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// OS packages installed before anything else.
    pub packages: PackageSet,
    /// Toolchain release to download.
    pub toolchain: ToolchainRelease,
    /// Workspace layout for module builds.
    pub workspace: WorkspaceLayout,
    /// Remote module to install.
    pub module: ModuleSpec,
}

impl ProvisionConfig {
    /// Load configuration, applying the TOML file at `path` over the defaults.
    ///
    /// `None` yields the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_help(
                format!("Failed to read {}: {e}", path.display()),
                "Pass an existing file with --config or unset PROVISION_CONFIG",
            )
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            Error::Configuration { message, .. } => Error::configuration_with_help(
                format!("{}: {message}", path.display()),
                "Valid sections are [packages], [toolchain], [workspace] and [module]",
            ),
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on invalid TOML or unknown keys.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::configuration(e.message().to_string()))
    }
}

/// The fixed set of OS packages the build needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSet {
    /// Package manager executable.
    pub manager: String,
    /// Packages to install.
    pub names: Vec<String>,
}

impl Default for PackageSet {
    fn default() -> Self {
        Self {
            manager: "apt-get".to_string(),
            names: [
                // C compiler and make for cgo
                "build-essential",
                "ca-certificates",
                "tar",
                "gzip",
                "git",
                "python3",
                "python3-pip",
                // naabu links libpcap through cgo
                "libpcap-dev",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// A version-pinned toolchain release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainRelease {
    /// Release version string.
    pub version: String,
    /// Archive download URL.
    pub url: String,
    /// System-wide installation root, replaced on every run.
    pub install_root: PathBuf,
    /// Expected SHA-256 of the archive, hex encoded. Unchecked when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl Default for ToolchainRelease {
    fn default() -> Self {
        Self {
            version: DEFAULT_GO_VERSION.to_string(),
            url: DEFAULT_GO_URL.to_string(),
            install_root: PathBuf::from("/usr/local/go"),
            sha256: None,
        }
    }
}

impl ToolchainRelease {
    /// Directory holding the toolchain's executables.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.install_root.join("bin")
    }

    /// Path of the toolchain driver executable.
    #[must_use]
    pub fn driver(&self) -> PathBuf {
        self.bin_dir().join("go")
    }

    /// File name used for the downloaded archive.
    #[must_use]
    pub fn archive_name(&self) -> String {
        self.url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map_or_else(|| format!("go{}.tar.gz", self.version), String::from)
    }
}

/// Workspace root and its fixed subdirectories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceLayout {
    /// Workspace root (`GOPATH`).
    pub root: PathBuf,
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/go"),
        }
    }
}

impl WorkspaceLayout {
    /// Source subdirectory.
    #[must_use]
    pub fn source_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Executable subdirectory.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }
}

/// The remote module to build and install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleSpec {
    /// Module path of the command package.
    pub path: String,
    /// Version selector, `latest` by default.
    pub version: String,
}

impl Default for ModuleSpec {
    fn default() -> Self {
        Self {
            path: DEFAULT_MODULE_PATH.to_string(),
            version: LATEST.to_string(),
        }
    }
}

impl ModuleSpec {
    /// Argument passed to `go install`.
    #[must_use]
    pub fn install_target(&self) -> String {
        format!("{}@{}", self.path, self.version)
    }

    /// Name of the executable the install produces.
    ///
    /// This is the last path element, except that a major-version suffix
    /// (`/v2`, `/v3`, ...) names the element before it.
    #[must_use]
    pub fn executable_name(&self) -> &str {
        let mut elements = self.path.trim_end_matches('/').rsplit('/');
        let last = elements.next().unwrap_or(&self.path);
        match elements.next() {
            Some(parent) if is_major_version(last) && !parent.is_empty() => parent,
            _ => last,
        }
    }

    /// Whether the selector floats instead of pinning a version.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.version == LATEST
    }
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_describe_naabu_host() {
        let config = ProvisionConfig::default();
        assert_eq!(config.packages.manager, "apt-get");
        assert!(config.packages.names.contains(&"git".to_string()));
        assert!(config.packages.names.contains(&"libpcap-dev".to_string()));
        assert_eq!(config.toolchain.install_root, PathBuf::from("/usr/local/go"));
        assert_eq!(config.workspace.root, PathBuf::from("/go"));
        assert_eq!(
            config.module.install_target(),
            "github.com/projectdiscovery/naabu/v2/cmd/naabu@latest"
        );
    }

    #[test]
    fn test_executable_name() {
        let module = ModuleSpec::default();
        assert_eq!(module.executable_name(), "naabu");

        let module = ModuleSpec {
            path: "tool".to_string(),
            version: "v1.0.0".to_string(),
        };
        assert_eq!(module.executable_name(), "tool");
        assert!(!module.is_floating());
    }

    #[test]
    fn test_executable_name_skips_major_version_suffix() {
        let named = |path: &str| {
            ModuleSpec {
                path: path.to_string(),
                version: LATEST.to_string(),
            }
            .executable_name()
            .to_string()
        };

        assert_eq!(named("github.com/x/tool/v2"), "tool");
        assert_eq!(named("github.com/x/tool/v10"), "tool");
        assert_eq!(named("github.com/x/tool/v2/"), "tool");
        assert_eq!(named("github.com/x/vtool"), "vtool");
        assert_eq!(named("github.com/x/tool/v"), "v");
        assert_eq!(named("github.com/x/tool/v2beta"), "v2beta");
    }

    #[test]
    fn test_archive_name() {
        let release = ToolchainRelease::default();
        assert_eq!(release.archive_name(), "go1.24.5.linux-amd64.tar.gz");

        let release = ToolchainRelease {
            url: "https://example.com/dl/".to_string(),
            ..ToolchainRelease::default()
        };
        assert_eq!(release.archive_name(), "go1.24.5.tar.gz");
    }

    #[test]
    fn test_workspace_dirs() {
        let layout = WorkspaceLayout {
            root: PathBuf::from("/tmp/ws"),
        };
        assert_eq!(layout.source_dir(), PathBuf::from("/tmp/ws/src"));
        assert_eq!(layout.bin_dir(), PathBuf::from("/tmp/ws/bin"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ProvisionConfig::from_toml(
            r#"
[toolchain]
version = "1.23.0"
url = "https://go.dev/dl/go1.23.0.linux-arm64.tar.gz"

[workspace]
root = "/opt/gopath"
"#,
        )
        .unwrap();

        assert_eq!(config.toolchain.version, "1.23.0");
        assert_eq!(config.toolchain.install_root, PathBuf::from("/usr/local/go"));
        assert_eq!(config.workspace.root, PathBuf::from("/opt/gopath"));
        assert_eq!(config.module, ModuleSpec::default());
        assert_eq!(config.packages, PackageSet::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ProvisionConfig::from_toml("[toolchain]\nchecksum = \"abc\"\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_load_none_is_default() {
        assert_eq!(ProvisionConfig::load(None).unwrap(), ProvisionConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProvisionConfig::load(Some(Path::new("/nonexistent/provision.toml")))
            .unwrap_err();
        match err {
            Error::Configuration { message, help } => {
                assert!(message.contains("/nonexistent/provision.toml"));
                assert!(help.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[module]\nversion = \"v2.3.4\"").unwrap();

        let config = ProvisionConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.module.version, "v2.3.4");
        assert!(!config.module.is_floating());
    }
}
