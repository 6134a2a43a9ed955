//! Toolchain fetch: download, verify, unpack, clean up.

use provision_core::config::ToolchainRelease;
use provision_core::{Downloader, Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::extract::replace_from_archive;

/// Downloads the pinned toolchain release and installs it at its root.
pub struct ToolchainFetcher {
    downloader: Arc<dyn Downloader>,
    staging_parent: Option<PathBuf>,
}

impl ToolchainFetcher {
    /// Create a fetcher that downloads through `downloader`.
    #[must_use]
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            staging_parent: None,
        }
    }

    /// Download archives under `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_staging_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_parent = Some(dir.into());
        self
    }

    /// Fetch `release` and replace its installation root.
    ///
    /// The downloaded archive is removed whether or not the fetch succeeds.
    /// Returns the path of the toolchain driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] when the download fails,
    /// [`Error::ChecksumMismatch`] when a configured digest does not match and
    /// [`Error::Extraction`] when the archive is not a usable toolchain.
    pub async fn fetch(&self, release: &ToolchainRelease) -> Result<PathBuf> {
        let staging = self.staging_dir()?;
        let archive = staging.path().join(release.archive_name());

        let result = self.download_and_install(release, &archive).await;

        if archive.exists() {
            let _ = tokio::fs::remove_file(&archive).await;
        }
        result
    }

    async fn download_and_install(
        &self,
        release: &ToolchainRelease,
        archive: &Path,
    ) -> Result<PathBuf> {
        info!(version = %release.version, url = %release.url, "Downloading toolchain");
        let bytes = self.downloader.download(&release.url, archive).await?;
        debug!(bytes, archive = %archive.display(), "Toolchain archive downloaded");

        if let Some(expected) = &release.sha256 {
            let actual = file_sha256(archive).await?;
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(Error::checksum_mismatch(expected.trim(), actual));
            }
            debug!(sha256 = %actual, "Toolchain archive checksum verified");
        }

        let archive = archive.to_path_buf();
        let install_root = release.install_root.clone();
        tokio::task::spawn_blocking(move || {
            replace_from_archive(&archive, &install_root, Path::new("bin/go"))
        })
        .await
        .map_err(|e| Error::extraction(format!("extraction task failed: {e}")))??;

        info!(root = %release.install_root.display(), "Toolchain installed");
        Ok(release.driver())
    }

    fn staging_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("provision-fetch-");
        match &self.staging_parent {
            Some(parent) => builder
                .tempdir_in(parent)
                .map_err(|e| Error::io(e, parent, "create staging directory")),
            None => builder
                .tempdir()
                .map_err(|e| Error::io(e, std::env::temp_dir(), "create staging directory")),
        }
    }
}

async fn file_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io(e, path, "open"))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| Error::io(e, path, "read"))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
