//! Staged unpacking of the toolchain archive.
//!
//! The archive is unpacked into a temporary directory next to the
//! installation root. Only once the unpacked tree is known to be a toolchain
//! is the old root removed and the new tree renamed into place, so a corrupt
//! download never touches an existing installation.

use flate2::read::GzDecoder;
use provision_core::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

/// Replace `install_root` with the contents of the `.tar.gz` at `archive`.
///
/// An archive whose only top-level entry is a directory (`go/`) is unwrapped.
/// The unpacked tree must contain `required` (relative path) or the install
/// root is left as it was.
///
/// This is blocking; call it from `spawn_blocking`.
///
/// # Errors
///
/// Returns [`Error::Extraction`] when the archive cannot be decoded or lacks
/// `required`, and an I/O error when the root cannot be replaced.
pub fn replace_from_archive(archive: &Path, install_root: &Path, required: &Path) -> Result<()> {
    let parent = install_root
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create"))?;

    let staging = tempfile::Builder::new()
        .prefix(".provision-staging-")
        .tempdir_in(parent)
        .map_err(|e| Error::io(e, parent, "create staging directory"))?;
    let unpack_dir = staging.path().join("unpack");

    unpack(archive, &unpack_dir)?;

    let tree = tree_root(&unpack_dir)?;
    if !tree.join(required).is_file() {
        return Err(Error::extraction(format!(
            "archive does not contain {}",
            required.display()
        )));
    }

    if install_root.exists() {
        debug!(root = %install_root.display(), "Removing previous installation");
        std::fs::remove_dir_all(install_root)
            .map_err(|e| Error::io(e, install_root, "remove"))?;
    }
    std::fs::rename(&tree, install_root).map_err(|e| Error::io(e, install_root, "rename"))?;

    debug!(root = %install_root.display(), "Installation root replaced");
    Ok(())
}

fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|e| Error::extraction(format!("failed to unpack archive: {e}")))
}

/// The directory holding the toolchain: the single top-level directory when
/// there is exactly one, otherwise the unpack directory itself.
fn tree_root(unpack_dir: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(unpack_dir)
        .map_err(|e| Error::io(e, unpack_dir, "read"))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::io(e, unpack_dir, "read"))?;

    if entries.len() == 1 && entries[0].path().is_dir() {
        return Ok(entries.remove(0).path());
    }
    if entries.is_empty() {
        return Err(Error::extraction("archive is empty"));
    }
    Ok(unpack_dir.to_path_buf())
}
