//! Download seam used by the toolchain fetch.

use async_trait::async_trait;
use std::path::Path;

use crate::Result;

/// Fetches a remote resource into a local file.
///
/// Implementations must not leave `dest` behind when they fail.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns a fetch error on connection failures, non-success responses or
    /// truncated bodies, and an I/O error if `dest` cannot be written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}
