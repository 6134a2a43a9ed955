//! HTTP download of the toolchain archive.

use async_trait::async_trait;
use provision_core::{Downloader, Error, Result};
use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// [`Downloader`] that streams a GET response body to disk.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Create a downloader with a fresh HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a fetch error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("provision/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::fetch("<client>", format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a downloader around an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url, format!("HTTP {status}")));
        }
        let expected = response.content_length();

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io(e, dest, "create"))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read body: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, dest, "write"))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| Error::io(e, dest, "flush"))?;

        if let Some(expected) = expected
            && expected != written
        {
            return Err(Error::fetch(
                url,
                format!("truncated body: expected {expected} bytes, got {written}"),
            ));
        }

        Ok(written)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!(%url, dest = %dest.display(), "Downloading");
        match self.stream_to(url, dest).await {
            Ok(bytes) => {
                debug!(%url, bytes, "Download complete");
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}
