use std::path::Path;

use futures_util::StreamExt;
use log::debug;
use reqwest::{Client, Response};
use sha2::{Digest, Sha512};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{InstallError, Result};

/// Streams remote files to a sink while hashing them with SHA-512.
///
/// Every call owns its own digest, so one `Downloader` can serve any number of
/// sequential or concurrent downloads.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Downloader { client }
    }

    /// Downloads `url` to `dest`, replacing whatever is there.
    ///
    /// `dest` is only opened once the server has answered successfully, so a
    /// failed request leaves an existing file untouched. On a digest mismatch
    /// the written file is left in place for inspection.
    pub async fn download<P>(&self, expected_sha512: &str, url: &str, dest: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let dest = dest.as_ref();
        debug!("Downloading {} to {}", url, dest.display());
        let response = self.request(url).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        copy_verified(
            response,
            expected_sha512,
            url,
            &mut file,
            &dest.to_string_lossy(),
        )
        .await
    }

    /// Downloads `url` into memory, verifying it the same way as [`Self::download`].
    pub async fn download_to_memory(
        &self,
        expected_sha512: &str,
        url: &str,
        name: &str,
    ) -> Result<Vec<u8>> {
        debug!("Downloading {} into memory", url);
        let response = self.request(url).await?;
        let mut buffer = Vec::new();
        copy_verified(response, expected_sha512, url, &mut buffer, name).await?;
        Ok(buffer)
    }

    async fn request(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| InstallError::DownloadFailed {
                url: url.to_string(),
                source,
            })
    }
}

async fn copy_verified<W>(
    response: Response,
    expected_sha512: &str,
    url: &str,
    sink: &mut W,
    name: &str,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut hasher = Sha512::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| InstallError::DownloadFailed {
            url: url.to_string(),
            source,
        })?;
        hasher.update(&chunk);
        sink.write_all(&chunk).await?;
    }
    sink.flush().await?;

    let actual = hex::encode(hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected_sha512) {
        return Err(InstallError::HashMismatch {
            file: name.to_string(),
            expected: expected_sha512.to_lowercase(),
            actual,
        });
    }
    Ok(())
}
