//! Network downloads for toolchain artifacts (package keys, .deb files).

use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{CiError, Result};

/// Retrieves the body of a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP(S) fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cibuild/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CiError::Fetch {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Fetching");
        let fetch_err = |e: reqwest::Error| CiError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(fetch_err)?
            .error_for_status()
            .map_err(fetch_err)?;
        let bytes = response.bytes().await.map_err(fetch_err)?;
        Ok(bytes.to_vec())
    }
}

/// Download `url` into `dest`, returning the SHA-256 hex digest of the body.
pub async fn download_to(fetcher: &dyn Fetcher, url: &str, dest: &Path) -> Result<String> {
    let body = fetcher.fetch(url).await?;
    tokio::fs::write(dest, &body)
        .await
        .map_err(|e| CiError::io(dest, e))?;

    let digest = hex::encode(Sha256::digest(&body));
    info!(
        url,
        path = %dest.display(),
        bytes = body.len(),
        sha256 = %digest,
        "Downloaded artifact"
    );
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::StaticFetcher;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_download_writes_file_and_digest() {
        let fetcher = StaticFetcher::new().with("http://example.test/pkg.deb", b"abc".to_vec());
        let dir = tempdir().unwrap();
        let dest = dir.path().join("pkg.deb");

        let digest = download_to(&fetcher, "http://example.test/pkg.deb", &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
        // sha256("abc")
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fetcher.requests(), vec!["http://example.test/pkg.deb"]);
    }

    #[tokio::test]
    async fn test_download_propagates_fetch_error() {
        let fetcher = StaticFetcher::new();
        let dir = tempdir().unwrap();
        let err = download_to(&fetcher, "http://example.test/missing", &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CiError::Fetch { .. }));
        assert!(!dir.path().join("x").exists());
    }
}
