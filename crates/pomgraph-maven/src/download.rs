//! HTTP(S) and `file:` access to Maven repositories.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use pomgraph_core::failure::FailureCause;
use pomgraph_core::settings::Credentials;

use crate::auth;
use crate::transport::RepositoryTransport;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Build a shared reqwest client for repository downloads.
pub fn build_client(request_timeout: Duration) -> miette::Result<Client> {
    Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("pomgraph/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            pomgraph_util::errors::PomgraphError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Download raw bytes from a URL, with authentication and retries.
///
/// Returns `Ok(None)` for 404 (artifact not found in this repo). Server
/// errors, timeouts and connection failures are retried.
pub async fn download_bytes(
    client: &Client,
    url: &str,
    credentials: Option<&Credentials>,
) -> Result<Option<Vec<u8>>, FailureCause> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        let req = auth::apply_auth(client.get(url), credentials);

        match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status}");
                    continue;
                }
                if !status.is_success() {
                    return Err(FailureCause::Network(format!("HTTP {status}")));
                }

                let bytes = resp.bytes().await.map_err(|e| {
                    FailureCause::Network(format!("failed to read response: {e}"))
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::debug!("Retrying {url} after attempt {}: {e}", attempt + 1);
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(FailureCause::Network(format!("request failed: {e}")));
            }
        }
    }

    Err(FailureCause::Network(format!(
        "failed after {MAX_RETRIES} attempts: {last_err}"
    )))
}

/// Download a text document (POM, metadata).
pub async fn download_text(
    client: &Client,
    url: &str,
    credentials: Option<&Credentials>,
) -> Result<Option<String>, FailureCause> {
    match download_bytes(client, url, credentials).await? {
        Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
        None => Ok(None),
    }
}

/// Read a document from a `file:` repository.
async fn read_local(path: &Path) -> Result<Option<String>, FailureCause> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FailureCause::Network(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// The production transport: reqwest for `http(s)://`, the filesystem for
/// `file:` URLs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> miette::Result<Self> {
        Ok(Self {
            client: build_client(request_timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RepositoryTransport for HttpTransport {
    async fn get_text(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>, FailureCause> {
        if let Some(path) = url.strip_prefix("file://").or_else(|| url.strip_prefix("file:")) {
            return read_local(Path::new(path)).await;
        }
        download_text(&self.client, url, credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_urls_read_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let pom = tmp.path().join("lib-1.0.pom");
        std::fs::write(&pom, "<project/>").unwrap();

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let url = format!("file://{}", pom.display());
        assert_eq!(
            transport.get_text(&url, None).await,
            Ok(Some("<project/>".to_string()))
        );

        let missing = format!("file://{}", tmp.path().join("nope.pom").display());
        assert_eq!(transport.get_text(&missing, None).await, Ok(None));
    }
}
