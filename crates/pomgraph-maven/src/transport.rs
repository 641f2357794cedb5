//! How documents are fetched from a repository URL.
//!
//! The downloader only needs "GET this URL as text". [`RepositoryTransport`]
//! is that seam: [`crate::download::HttpTransport`] talks to real
//! repositories, [`InMemoryTransport`] serves canned documents for offline
//! resolution and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use pomgraph_core::failure::FailureCause;
use pomgraph_core::settings::Credentials;

/// Fetches repository documents.
#[async_trait]
pub trait RepositoryTransport: Send + Sync {
    /// GET `url` as text. `Ok(None)` means the repository does not have it.
    async fn get_text(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>, FailureCause>;
}

/// A transport backed by a fixed map of URL to document.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    documents: HashMap<String, String>,
    failures: HashMap<String, FailureCause>,
    latency: Option<Duration>,
    requests: AtomicUsize,
    requested_urls: Mutex<Vec<String>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn with_document(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.documents.insert(url.into(), body.into());
    }

    /// Answer requests for `url` with `cause` instead of a document.
    pub fn with_failure(mut self, url: impl Into<String>, cause: FailureCause) -> Self {
        self.failures.insert(url.into(), cause);
        self
    }

    /// Delay every response, to make concurrent requests overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of requests received for one URL.
    pub fn requests_for(&self, url: &str) -> usize {
        self.requested_urls
            .lock()
            .map(|urls| urls.iter().filter(|u| *u == url).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RepositoryTransport for InMemoryTransport {
    async fn get_text(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Option<String>, FailureCause> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut urls) = self.requested_urls.lock() {
            urls.push(url.to_string());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(cause) = self.failures.get(url) {
            return Err(cause.clone());
        }
        Ok(self.documents.get(url).cloned())
    }
}
