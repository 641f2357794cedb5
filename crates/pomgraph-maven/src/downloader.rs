//! The POM and metadata downloader shared by one resolution run.
//!
//! Every repository request goes through three layers: the settings lookup
//! (mirror substitution and credentials), the coalescing [`FetchCache`]
//! keyed by URL, and a semaphore bounding concurrent requests with a
//! per-request timeout. A failed request is recorded against the repository
//! and the next repository in the list is tried.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use pomgraph_core::config::ResolverConfig;
use pomgraph_core::failure::{DownloadFailure, FailureCause};
use pomgraph_core::gav::{GroupArtifact, GroupArtifactVersion};
use pomgraph_core::pom::Pom;
use pomgraph_core::repository::MavenRepository;
use pomgraph_core::settings::{RepositorySettings, Settings};

use crate::cache::LocalCache;
use crate::coalesce::FetchCache;
use crate::download::HttpTransport;
use crate::metadata::{self, MavenMetadata};
use crate::transport::RepositoryTransport;
use crate::xml;

const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

type FetchResult<T> = Result<Arc<T>, FailureCause>;
type MetadataKey = (GroupArtifact, Vec<String>);

/// Downloads and caches POMs and `maven-metadata.xml` for one resolution run.
pub struct MavenPomDownloader {
    transport: Arc<dyn RepositoryTransport>,
    settings: Arc<dyn RepositorySettings>,
    disk_cache: Option<LocalCache>,
    permits: Semaphore,
    fetch_timeout: Duration,
    poms: FetchCache<String, FetchResult<Pom>>,
    metadata: FetchCache<String, FetchResult<MavenMetadata>>,
    merged_metadata: FetchCache<MetadataKey, Result<Arc<MavenMetadata>, DownloadFailure>>,
}

impl MavenPomDownloader {
    pub fn new(
        transport: Arc<dyn RepositoryTransport>,
        settings: Arc<dyn RepositorySettings>,
    ) -> Self {
        Self {
            transport,
            settings,
            disk_cache: None,
            permits: Semaphore::new(DEFAULT_MAX_CONCURRENT_FETCHES),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            poms: FetchCache::new(),
            metadata: FetchCache::new(),
            merged_metadata: FetchCache::new(),
        }
    }

    /// A downloader over HTTP configured from the user configuration.
    pub fn from_config(config: &ResolverConfig) -> miette::Result<Self> {
        let transport = HttpTransport::new(config.fetch_timeout())?;
        let settings: Settings = config.settings();
        let mut downloader = Self::new(Arc::new(transport), Arc::new(settings))
            .with_max_concurrent_fetches(config.resolver.max_concurrent_fetches)
            .with_fetch_timeout(config.fetch_timeout());
        if let Some(dir) = &config.resolver.cache_dir {
            downloader = downloader.with_disk_cache(LocalCache::new(dir));
        }
        Ok(downloader)
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.permits = Semaphore::new(max.max(1));
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_disk_cache(mut self, cache: LocalCache) -> Self {
        self.disk_cache = Some(cache);
        self
    }

    /// Drop every cached result, negative ones included.
    pub async fn reset(&self) {
        self.poms.clear().await;
        self.metadata.clear().await;
        self.merged_metadata.clear().await;
    }

    /// Download a POM from the first repository that has it.
    ///
    /// Repositories whose release/snapshot policy rejects the version are
    /// skipped. SNAPSHOT versions are looked up under their timestamped file
    /// name when the repository publishes version-level metadata.
    pub async fn download_pom(
        &self,
        gav: &GroupArtifactVersion,
        repositories: &[MavenRepository],
    ) -> Result<Arc<Pom>, DownloadFailure> {
        let mut failure = DownloadFailure::new(gav.to_string());
        let Some(version) = gav.version.as_deref().filter(|v| !v.is_empty()) else {
            return Err(failure);
        };

        for declared in repositories {
            if !declared.accepts(version) {
                continue;
            }
            let repo = self.settings.effective_repository(declared);
            let file_version = if gav.is_snapshot() {
                self.snapshot_file_version(gav, version, &repo).await
            } else {
                version.to_string()
            };
            let layout = MavenRepository::pom_path(
                &gav.group_id,
                &gav.artifact_id,
                version,
                &file_version,
            );

            match self.fetch_pom(&repo, &layout, !gav.is_snapshot()).await {
                Ok(pom) => {
                    tracing::debug!("Resolved POM {gav} from {}", repo.id);
                    return Ok(pom);
                }
                Err(cause) => {
                    tracing::debug!("POM {gav} not available from {}: {cause}", repo.id);
                    failure.push_attempt(repo.id.clone(), cause);
                }
            }
        }

        Err(failure)
    }

    /// Artifact-level metadata merged across every repository that publishes
    /// it. Fails only when no repository does.
    pub async fn download_metadata(
        &self,
        ga: &GroupArtifact,
        repositories: &[MavenRepository],
    ) -> Result<Arc<MavenMetadata>, DownloadFailure> {
        let key = (
            ga.clone(),
            repositories.iter().map(|r| r.id.clone()).collect(),
        );
        self.merged_metadata
            .get_or_fetch(key, || self.merge_metadata(ga, repositories))
            .await
    }

    async fn merge_metadata(
        &self,
        ga: &GroupArtifact,
        repositories: &[MavenRepository],
    ) -> Result<Arc<MavenMetadata>, DownloadFailure> {
        let layout = MavenRepository::metadata_path(&ga.group_id, &ga.artifact_id);
        let effective: Vec<MavenRepository> = repositories
            .iter()
            .map(|r| self.settings.effective_repository(r))
            .collect();
        let effective = pomgraph_core::repository::dedupe(effective);

        let results = join_all(
            effective
                .iter()
                .map(|repo| self.fetch_metadata(repo, &layout)),
        )
        .await;

        let mut merged: Option<MavenMetadata> = None;
        let mut failure = DownloadFailure::new(format!("{ga} (maven-metadata.xml)"));
        for (repo, result) in effective.iter().zip(results) {
            match result {
                Ok(meta) => match merged.as_mut() {
                    Some(m) => m.merge(meta.as_ref().clone()),
                    None => merged = Some(meta.as_ref().clone()),
                },
                Err(cause) => failure.push_attempt(repo.id.clone(), cause),
            }
        }

        match merged {
            Some(meta) => {
                if !failure.attempts.is_empty() && !failure.is_not_found() {
                    tracing::warn!("Partial metadata for {ga}: {failure}");
                }
                Ok(Arc::new(meta))
            }
            None => Err(failure),
        }
    }

    async fn snapshot_file_version(
        &self,
        gav: &GroupArtifactVersion,
        version: &str,
        repo: &MavenRepository,
    ) -> String {
        let layout =
            MavenRepository::snapshot_metadata_path(&gav.group_id, &gav.artifact_id, version);
        match self.fetch_metadata(repo, &layout).await {
            Ok(meta) => meta
                .timestamped_version("pom", None)
                .unwrap_or_else(|| version.to_string()),
            Err(_) => version.to_string(),
        }
    }

    async fn fetch_pom(
        &self,
        repo: &MavenRepository,
        layout: &str,
        persist: bool,
    ) -> FetchResult<Pom> {
        let url = repo.url_for(layout);
        self.poms
            .get_or_fetch(url.clone(), || async move {
                let cached = persist
                    .then(|| self.disk_cache.as_ref())
                    .flatten()
                    .and_then(|cache| cache.get(&repo.id, layout));

                let text = match cached {
                    Some(text) => text,
                    None => {
                        let text = self.fetch_text(repo, &url).await?;
                        if persist {
                            self.persist(repo, layout, &text);
                        }
                        text
                    }
                };

                xml::parse_pom(&text, &url)
                    .map(Arc::new)
                    .map_err(|e| FailureCause::Parse(e.to_string()))
            })
            .await
    }

    async fn fetch_metadata(&self, repo: &MavenRepository, layout: &str) -> FetchResult<MavenMetadata> {
        let url = repo.url_for(layout);
        self.metadata
            .get_or_fetch(url.clone(), || async move {
                let text = self.fetch_text(repo, &url).await?;
                metadata::parse_metadata(&text, &url)
                    .map(Arc::new)
                    .map_err(|e| FailureCause::Parse(e.to_string()))
            })
            .await
    }

    fn persist(&self, repo: &MavenRepository, layout: &str, text: &str) {
        if let Some(cache) = &self.disk_cache {
            if let Err(e) = cache.put(&repo.id, layout, text) {
                tracing::warn!("Failed to cache {layout}: {e}");
            }
        }
    }

    /// One bounded, timed request.
    async fn fetch_text(&self, repo: &MavenRepository, url: &str) -> Result<String, FailureCause> {
        let credentials = self.settings.credentials(&repo.id);
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FailureCause::Network(e.to_string()))?;

        tracing::debug!("GET {url}");
        let request = self.transport.get_text(url, credentials.as_ref());
        match tokio::time::timeout(self.fetch_timeout, request).await {
            Err(_) => Err(FailureCause::Timeout(self.fetch_timeout)),
            Ok(Ok(Some(text))) => Ok(text),
            Ok(Ok(None)) => Err(FailureCause::NotFound),
            Ok(Err(cause)) => Err(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    const REPO: &str = "https://repo.test/maven2";

    fn repo() -> MavenRepository {
        MavenRepository::new("test", REPO)
    }

    fn pom_xml(g: &str, a: &str, v: &str) -> String {
        format!("<project><groupId>{g}</groupId><artifactId>{a}</artifactId><version>{v}</version></project>")
    }

    fn downloader(transport: InMemoryTransport) -> (Arc<InMemoryTransport>, MavenPomDownloader) {
        let transport = Arc::new(transport);
        let downloader = MavenPomDownloader::new(transport.clone(), Arc::new(Settings::default()));
        (transport, downloader)
    }

    #[tokio::test]
    async fn timestamped_snapshot_pom() {
        let base = format!("{REPO}/com/example/lib/1.0-SNAPSHOT");
        let (_, downloader) = downloader(
            InMemoryTransport::new()
                .with_document(
                    format!("{base}/maven-metadata.xml"),
                    "<metadata><version>1.0-SNAPSHOT</version><versioning><snapshot>\
                     <timestamp>20240101.120000</timestamp><buildNumber>5</buildNumber>\
                     </snapshot></versioning></metadata>",
                )
                .with_document(
                    format!("{base}/lib-1.0-20240101.120000-5.pom"),
                    pom_xml("com.example", "lib", "1.0-SNAPSHOT"),
                ),
        );
        let gav = GroupArtifactVersion::of("com.example", "lib", "1.0-SNAPSHOT");
        let pom = downloader.download_pom(&gav, &[repo()]).await.unwrap();
        assert_eq!(pom.artifact_id, "lib");
    }

    #[tokio::test]
    async fn failure_lists_every_repository_attempt() {
        let corp = MavenRepository::new("corp", "https://corp.test/maven");
        let (_, downloader) = downloader(InMemoryTransport::new().with_failure(
            "https://corp.test/maven/com/x/lib/1.0/lib-1.0.pom",
            FailureCause::Network("HTTP 503".into()),
        ));
        let gav = GroupArtifactVersion::of("com.x", "lib", "1.0");
        let failure = downloader
            .download_pom(&gav, &[repo(), corp])
            .await
            .unwrap_err();
        assert_eq!(failure.artifact, "com.x:lib:1.0");
        assert_eq!(failure.attempts.len(), 2);
        assert_eq!(failure.attempts[0].repository, "test");
        assert_eq!(failure.attempts[0].cause, FailureCause::NotFound);
        assert_eq!(failure.attempts[1].cause, FailureCause::Network("HTTP 503".into()));
    }

    #[tokio::test]
    async fn release_policy_skips_snapshot_only_repositories() {
        let snapshots_only = MavenRepository {
            releases: false,
            ..MavenRepository::new("snapshots", "https://snap.test")
        };
        let (transport, downloader) = downloader(InMemoryTransport::new());
        let gav = GroupArtifactVersion::of("com.x", "lib", "1.0");
        let failure = downloader
            .download_pom(&gav, &[snapshots_only])
            .await
            .unwrap_err();
        assert!(failure.attempts.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn slow_repository_times_out() {
        let (_, downloader) = downloader(
            InMemoryTransport::new().with_latency(Duration::from_millis(200)),
        );
        let downloader = downloader.with_fetch_timeout(Duration::from_millis(10));
        let gav = GroupArtifactVersion::of("com.x", "lib", "1.0");
        let failure = downloader.download_pom(&gav, &[repo()]).await.unwrap_err();
        assert!(matches!(failure.attempts[0].cause, FailureCause::Timeout(_)));
    }

    #[tokio::test]
    async fn release_poms_persist_to_disk_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let url = format!("{REPO}/com/x/lib/1.0/lib-1.0.pom");
        let (_, downloader) = downloader(
            InMemoryTransport::new().with_document(url, pom_xml("com.x", "lib", "1.0")),
        );
        let downloader = downloader.with_disk_cache(LocalCache::new(tmp.path()));
        let gav = GroupArtifactVersion::of("com.x", "lib", "1.0");
        downloader.download_pom(&gav, &[repo()]).await.unwrap();

        let (offline, fresh) = self::downloader(InMemoryTransport::new());
        let fresh = fresh.with_disk_cache(LocalCache::new(tmp.path()));
        let pom = fresh.download_pom(&gav, &[repo()]).await.unwrap();
        assert_eq!(pom.version.as_deref(), Some("1.0"));
        assert_eq!(offline.request_count(), 0);
    }
}
