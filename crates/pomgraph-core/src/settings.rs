//! Repository settings: mirror substitution and server credentials.
//!
//! The downloader consults settings only through [`RepositorySettings`], so
//! how credentials are stored or decrypted stays outside the resolver.

use std::collections::BTreeMap;

use crate::repository::MavenRepository;

/// Credentials for a repository id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Opaque lookup consumed by the downloader.
pub trait RepositorySettings: Send + Sync {
    /// The repository requests should actually go to: a mirror when one
    /// matches, otherwise the repository itself.
    fn effective_repository(&self, repo: &MavenRepository) -> MavenRepository;

    /// Credentials for a repository (or mirror) id.
    fn credentials(&self, repository_id: &str) -> Option<Credentials>;
}

/// A `<mirror>`: requests to repositories matching `mirror_of` go to `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    pub id: String,
    pub url: String,
    pub mirror_of: String,
}

impl Mirror {
    /// Maven's `mirrorOf` matching: `*`, `external:*`, comma-separated ids,
    /// and `!id` exclusions.
    pub fn matches(&self, repo: &MavenRepository) -> bool {
        let mut matched = false;
        for pattern in self.mirror_of.split(',').map(str::trim) {
            if let Some(excluded) = pattern.strip_prefix('!') {
                if excluded == repo.id {
                    return false;
                }
            } else if pattern == "*" || pattern == repo.id {
                matched = true;
            } else if pattern == "external:*" && !repo.is_local() {
                matched = true;
            }
        }
        matched
    }
}

/// Mirrors and server credentials.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub mirrors: Vec<Mirror>,
    pub servers: BTreeMap<String, Credentials>,
}

impl RepositorySettings for Settings {
    fn effective_repository(&self, repo: &MavenRepository) -> MavenRepository {
        match self.mirrors.iter().find(|m| m.matches(repo)) {
            Some(mirror) => MavenRepository {
                id: mirror.id.clone(),
                url: mirror.url.trim_end_matches('/').to_string(),
                releases: repo.releases,
                snapshots: repo.snapshots,
            },
            None => repo.clone(),
        }
    }

    fn credentials(&self, repository_id: &str) -> Option<Credentials> {
        self.servers.get(repository_id).cloned()
    }
}
