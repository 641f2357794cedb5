use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::repository::MavenRepository;
use crate::settings::{Credentials, Mirror, Settings};

/// User configuration loaded from `~/.pomgraph/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub resolver: ResolverSection,

    /// User properties; these take precedence over every POM property.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Repositories consulted after the ones declared in POMs.
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,

    #[serde(default)]
    pub mirrors: Vec<MirrorEntry>,

    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

/// Resolver tuning from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSection {
    #[serde(default = "default_max_concurrent_fetches", rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_fetch_timeout_secs", rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,
    /// On-disk POM/metadata cache that outlives a single run.
    #[serde(default, rename = "cache-dir")]
    pub cache_dir: Option<String>,
    #[serde(default, rename = "active-profiles")]
    pub active_profiles: Vec<String>,
    /// JDK version used to evaluate `<activation><jdk>`.
    #[serde(default, rename = "jdk-version")]
    pub jdk_version: Option<String>,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            cache_dir: None,
            active_profiles: Vec::new(),
            jdk_version: None,
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// A repository from `[[repositories]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub id: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub releases: bool,
    #[serde(default = "default_true")]
    pub snapshots: bool,
}

/// A mirror from `[[mirrors]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorEntry {
    pub id: String,
    pub url: String,
    #[serde(rename = "mirror-of")]
    pub mirror_of: String,
}

/// Credentials from `[servers.<id>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ResolverConfig {
    /// Load the configuration from `~/.pomgraph/config.toml`, or return
    /// defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::from_path(&Self::default_path())
    }

    /// Load the configuration from an explicit path; a missing file yields
    /// defaults.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            pomgraph_util::errors::PomgraphError::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            }
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            pomgraph_util::errors::PomgraphError::Config {
                message: format!("Failed to parse configuration: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Configured repositories followed by Maven Central (unless a
    /// configured repository already uses the `central` id).
    pub fn default_repositories(&self) -> Vec<MavenRepository> {
        let mut repos: Vec<MavenRepository> = self
            .repositories
            .iter()
            .map(|r| MavenRepository {
                releases: r.releases,
                snapshots: r.snapshots,
                ..MavenRepository::new(r.id.clone(), &r.url)
            })
            .collect();
        let central = MavenRepository::maven_central();
        if !repos.iter().any(|r| r.id == central.id) {
            repos.push(central);
        }
        repos
    }

    pub fn settings(&self) -> Settings {
        Settings {
            mirrors: self
                .mirrors
                .iter()
                .map(|m| Mirror {
                    id: m.id.clone(),
                    url: m.url.clone(),
                    mirror_of: m.mirror_of.clone(),
                })
                .collect(),
            servers: self
                .servers
                .iter()
                .map(|(id, s)| {
                    (
                        id.clone(),
                        Credentials {
                            username: s.username.clone(),
                            password: s.password.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resolver.fetch_timeout_secs)
    }
}

/// Returns the path to the pomgraph data directory (`~/.pomgraph/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".pomgraph")
}
