use pomgraph_core::config::ResolverConfig;
use pomgraph_core::repository::MavenRepository;
use pomgraph_core::settings::RepositorySettings;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn defaults_when_file_missing() {
    let config = ResolverConfig::from_path(std::path::Path::new("/nonexistent/config.toml")).unwrap();
    assert_eq!(config.resolver.max_concurrent_fetches, 8);
    assert_eq!(config.resolver.fetch_timeout_secs, 30);
    let repos = config.default_repositories();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].id, "central");
}

#[test]
fn full_config_parses() {
    let config = ResolverConfig::parse_toml(
        r#"
[resolver]
max-concurrent-fetches = 2
fetch-timeout-secs = 5
active-profiles = ["ci"]
jdk-version = "17"

[properties]
"revision" = "1.2.3"

[[repositories]]
id = "corp"
url = "https://nexus.corp/releases/"
snapshots = false

[[mirrors]]
id = "proxy"
url = "https://proxy.corp/maven"
mirror-of = "central"

[servers.proxy]
username = "ci"
password = "secret"
"#,
    )
    .unwrap();

    assert_eq!(config.resolver.max_concurrent_fetches, 2);
    assert_eq!(config.fetch_timeout().as_secs(), 5);
    assert_eq!(config.resolver.active_profiles, vec!["ci"]);
    assert_eq!(config.properties.get("revision").map(String::as_str), Some("1.2.3"));

    let repos = config.default_repositories();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].url, "https://nexus.corp/releases");
    assert!(!repos[0].snapshots);
    assert_eq!(repos[1].id, "central");

    let settings = config.settings();
    let effective = settings.effective_repository(&MavenRepository::maven_central());
    assert_eq!(effective.id, "proxy");
    let creds = settings.credentials("proxy").unwrap();
    assert_eq!(creds.username.as_deref(), Some("ci"));
}

#[test]
fn malformed_config_is_an_error() {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "[resolver\nmax-concurrent-fetches = ").unwrap();
    tmp.flush().unwrap();
    let err = ResolverConfig::from_path(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration error"), "got: {err}");
}
