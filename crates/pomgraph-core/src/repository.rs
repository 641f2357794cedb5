//! Maven repository declarations and the standard repository layout.

use std::collections::HashSet;

/// Maven Central base URL.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Id Maven uses for the central repository.
pub const MAVEN_CENTRAL_ID: &str = "central";

/// A declared Maven repository.
///
/// Credentials are not part of the declaration; they are looked up by `id`
/// through the settings collaborator when a request is made.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenRepository {
    pub id: String,
    pub url: String,
    pub releases: bool,
    pub snapshots: bool,
}

impl MavenRepository {
    pub fn new(id: impl Into<String>, url: &str) -> Self {
        Self {
            id: id.into(),
            url: url.trim().trim_end_matches('/').to_string(),
            releases: true,
            snapshots: true,
        }
    }

    /// Construct the default Maven Central repository.
    pub fn maven_central() -> Self {
        Self {
            id: MAVEN_CENTRAL_ID.to_string(),
            url: MAVEN_CENTRAL_URL.to_string(),
            releases: true,
            snapshots: false,
        }
    }

    /// Whether this repository may serve the given version under its
    /// release/snapshot policy.
    pub fn accepts(&self, version: &str) -> bool {
        if version.ends_with("-SNAPSHOT") {
            self.snapshots
        } else {
            self.releases
        }
    }

    /// Whether the repository lives on this machine (`file:` or localhost).
    pub fn is_local(&self) -> bool {
        self.url.starts_with("file:")
            || self.url.contains("://localhost")
            || self.url.contains("://127.0.0.1")
    }

    /// Standard Maven layout path for a given coordinate.
    ///
    /// `com.fasterxml.jackson:jackson-bom:2.17.0` becomes
    /// `com/fasterxml/jackson/jackson-bom/2.17.0`
    pub fn coordinate_path(group: &str, artifact: &str, version: &str) -> String {
        format!("{}/{}/{}", group.replace('.', "/"), artifact, version)
    }

    /// Layout path of a POM file. `file_version` differs from `version` only
    /// for timestamped SNAPSHOT files.
    pub fn pom_path(group: &str, artifact: &str, version: &str, file_version: &str) -> String {
        format!(
            "{}/{artifact}-{file_version}.pom",
            Self::coordinate_path(group, artifact, version)
        )
    }

    /// Layout path of the artifact-level `maven-metadata.xml` (version listing).
    pub fn metadata_path(group: &str, artifact: &str) -> String {
        format!("{}/{}/maven-metadata.xml", group.replace('.', "/"), artifact)
    }

    /// Layout path of the version-level `maven-metadata.xml` (SNAPSHOT resolution).
    pub fn snapshot_metadata_path(group: &str, artifact: &str, version: &str) -> String {
        format!(
            "{}/maven-metadata.xml",
            Self::coordinate_path(group, artifact, version)
        )
    }

    /// Full URL to a layout path within this repository.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url, path)
    }
}

/// Deduplicate repositories by id, keeping the first (nearest) declaration.
pub fn dedupe(repos: impl IntoIterator<Item = MavenRepository>) -> Vec<MavenRepository> {
    let mut seen = HashSet::new();
    repos
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Mirror, RepositorySettings, Settings};

    #[test]
    fn bom_pom_url_on_central() {
        let url = MavenRepository::maven_central().url_for(&MavenRepository::pom_path(
            "com.fasterxml.jackson",
            "jackson-bom",
            "2.17.0",
            "2.17.0",
        ));
        assert_eq!(
            url,
            "https://repo.maven.apache.org/maven2/com/fasterxml/jackson/jackson-bom/2.17.0/jackson-bom-2.17.0.pom"
        );
    }

    #[test]
    fn pom_url_through_a_mirror() {
        let settings = Settings {
            mirrors: vec![Mirror {
                id: "corp".to_string(),
                url: "https://nexus.corp.test/repository/public/".to_string(),
                mirror_of: "external:*".to_string(),
            }],
            ..Settings::default()
        };
        let mirrored = settings.effective_repository(&MavenRepository::maven_central());
        assert_eq!(mirrored.id, "corp");
        assert_eq!(
            mirrored.url_for(&MavenRepository::pom_path("org.slf4j", "slf4j-api", "2.0.13", "2.0.13")),
            "https://nexus.corp.test/repository/public/org/slf4j/slf4j-api/2.0.13/slf4j-api-2.0.13.pom"
        );

        let local = MavenRepository::new("local", "file:///srv/m2");
        assert_eq!(settings.effective_repository(&local), local);
    }

    #[test]
    fn timestamped_snapshot_pom_path() {
        let path = MavenRepository::pom_path("com.example", "lib", "1.0-SNAPSHOT", "1.0-20240101.120000-5");
        assert_eq!(
            path,
            "com/example/lib/1.0-SNAPSHOT/lib-1.0-20240101.120000-5.pom"
        );
    }

    #[test]
    fn metadata_path_format() {
        assert_eq!(
            MavenRepository::metadata_path("com.google.guava", "guava"),
            "com/google/guava/guava/maven-metadata.xml"
        );
    }

    #[test]
    fn trailing_slash_trimmed() {
        let repo = MavenRepository::new("x", "https://repo.example.com/maven/");
        assert_eq!(repo.url, "https://repo.example.com/maven");
    }

    #[test]
    fn release_snapshot_policy() {
        let central = MavenRepository::maven_central();
        assert!(central.accepts("1.0"));
        assert!(!central.accepts("1.0-SNAPSHOT"));
    }

    #[test]
    fn dedupe_keeps_first_by_id() {
        let repos = dedupe(vec![
            MavenRepository::new("a", "https://near.example.com"),
            MavenRepository::new("b", "https://b.example.com"),
            MavenRepository::new("a", "https://far.example.com"),
        ]);
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].url, "https://near.example.com");
    }
}
