//! Maven coordinates.

use std::fmt;

/// A `groupId:artifactId` pair, the identity used for conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupArtifact {
    pub group_id: String,
    pub artifact_id: String,
}

impl GroupArtifact {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Parse `"group:artifact"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, artifact) = s.split_once(':')?;
        if group.is_empty() || artifact.is_empty() || artifact.contains(':') {
            return None;
        }
        Some(Self::new(group, artifact))
    }
}

impl fmt::Display for GroupArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

/// A `groupId:artifactId:version` coordinate.
///
/// The version is optional on requested dependencies, where its absence means
/// "look up the managed version".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupArtifactVersion {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
}

impl GroupArtifactVersion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
        }
    }

    /// Shorthand for a coordinate with a known version.
    pub fn of(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self::new(group_id, artifact_id, Some(version.to_string()))
    }

    /// Parse `"group:artifact"` or `"group:artifact:version"`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Some(Self::new(*g, *a, None)),
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Some(Self::of(g, a, v))
            }
            _ => None,
        }
    }

    pub fn group_artifact(&self) -> GroupArtifact {
        GroupArtifact::new(self.group_id.clone(), self.artifact_id.clone())
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self::new(
            self.group_id.clone(),
            self.artifact_id.clone(),
            Some(version.into()),
        )
    }

    pub fn version_or_empty(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }

    pub fn is_snapshot(&self) -> bool {
        self.version
            .as_deref()
            .is_some_and(|v| v.ends_with("-SNAPSHOT"))
    }
}

impl fmt::Display for GroupArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}:{}:{}", self.group_id, self.artifact_id, v),
            None => write!(f, "{}:{}", self.group_id, self.artifact_id),
        }
    }
}

/// Identity of a dependency for management lookups and conflict resolution:
/// `(groupId, artifactId, type, classifier)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey {
    pub group_id: String,
    pub artifact_id: String,
    pub type_: String,
    pub classifier: Option<String>,
}

impl DependencyKey {
    pub fn new(
        group_id: &str,
        artifact_id: &str,
        type_: Option<&str>,
        classifier: Option<&str>,
    ) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            type_: type_.filter(|t| !t.is_empty()).unwrap_or("jar").to_string(),
            classifier: classifier.filter(|c| !c.is_empty()).map(str::to_string),
        }
    }

    pub fn group_artifact(&self) -> GroupArtifact {
        GroupArtifact::new(self.group_id.clone(), self.artifact_id.clone())
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if self.type_ != "jar" || self.classifier.is_some() {
            write!(f, ":{}", self.type_)?;
        }
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_version() {
        let gav = GroupArtifactVersion::parse("com.x:lib:2.0").unwrap();
        assert_eq!(gav.version.as_deref(), Some("2.0"));
        assert_eq!(gav.to_string(), "com.x:lib:2.0");

        let ga = GroupArtifactVersion::parse("com.x:lib").unwrap();
        assert!(ga.version.is_none());
        assert_eq!(ga.to_string(), "com.x:lib");

        assert!(GroupArtifactVersion::parse("com.x").is_none());
        assert!(GroupArtifactVersion::parse("a:b:c:d").is_none());
    }

    #[test]
    fn dependency_key_defaults_type_to_jar() {
        let key = DependencyKey::new("g", "a", None, Some(""));
        assert_eq!(key.type_, "jar");
        assert!(key.classifier.is_none());
        assert_eq!(key.to_string(), "g:a");

        let key = DependencyKey::new("g", "a", Some("pom"), Some("tests"));
        assert_eq!(key.to_string(), "g:a:pom:tests");
    }

    #[test]
    fn snapshot_detection() {
        assert!(GroupArtifactVersion::of("g", "a", "1.0-SNAPSHOT").is_snapshot());
        assert!(!GroupArtifactVersion::of("g", "a", "1.0").is_snapshot());
    }
}
