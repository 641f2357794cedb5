//! The requested POM model: what a POM document declares, before any
//! inheritance, interpolation or import has been applied.
//!
//! Values are kept exactly as written (they may still contain `${...}`
//! placeholders). A `Pom` is immutable once parsed; resolution derives new
//! values from it and never mutates it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::gav::{DependencyKey, GroupArtifact, GroupArtifactVersion};
use crate::repository::MavenRepository;

/// Default `relativePath` of a `<parent>` element.
pub const DEFAULT_PARENT_RELATIVE_PATH: &str = "../pom.xml";

/// Default groupId of a `<plugin>` element.
pub const DEFAULT_PLUGIN_GROUP_ID: &str = "org.apache.maven.plugins";

/// A parsed POM document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pom {
    /// File the POM was read from, when it came from a project on disk.
    pub source_path: Option<PathBuf>,

    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: Option<String>,

    pub parent: Option<Parent>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<ManagedDependency>,
    pub plugins: Vec<Plugin>,
    pub plugin_management: Vec<Plugin>,
    pub repositories: Vec<MavenRepository>,
    pub profiles: Vec<Profile>,
    pub modules: Vec<String>,
}

impl Pom {
    /// Coordinates as written, falling back to the parent's groupId/version.
    pub fn declared_gav(&self) -> GroupArtifactVersion {
        let group = self
            .group_id
            .clone()
            .or_else(|| self.parent.as_ref().map(|p| p.gav.group_id.clone()))
            .unwrap_or_default();
        let version = self
            .version
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.gav.version.clone()));
        GroupArtifactVersion::new(group, self.artifact_id.clone(), version)
    }

    /// Directory containing the POM file, if it was read from disk.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// `Imported` (BOM) entries of the dependency management section.
    pub fn bom_imports(&self) -> impl Iterator<Item = &GroupArtifactVersion> {
        self.dependency_management.iter().filter_map(|m| match m {
            ManagedDependency::Imported { gav } => Some(gav),
            ManagedDependency::Defined { .. } => None,
        })
    }
}

/// Reference to a parent POM.
#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    pub gav: GroupArtifactVersion,
    pub relative_path: Option<String>,
}

impl Parent {
    /// The relative path to look for the parent at; an explicitly empty
    /// `<relativePath/>` disables local lookup.
    pub fn effective_relative_path(&self) -> Option<&str> {
        match self.relative_path.as_deref() {
            None => Some(DEFAULT_PARENT_RELATIVE_PATH),
            Some("") => None,
            Some(p) => Some(p),
        }
    }
}

/// A dependency declared in `<dependencies>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub gav: GroupArtifactVersion,
    pub scope: Option<String>,
    pub type_: Option<String>,
    pub classifier: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(gav: GroupArtifactVersion) -> Self {
        Self {
            gav,
            scope: None,
            type_: None,
            classifier: None,
            optional: false,
            exclusions: Vec::new(),
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(
            &self.gav.group_id,
            &self.gav.artifact_id,
            self.type_.as_deref(),
            self.classifier.as_deref(),
        )
    }
}

/// An exclusion within a dependency declaration. Either part may be `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn matches(&self, ga: &GroupArtifact) -> bool {
        (self.group_id == "*" || self.group_id == ga.group_id)
            && (self.artifact_id == "*" || self.artifact_id == ga.artifact_id)
    }
}

/// An entry of `<dependencyManagement>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedDependency {
    /// An explicitly managed dependency.
    Defined {
        gav: GroupArtifactVersion,
        scope: Option<String>,
        type_: Option<String>,
        classifier: Option<String>,
        exclusions: Vec<Exclusion>,
    },
    /// A bill of materials imported with `<scope>import</scope>` and `<type>pom</type>`.
    Imported { gav: GroupArtifactVersion },
}

/// A `<plugin>` declaration. Only the coordinates matter for resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
}

impl Plugin {
    pub fn group_artifact(&self) -> GroupArtifact {
        GroupArtifact::new(self.group_id.clone(), self.artifact_id.clone())
    }
}

/// A `<profile>` and what it contributes when active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub id: String,
    pub activation: Option<Activation>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<ManagedDependency>,
    pub repositories: Vec<MavenRepository>,
    pub modules: Vec<String>,
}

/// The `<activation>` predicate of a profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activation {
    pub active_by_default: bool,
    pub jdk: Option<String>,
    pub property: Option<PropertyActivation>,
    pub file: Option<FileActivation>,
}

/// `<activation><property>`: `name` may start with `!` to negate;
/// `value` may also start with `!`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyActivation {
    pub name: String,
    pub value: Option<String>,
}

/// `<activation><file>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileActivation {
    pub exists: Option<String>,
    pub missing: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_gav_falls_back_to_parent() {
        let pom = Pom {
            artifact_id: "child".into(),
            parent: Some(Parent {
                gav: GroupArtifactVersion::of("org.example", "parent", "2.0"),
                relative_path: None,
            }),
            ..Default::default()
        };
        assert_eq!(pom.declared_gav().to_string(), "org.example:child:2.0");
    }

    #[test]
    fn empty_relative_path_disables_local_lookup() {
        let mut parent = Parent {
            gav: GroupArtifactVersion::of("g", "p", "1"),
            relative_path: None,
        };
        assert_eq!(parent.effective_relative_path(), Some("../pom.xml"));
        parent.relative_path = Some(String::new());
        assert_eq!(parent.effective_relative_path(), None);
    }

    #[test]
    fn exclusion_wildcards() {
        let ga = GroupArtifact::new("commons-logging", "commons-logging");
        assert!(Exclusion::new("commons-logging", "*").matches(&ga));
        assert!(Exclusion::new("*", "*").matches(&ga));
        assert!(!Exclusion::new("org.slf4j", "*").matches(&ga));
    }
}
