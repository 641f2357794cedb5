//! The resolved (effective) POM model.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use pomgraph_core::failure::{AmbiguousManagedVersion, PropertyCycle};
use pomgraph_core::gav::{DependencyKey, GroupArtifactVersion};
use pomgraph_core::pom::{Dependency, Exclusion, Plugin, Pom, Profile};
use pomgraph_core::repository::MavenRepository;
use pomgraph_core::scope::Scope;

/// A `<dependencyManagement>` entry after inheritance, import and
/// interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedManagedDependency {
    pub gav: GroupArtifactVersion,
    pub scope: Option<Scope>,
    pub type_: String,
    pub classifier: Option<String>,
    pub exclusions: Vec<Exclusion>,
    /// The BOM imported by this POM or one of its ancestors that contributed
    /// the entry; `None` for explicitly managed entries.
    pub bom_gav: Option<GroupArtifactVersion>,
}

impl ResolvedManagedDependency {
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(
            &self.gav.group_id,
            &self.gav.artifact_id,
            Some(&self.type_),
            self.classifier.as_deref(),
        )
    }
}

impl fmt::Display for ResolvedManagedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())?;
        if let Some(version) = &self.gav.version {
            write!(f, ":{version}")?;
        }
        if let Some(scope) = self.scope {
            write!(f, " ({scope})")?;
        }
        if let Some(bom) = &self.bom_gav {
            write!(f, " from {bom}")?;
        }
        Ok(())
    }
}

/// A POM merged with its parent chain and imported BOMs, with every
/// placeholder resolved that can be.
///
/// Built once per POM per resolution run and shared read-only.
#[derive(Debug, Clone)]
pub struct ResolvedPom {
    /// The POM as written.
    pub requested: Arc<Pom>,
    /// Interpolated coordinates; groupId and version fall back to the parent's.
    pub gav: GroupArtifactVersion,
    pub packaging: String,
    pub parent: Option<Arc<ResolvedPom>>,
    /// Merged and interpolated properties; nearer definitions win.
    pub properties: BTreeMap<String, String>,
    /// Merged properties as written, used to re-interpolate inherited
    /// declarations in a descendant's context.
    pub raw_properties: BTreeMap<String, String>,
    pub dependency_management: Vec<ResolvedManagedDependency>,
    managed_index: HashMap<DependencyKey, usize>,
    /// Own repositories first, then inherited ones, deduplicated by id.
    pub repositories: Vec<MavenRepository>,
    /// Profiles of this POM (not its ancestors) that are active.
    pub active_profiles: Vec<Profile>,
    /// Own, active-profile and inherited dependencies, nearer declarations
    /// winning per dependency key. Versions may still be absent (managed).
    pub requested_dependencies: Vec<Dependency>,
    pub plugins: Vec<Plugin>,
    pub plugin_management: Vec<Plugin>,
    /// Own and active-profile module paths.
    pub modules: Vec<String>,
    /// Properties that could not be interpolated because they refer back to
    /// themselves.
    pub property_cycles: Vec<PropertyCycle>,
    /// BOM imports at the same level that disagreed on a managed version.
    pub ambiguous_versions: Vec<AmbiguousManagedVersion>,
}

impl ResolvedPom {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        requested: Arc<Pom>,
        gav: GroupArtifactVersion,
        packaging: String,
        parent: Option<Arc<ResolvedPom>>,
        properties: BTreeMap<String, String>,
        raw_properties: BTreeMap<String, String>,
        dependency_management: Vec<ResolvedManagedDependency>,
        repositories: Vec<MavenRepository>,
        active_profiles: Vec<Profile>,
    ) -> Self {
        let managed_index = dependency_management
            .iter()
            .enumerate()
            .map(|(i, m)| (m.key(), i))
            .collect();
        Self {
            requested,
            gav,
            packaging,
            parent,
            properties,
            raw_properties,
            dependency_management,
            managed_index,
            repositories,
            active_profiles,
            requested_dependencies: Vec::new(),
            plugins: Vec::new(),
            plugin_management: Vec::new(),
            modules: Vec::new(),
            property_cycles: Vec::new(),
            ambiguous_versions: Vec::new(),
        }
    }

    /// The managed entry for a dependency key.
    pub fn managed(&self, key: &DependencyKey) -> Option<&ResolvedManagedDependency> {
        self.managed_index
            .get(key)
            .map(|&i| &self.dependency_management[i])
    }

    /// The managed version of `groupId:artifactId` with the given type
    /// (default `jar`) and classifier.
    pub fn managed_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        type_: Option<&str>,
        classifier: Option<&str>,
    ) -> Option<&str> {
        let key = DependencyKey::new(group_id, artifact_id, type_, classifier);
        self.managed(&key).and_then(|m| m.gav.version.as_deref())
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn repositories(&self) -> &[MavenRepository] {
        &self.repositories
    }

    pub fn parent(&self) -> Option<&ResolvedPom> {
        self.parent.as_deref()
    }

    /// This POM followed by its resolved ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &ResolvedPom> {
        std::iter::successors(Some(self), |p| p.parent())
    }

    /// Active profiles of this POM and its ancestors, nearest first.
    pub fn active_profiles(&self) -> Vec<&Profile> {
        self.lineage()
            .flat_map(|p| p.active_profiles.iter())
            .collect()
    }

    /// Property cycles found here or in any ancestor.
    pub fn all_property_cycles(&self) -> Vec<&PropertyCycle> {
        let mut cycles: Vec<&PropertyCycle> = Vec::new();
        for cycle in self.lineage().flat_map(|p| p.property_cycles.iter()) {
            if !cycles.contains(&cycle) {
                cycles.push(cycle);
            }
        }
        cycles
    }
}

impl fmt::Display for ResolvedPom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gav)
    }
}
