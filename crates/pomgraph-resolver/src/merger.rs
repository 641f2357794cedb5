//! The POM model merger: builds a [`ResolvedPom`] from a requested POM, its
//! parent chain and the BOMs it imports.
//!
//! Inherited declarations are interpolated in the context of the POM being
//! resolved, so a child that redefines a property changes the managed
//! versions, dependencies and repositories it inherits. A BOM's entries are
//! interpolated in the BOM's own context.
//!
//! Download failures never abort a merge: the [`Outcome`] carries whatever
//! could be merged together with the failures met on the way.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Mutex;

use pomgraph_core::config::ResolverConfig;
use pomgraph_core::failure::{
    AmbiguousManagedVersion, DownloadFailure, DownloadFailures, FailureCause, Outcome,
    PropertyCycle,
};
use pomgraph_core::gav::{DependencyKey, GroupArtifactVersion};
use pomgraph_core::pom::{Dependency, Exclusion, ManagedDependency, Parent, Plugin, Pom, Profile};
use pomgraph_core::properties::{interpolate, interpolate_lenient, PropertyChain};
use pomgraph_core::repository::{self, MavenRepository};
use pomgraph_core::scope::Scope;
use pomgraph_maven::downloader::MavenPomDownloader;
use pomgraph_maven::project;

use crate::profile::{self, ActivationContext};
use crate::resolved::{ResolvedManagedDependency, ResolvedPom};
use crate::version::DynamicVersion;

/// Resolves POMs for one resolution run, caching every [`ResolvedPom`].
pub struct PomResolver {
    downloader: Arc<MavenPomDownloader>,
    activation: ActivationContext,
    default_repositories: Vec<MavenRepository>,
    local_poms: Mutex<HashMap<GroupArtifactVersion, Arc<Pom>>>,
    resolved: Mutex<HashMap<String, Outcome<Arc<ResolvedPom>>>>,
}

impl PomResolver {
    pub fn new(
        downloader: Arc<MavenPomDownloader>,
        activation: ActivationContext,
        default_repositories: Vec<MavenRepository>,
    ) -> Self {
        Self {
            downloader,
            activation,
            default_repositories,
            local_poms: Mutex::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// A resolver over HTTP, configured from the user configuration.
    pub fn from_config(config: &ResolverConfig) -> miette::Result<Self> {
        let downloader = MavenPomDownloader::from_config(config)?;
        Ok(Self::new(
            Arc::new(downloader),
            ActivationContext::from_config(config),
            config.default_repositories(),
        ))
    }

    pub fn downloader(&self) -> &Arc<MavenPomDownloader> {
        &self.downloader
    }

    pub fn activation(&self) -> &ActivationContext {
        &self.activation
    }

    /// Repositories consulted after those declared in POMs.
    pub fn default_repositories(&self) -> &[MavenRepository] {
        &self.default_repositories
    }

    /// Module paths `pom` contributes under the current activation.
    pub fn modules_of(&self, pom: &Pom) -> Vec<String> {
        profile::modules_of(pom, &self.activation)
    }

    /// Make POMs of the current build available by coordinates, so parents
    /// and dependencies that are reactor members are never downloaded.
    pub async fn add_local_poms(&self, poms: impl IntoIterator<Item = Arc<Pom>>) {
        let mut local = self.local_poms.lock().await;
        for pom in poms {
            let gav = self.local_gav(&pom);
            tracing::debug!("Registered local POM {gav}");
            local.insert(gav, pom);
        }
    }

    /// Forget every resolved POM.
    pub async fn reset(&self) {
        self.resolved.lock().await.clear();
    }

    /// Resolve a requested POM.
    pub async fn resolve(&self, pom: Arc<Pom>) -> Outcome<Arc<ResolvedPom>> {
        let key = identity(&pom);
        self.resolve_inner(pom, key, Vec::new()).await
    }

    /// Download and resolve the POM of `gav`. Dynamic versions are resolved
    /// first. `None` when the POM could not be obtained.
    pub async fn resolve_gav(
        &self,
        gav: &GroupArtifactVersion,
        repositories: &[MavenRepository],
    ) -> Outcome<Option<Arc<ResolvedPom>>> {
        self.resolve_gav_inner(gav, repositories, &[]).await
    }

    /// Replace a range or `LATEST`/`RELEASE` marker with a concrete version
    /// from repository metadata. Fixed versions are returned unchanged.
    ///
    /// When metadata is unavailable a range falls back to its lower bound;
    /// either way the failure is recorded.
    pub async fn resolve_version(
        &self,
        gav: &GroupArtifactVersion,
        repositories: &[MavenRepository],
    ) -> Outcome<Option<GroupArtifactVersion>> {
        let Some(version) = gav.version.as_deref().filter(|v| !v.is_empty()) else {
            return Outcome::complete(None);
        };
        let Some(dynamic) = DynamicVersion::parse(version) else {
            return Outcome::complete(Some(gav.clone()));
        };

        let mut failures = DownloadFailures::new();
        let chosen = match self
            .downloader
            .download_metadata(&gav.group_artifact(), repositories)
            .await
        {
            Ok(metadata) => match dynamic.select(
                &metadata.versions,
                metadata.latest.as_deref(),
                metadata.release.as_deref(),
            ) {
                Some(chosen) => Some(chosen),
                None => {
                    let consulted: Vec<&str> = repositories.iter().map(|r| r.id.as_str()).collect();
                    failures.push(DownloadFailure::new(gav.to_string()).with_attempt(
                        consulted.join(","),
                        FailureCause::NoMatchingVersion(version.to_string()),
                    ));
                    dynamic.fallback()
                }
            },
            Err(failure) => {
                failures.push(failure);
                dynamic.fallback()
            }
        };

        match &chosen {
            Some(v) => tracing::debug!("Selected {v} for {gav}"),
            None => tracing::warn!("No version could be selected for {gav}"),
        }
        Outcome::new(chosen.map(|v| gav.with_version(v)), failures)
    }

    async fn resolve_gav_inner(
        &self,
        gav: &GroupArtifactVersion,
        repositories: &[MavenRepository],
        stack: &[String],
    ) -> Outcome<Option<Arc<ResolvedPom>>> {
        let versioned = self.resolve_version(gav, repositories).await;
        let mut failures = versioned.failures;
        let Some(gav) = versioned.value else {
            if gav.version.is_none() {
                failures.push(DownloadFailure::new(gav.to_string()));
            }
            return Outcome::new(None, failures);
        };

        let local = self.local_poms.lock().await.get(&gav).cloned();
        let (pom, key) = match local {
            Some(pom) => {
                let key = identity(&pom);
                (pom, key)
            }
            None => {
                let key = gav.to_string();
                if stack.contains(&key) {
                    tracing::warn!("{gav} inherits or imports itself; ignoring the cyclic reference");
                    return Outcome::new(None, failures);
                }
                match self.downloader.download_pom(&gav, repositories).await {
                    Ok(pom) => (pom, key),
                    Err(failure) => {
                        tracing::warn!("{failure}");
                        failures.push(failure);
                        return Outcome::new(None, failures);
                    }
                }
            }
        };
        if stack.contains(&key) {
            tracing::warn!("{gav} inherits or imports itself; ignoring the cyclic reference");
            return Outcome::new(None, failures);
        }

        let resolved = self.resolve_inner(pom, key, stack.to_vec()).await;
        failures.extend(resolved.failures);
        Outcome::new(Some(resolved.value), failures)
    }

    fn resolve_inner<'a>(
        &'a self,
        pom: Arc<Pom>,
        key: String,
        mut stack: Vec<String>,
    ) -> BoxFuture<'a, Outcome<Arc<ResolvedPom>>> {
        async move {
            if let Some(done) = self.resolved.lock().await.get(&key) {
                return done.clone();
            }
            stack.push(key.clone());

            let mut failures = DownloadFailures::new();
            let active: Vec<Profile> = profile::active_profiles(&pom, &self.activation)
                .into_iter()
                .cloned()
                .collect();

            let mut own_properties = pom.properties.clone();
            for profile in &active {
                own_properties.extend(profile.properties.clone());
            }

            // Parent coordinates and the repositories to fetch it from can
            // only see the POM's own properties.
            let mut early = Interpolation::new(
                PropertyChain::new()
                    .layer(&self.activation.user_properties)
                    .layer(&own_properties)
                    .with_environment(),
            );
            let parent_ref = pom.parent.as_ref().map(|p| Parent {
                gav: early.gav(&p.gav),
                relative_path: p.relative_path.clone(),
            });
            let own_repositories: Vec<MavenRepository> = declared_repositories(&pom, &active)
                .map(|r| early.repository(r))
                .collect();
            let mut cycles = early.cycles;

            let parent = match &parent_ref {
                None => None,
                Some(declared) => {
                    let repos = repository::dedupe(
                        own_repositories
                            .iter()
                            .chain(&self.default_repositories)
                            .cloned(),
                    );
                    let outcome = self.resolve_parent(&pom, declared, &repos, &stack).await;
                    failures.extend(outcome.failures);
                    outcome.value
                }
            };

            let mut raw = parent
                .as_ref()
                .map(|p| p.raw_properties.clone())
                .unwrap_or_default();
            raw.extend(own_properties);

            let builtins = builtin_properties(&pom, parent.as_deref(), parent_ref.as_ref());
            let mut ctx = Interpolation::new(
                PropertyChain::new()
                    .layer(&self.activation.user_properties)
                    .layer(&builtins)
                    .layer(&raw)
                    .with_environment(),
            );

            let mut properties = BTreeMap::new();
            for (name, value) in &raw {
                let resolved = match interpolate(&format!("${{{name}}}"), &ctx.chain) {
                    Ok(resolved) => resolved,
                    Err(cycle) => {
                        tracing::warn!("{cycle}");
                        ctx.record(cycle);
                        value.clone()
                    }
                };
                properties.insert(name.clone(), resolved);
            }

            let gav = GroupArtifactVersion::new(
                builtins
                    .get("project.groupId")
                    .map(|g| ctx.text(g))
                    .unwrap_or_default(),
                ctx.text(&pom.artifact_id),
                builtins.get("project.version").map(|v| ctx.text(v)),
            );
            let packaging = ctx.text(pom.packaging.as_deref().unwrap_or("jar"));

            // Nearest first: this POM, then each ancestor.
            let mut levels: Vec<(&Pom, &[Profile])> = vec![(pom.as_ref(), active.as_slice())];
            if let Some(parent) = parent.as_deref() {
                levels.extend(
                    parent
                        .lineage()
                        .map(|p| (p.requested.as_ref(), p.active_profiles.as_slice())),
                );
            }

            let mut repositories: Vec<MavenRepository> = declared_repositories(&pom, &active)
                .map(|r| ctx.repository(r))
                .collect();
            match parent.as_deref() {
                Some(parent) => repositories.extend(parent.repositories.iter().cloned()),
                None => repositories.extend(self.default_repositories.iter().cloned()),
            }
            let repositories = repository::dedupe(repositories);

            let mut management: Vec<ResolvedManagedDependency> = Vec::new();
            let mut managed_keys: HashSet<DependencyKey> = HashSet::new();
            let mut ambiguous = Vec::new();
            for (level_pom, level_profiles) in &levels {
                let mut imports = Vec::new();
                for entry in managed_entries(level_pom, level_profiles) {
                    match entry {
                        ManagedDependency::Defined {
                            gav,
                            scope,
                            type_,
                            classifier,
                            exclusions,
                        } => {
                            let managed = ResolvedManagedDependency {
                                gav: ctx.gav(gav),
                                scope: scope
                                    .as_deref()
                                    .and_then(|s| Scope::from_name(Some(ctx.text(s).as_str()))),
                                type_: ctx.text(type_.as_deref().unwrap_or("jar")),
                                classifier: ctx.optional(classifier.as_deref()),
                                exclusions: ctx.exclusions(exclusions),
                                bom_gav: None,
                            };
                            if managed_keys.insert(managed.key()) {
                                management.push(managed);
                            }
                        }
                        ManagedDependency::Imported { gav } => imports.push(ctx.gav(gav)),
                    }
                }

                let boms = join_all(
                    imports
                        .iter()
                        .map(|bom| self.resolve_gav_inner(bom, &repositories, &stack)),
                )
                .await;

                let mut level_boms: HashMap<DependencyKey, (Option<String>, GroupArtifactVersion)> =
                    HashMap::new();
                for outcome in boms {
                    failures.extend(outcome.failures);
                    let Some(bom) = outcome.value else {
                        continue;
                    };
                    for entry in &bom.dependency_management {
                        let key = entry.key();
                        if managed_keys.insert(key.clone()) {
                            level_boms.insert(key, (entry.gav.version.clone(), bom.gav.clone()));
                            management.push(ResolvedManagedDependency {
                                bom_gav: Some(bom.gav.clone()),
                                ..entry.clone()
                            });
                        } else if let Some((chosen, from)) = level_boms.get(&key) {
                            if *chosen != entry.gav.version && *from != bom.gav {
                                ambiguous.push(AmbiguousManagedVersion {
                                    dependency: key.to_string(),
                                    chosen_version: chosen.clone().unwrap_or_default(),
                                    chosen_from: from.to_string(),
                                    ignored_version: entry.gav.version.clone().unwrap_or_default(),
                                    ignored_from: bom.gav.to_string(),
                                });
                            }
                        }
                    }
                }
            }

            let mut dependencies = Vec::new();
            let mut dependency_keys = HashSet::new();
            let mut plugins = Vec::new();
            let mut plugin_keys = HashSet::new();
            let mut plugin_management = Vec::new();
            let mut plugin_management_keys = HashSet::new();
            for (level_pom, level_profiles) in &levels {
                let declared = level_pom
                    .dependencies
                    .iter()
                    .chain(level_profiles.iter().flat_map(|p| p.dependencies.iter()));
                for dependency in declared {
                    let dependency = ctx.dependency(dependency);
                    if dependency_keys.insert(dependency.key()) {
                        dependencies.push(dependency);
                    }
                }
                for plugin in &level_pom.plugins {
                    let plugin = ctx.plugin(plugin);
                    if plugin_keys.insert(plugin.group_artifact()) {
                        plugins.push(plugin);
                    }
                }
                for plugin in &level_pom.plugin_management {
                    let plugin = ctx.plugin(plugin);
                    if plugin_management_keys.insert(plugin.group_artifact()) {
                        plugin_management.push(plugin);
                    }
                }
            }
            drop(levels);

            for cycle in ctx.cycles {
                if !cycles.contains(&cycle) {
                    cycles.push(cycle);
                }
            }

            let modules = profile::modules_of(&pom, &self.activation);
            let mut resolved = ResolvedPom::new(
                pom,
                gav,
                packaging,
                parent,
                properties,
                raw,
                management,
                repositories,
                active,
            );
            resolved.requested_dependencies = dependencies;
            resolved.plugins = plugins;
            resolved.plugin_management = plugin_management;
            resolved.modules = modules;
            resolved.property_cycles = cycles;
            resolved.ambiguous_versions = ambiguous;

            tracing::debug!(
                "Resolved {} ({} managed, {} dependencies, {} failure(s))",
                resolved.gav,
                resolved.dependency_management.len(),
                resolved.requested_dependencies.len(),
                failures.len()
            );

            let outcome = Outcome::new(Arc::new(resolved), failures);
            self.resolved.lock().await.insert(key, outcome.clone());
            outcome
        }
        .boxed()
    }

    async fn resolve_parent(
        &self,
        child: &Pom,
        declared: &Parent,
        repositories: &[MavenRepository],
        stack: &[String],
    ) -> Outcome<Option<Arc<ResolvedPom>>> {
        if let Some(local) = local_parent(child, declared) {
            let key = identity(&local);
            if stack.contains(&key) {
                tracing::warn!("{} inherits from itself; ignoring its parent", declared.gav);
                return Outcome::complete(None);
            }
            return self
                .resolve_inner(Arc::new(local), key, stack.to_vec())
                .await
                .map(Some);
        }
        self.resolve_gav_inner(&declared.gav, repositories, stack).await
    }

    fn local_gav(&self, pom: &Pom) -> GroupArtifactVersion {
        let mut ctx = Interpolation::new(
            PropertyChain::new()
                .layer(&self.activation.user_properties)
                .layer(&pom.properties),
        );
        ctx.gav(&pom.declared_gav())
    }
}

/// Cache key of a POM: its file when it came from disk, otherwise its
/// coordinates.
fn identity(pom: &Pom) -> String {
    match &pom.source_path {
        Some(path) => format!("file:{}", path.display()),
        None => pom.declared_gav().to_string(),
    }
}

/// The parent POM at `relativePath`, if it exists there and has the
/// expected groupId and artifactId.
fn local_parent(child: &Pom, declared: &Parent) -> Option<Pom> {
    let relative = declared.effective_relative_path()?;
    let file = project::pom_file(&child.base_dir()?.join(relative));
    let file = file.canonicalize().ok()?;
    match project::read_pom_file(&file) {
        Ok(pom) => {
            let found = pom.declared_gav();
            if found.group_id == declared.gav.group_id
                && found.artifact_id == declared.gav.artifact_id
            {
                Some(pom)
            } else {
                tracing::debug!(
                    "{} is {found}, not the parent {}",
                    file.display(),
                    declared.gav
                );
                None
            }
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable parent {}: {e}", file.display());
            None
        }
    }
}

fn declared_repositories<'p>(
    pom: &'p Pom,
    active: &'p [Profile],
) -> impl Iterator<Item = &'p MavenRepository> {
    pom.repositories
        .iter()
        .chain(active.iter().flat_map(|p| p.repositories.iter()))
}

fn managed_entries<'p>(
    pom: &'p Pom,
    active: &'p [Profile],
) -> impl Iterator<Item = &'p ManagedDependency> {
    pom.dependency_management
        .iter()
        .chain(active.iter().flat_map(|p| p.dependency_management.iter()))
}

/// `project.*`, `pom.*`, `basedir` and `project.parent.*`, as written.
fn builtin_properties(
    pom: &Pom,
    parent: Option<&ResolvedPom>,
    parent_ref: Option<&Parent>,
) -> BTreeMap<String, String> {
    let parent_gav = parent.map(|p| &p.gav).or(parent_ref.map(|p| &p.gav));
    let group = pom
        .group_id
        .clone()
        .or_else(|| parent_gav.map(|g| g.group_id.clone()))
        .unwrap_or_default();
    let version = pom
        .version
        .clone()
        .or_else(|| parent_gav.and_then(|g| g.version.clone()));

    let mut builtins = BTreeMap::new();
    let mut project = |name: &str, value: String| {
        builtins.insert(format!("pom.{name}"), value.clone());
        builtins.insert(format!("project.{name}"), value);
    };
    project("groupId", group);
    project("artifactId", pom.artifact_id.clone());
    project("packaging", pom.packaging.clone().unwrap_or_else(|| "jar".into()));
    if let Some(version) = version {
        project("version", version);
    }
    if let Some(dir) = pom.base_dir() {
        project("basedir", dir.display().to_string());
        builtins.insert("basedir".into(), dir.display().to_string());
    }
    if let Some(parent) = parent_gav {
        builtins.insert("project.parent.groupId".into(), parent.group_id.clone());
        builtins.insert("project.parent.artifactId".into(), parent.artifact_id.clone());
        if let Some(version) = &parent.version {
            builtins.insert("project.parent.version".into(), version.clone());
        }
    }
    builtins
}

/// Lenient interpolation of model elements against one property chain.
struct Interpolation<'a> {
    chain: PropertyChain<'a>,
    cycles: Vec<PropertyCycle>,
}

impl<'a> Interpolation<'a> {
    fn new(chain: PropertyChain<'a>) -> Self {
        Self {
            chain,
            cycles: Vec::new(),
        }
    }

    fn record(&mut self, cycle: PropertyCycle) {
        if !self.cycles.contains(&cycle) {
            self.cycles.push(cycle);
        }
    }

    fn text(&mut self, text: &str) -> String {
        interpolate_lenient(text, &self.chain, &mut self.cycles)
            .trim()
            .to_string()
    }

    fn optional(&mut self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.text(t)).filter(|t| !t.is_empty())
    }

    fn gav(&mut self, gav: &GroupArtifactVersion) -> GroupArtifactVersion {
        GroupArtifactVersion::new(
            self.text(&gav.group_id),
            self.text(&gav.artifact_id),
            self.optional(gav.version.as_deref()),
        )
    }

    fn exclusions(&mut self, exclusions: &[Exclusion]) -> Vec<Exclusion> {
        exclusions
            .iter()
            .map(|e| Exclusion::new(self.text(&e.group_id), self.text(&e.artifact_id)))
            .collect()
    }

    fn dependency(&mut self, dependency: &Dependency) -> Dependency {
        Dependency {
            gav: self.gav(&dependency.gav),
            scope: self.optional(dependency.scope.as_deref()),
            type_: self.optional(dependency.type_.as_deref()),
            classifier: self.optional(dependency.classifier.as_deref()),
            optional: dependency.optional,
            exclusions: self.exclusions(&dependency.exclusions),
        }
    }

    fn plugin(&mut self, plugin: &Plugin) -> Plugin {
        Plugin {
            group_id: self.text(&plugin.group_id),
            artifact_id: self.text(&plugin.artifact_id),
            version: self.optional(plugin.version.as_deref()),
        }
    }

    fn repository(&mut self, repo: &MavenRepository) -> MavenRepository {
        MavenRepository {
            id: self.text(&repo.id),
            url: self.text(&repo.url).trim_end_matches('/').to_string(),
            ..repo.clone()
        }
    }
}
