//! Transitive dependency resolution: breadth-first expansion with scope
//! propagation, exclusions, root management pinning and nearest-wins
//! conflict resolution.
//!
//! Every classpath is expanded on its own, so a dependency reached through
//! a test dependency never shadows the same artifact on the compile
//! classpath. Each level of the breadth-first walk is prefetched in
//! parallel; the POMs are shared across classpaths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use futures_util::future::join_all;
use petgraph::graph::NodeIndex;

use pomgraph_core::failure::{DownloadFailures, Outcome};
use pomgraph_core::gav::{DependencyKey, GroupArtifact, GroupArtifactVersion};
use pomgraph_core::pom::{Dependency, Exclusion};
use pomgraph_core::repository::{self, MavenRepository};
use pomgraph_core::scope::{Classpath, Scope};

use crate::conflict::{ConflictReport, VersionConflict};
use crate::graph::{ClasspathGraph, DependencyGraph, ResolvedDependency};
use crate::merger::PomResolver;
use crate::resolved::{ResolvedManagedDependency, ResolvedPom};

/// Entry in the BFS queue.
struct QueueEntry {
    dependency: ResolvedDependency,
    parent: Option<NodeIndex>,
    /// `groupId:artifactId` of every dependency from the root down to and
    /// including this one.
    path: Vec<GroupArtifact>,
    repositories: Arc<Vec<MavenRepository>>,
}

/// State shared by the classpaths of one resolution.
struct Run<'a> {
    root: &'a ResolvedPom,
    poms: &'a PomResolver,
    versions: HashMap<GroupArtifactVersion, Option<String>>,
    resolved: HashMap<GroupArtifactVersion, Option<Arc<ResolvedPom>>>,
    failures: DownloadFailures,
    conflicts: ConflictReport,
}

/// Resolve the dependency graph of `root` for every classpath.
///
/// A dependency whose POM cannot be obtained stays in the graph without
/// children; the failure is returned alongside the graph.
pub async fn resolve_dependencies(
    root: &ResolvedPom,
    poms: &PomResolver,
) -> Outcome<DependencyGraph> {
    let mut run = Run {
        root,
        poms,
        versions: HashMap::new(),
        resolved: HashMap::new(),
        failures: DownloadFailures::new(),
        conflicts: ConflictReport::new(),
    };

    let mut graph = DependencyGraph::new(root.gav.clone());
    for classpath in Classpath::ALL {
        let resolved = run.resolve_classpath(classpath).await;
        tracing::debug!(
            "{} classpath of {}: {} dependencies",
            classpath,
            root.gav,
            resolved.len()
        );
        graph.insert_classpath(resolved);
    }
    graph.conflicts = run.conflicts;

    tracing::info!(
        "Resolved dependencies of {} ({} conflict(s), {} failure(s))",
        root.gav,
        graph.conflicts.len(),
        run.failures.len()
    );
    Outcome::new(graph, run.failures)
}

impl Run<'_> {
    async fn resolve_classpath(&mut self, classpath: Classpath) -> ClasspathGraph {
        let mut graph = ClasspathGraph::new(classpath);
        let mut selected: HashMap<DependencyKey, (String, usize)> = HashMap::new();
        let mut queue: VecDeque<QueueEntry> = self.direct_dependencies(classpath).into();

        while let Some(current_depth) = queue.front().map(|e| e.dependency.depth) {
            let mut level: Vec<QueueEntry> = Vec::new();
            while queue
                .front()
                .is_some_and(|e| e.dependency.depth == current_depth)
            {
                if let Some(entry) = queue.pop_front() {
                    level.push(entry);
                }
            }

            self.prefetch(&mut level, &selected).await;

            for entry in level {
                let key = entry.dependency.key();
                if entry.dependency.gav.version.is_none() {
                    continue;
                }
                let version = entry.dependency.version().to_string();

                if let Some((existing, existing_depth)) = selected.get(&key) {
                    if *existing != version {
                        let reason = if *existing_depth < entry.dependency.depth {
                            format!(
                                "nearest wins (depth {existing_depth} vs {})",
                                entry.dependency.depth
                            )
                        } else {
                            format!("first declaration wins at depth {existing_depth}")
                        };
                        self.conflicts.add(VersionConflict {
                            group: key.group_id.clone(),
                            artifact: key.artifact_id.clone(),
                            requested: version,
                            resolved: existing.clone(),
                            reason,
                        });
                    }
                    continue;
                }

                selected.insert(key, (version, entry.dependency.depth));
                let expand = entry.dependency.scope != Scope::System;
                let gav = entry.dependency.gav.clone();
                let node = graph.insert(entry.dependency.clone(), entry.parent);

                if !expand {
                    continue;
                }
                if let Some(pom) = self.resolved.get(&gav).cloned().flatten() {
                    queue.extend(self.children(classpath, &entry, node, &pom));
                }
            }
        }

        graph
    }

    /// The root's own dependencies that belong on `classpath`.
    fn direct_dependencies(&self, classpath: Classpath) -> Vec<QueueEntry> {
        let repositories = Arc::new(self.root.repositories.clone());
        let mut entries = Vec::new();

        for declared in &self.root.requested_dependencies {
            let managed = self.root.managed(&declared.key());
            let Some(scope) = declared_scope(declared, managed) else {
                tracing::warn!(
                    "Ignoring {} with unknown scope '{}'",
                    declared.gav,
                    declared.scope.as_deref().unwrap_or_default()
                );
                continue;
            };
            if scope == Scope::Import || !classpath.includes(scope) {
                continue;
            }
            let Some(version) = declared
                .gav
                .version
                .clone()
                .or_else(|| managed.and_then(|m| m.gav.version.clone()))
            else {
                tracing::warn!("{} declares {} without a version", self.root.gav, declared.gav);
                continue;
            };

            let mut exclusions = declared.exclusions.clone();
            if let Some(managed) = managed {
                extend_unique(&mut exclusions, &managed.exclusions);
            }

            entries.push(QueueEntry {
                dependency: ResolvedDependency {
                    gav: declared.gav.with_version(version),
                    type_: declared.key().type_,
                    classifier: declared.classifier.clone(),
                    scope,
                    optional: declared.optional,
                    exclusions,
                    direct: true,
                    depth: 0,
                },
                parent: None,
                path: vec![declared.gav.group_artifact()],
                repositories: repositories.clone(),
            });
        }
        entries
    }

    /// Dependencies `entry` brings in on `classpath`.
    fn children(
        &mut self,
        classpath: Classpath,
        entry: &QueueEntry,
        node: NodeIndex,
        pom: &ResolvedPom,
    ) -> Vec<QueueEntry> {
        let root_ga = self.root.gav.group_artifact();
        let repositories = Arc::new(repository::dedupe(
            entry
                .repositories
                .iter()
                .chain(&pom.repositories)
                .cloned(),
        ));
        let mut children = Vec::new();

        for declared in &pom.requested_dependencies {
            if declared.optional {
                continue;
            }
            let key = declared.key();
            let managed_here = pom.managed(&key);
            let Some(declared_scope) = declared_scope(declared, managed_here) else {
                continue;
            };
            let Some(mut scope) = entry.dependency.scope.transitive(declared_scope) else {
                continue;
            };

            let ga = declared.gav.group_artifact();
            if entry.dependency.exclusions.iter().any(|e| e.matches(&ga)) {
                tracing::debug!("{ga} excluded below {}", entry.dependency);
                continue;
            }
            if ga == root_ga || entry.path.contains(&ga) {
                tracing::debug!("Cyclic dependency on {ga} below {}", entry.dependency);
                continue;
            }

            let mut version = declared
                .gav
                .version
                .clone()
                .or_else(|| managed_here.and_then(|m| m.gav.version.clone()));
            let mut exclusions = entry.dependency.exclusions.clone();
            extend_unique(&mut exclusions, &declared.exclusions);
            if let Some(managed) = managed_here {
                extend_unique(&mut exclusions, &managed.exclusions);
            }

            if let Some(pinned) = self.root.managed(&key) {
                if let Some(pinned_version) = &pinned.gav.version {
                    if let Some(requested) = version.as_deref().filter(|v| *v != pinned_version) {
                        self.conflicts.add(VersionConflict {
                            group: key.group_id.clone(),
                            artifact: key.artifact_id.clone(),
                            requested: requested.to_string(),
                            resolved: pinned_version.clone(),
                            reason: "managed by root".to_string(),
                        });
                    }
                    version = Some(pinned_version.clone());
                }
                if let Some(managed_scope) = pinned.scope {
                    scope = managed_scope;
                }
                extend_unique(&mut exclusions, &pinned.exclusions);
            }

            if !classpath.includes(scope) {
                continue;
            }
            let Some(version) = version else {
                tracing::warn!("{} declares {ga} without a version", pom.gav);
                continue;
            };

            let mut path = entry.path.clone();
            path.push(ga);
            children.push(QueueEntry {
                dependency: ResolvedDependency {
                    gav: declared.gav.with_version(version),
                    type_: key.type_,
                    classifier: key.classifier,
                    scope,
                    optional: false,
                    exclusions,
                    direct: false,
                    depth: entry.dependency.depth + 1,
                },
                parent: Some(node),
                path,
                repositories: repositories.clone(),
            });
        }
        children
    }

    /// Resolve dynamic versions and download the POMs of one level in
    /// parallel.
    /// POMs are not fetched for keys that already lost to a nearer
    /// selection.
    async fn prefetch(
        &mut self,
        level: &mut [QueueEntry],
        selected: &HashMap<DependencyKey, (String, usize)>,
    ) {
        let poms = self.poms;

        let mut pending = Vec::new();
        let mut queued = HashSet::new();
        for entry in level.iter() {
            let gav = &entry.dependency.gav;
            if !self.versions.contains_key(gav) && queued.insert(gav.clone()) {
                pending.push((gav.clone(), entry.repositories.clone()));
            }
        }
        let outcomes = join_all(
            pending
                .iter()
                .map(|(gav, repos)| poms.resolve_version(gav, repos)),
        )
        .await;
        for ((gav, _), outcome) in pending.into_iter().zip(outcomes) {
            self.failures.extend(outcome.failures);
            self.versions
                .insert(gav, outcome.value.and_then(|g| g.version));
        }
        for entry in level.iter_mut() {
            let version = self
                .versions
                .get(&entry.dependency.gav)
                .cloned()
                .flatten();
            entry.dependency.gav.version = version;
        }

        let mut pending = Vec::new();
        let mut queued = HashSet::new();
        for entry in level.iter() {
            let gav = &entry.dependency.gav;
            if gav.version.is_some()
                && entry.dependency.scope != Scope::System
                && !selected.contains_key(&entry.dependency.key())
                && !self.resolved.contains_key(gav)
                && queued.insert(gav.clone())
            {
                pending.push((gav.clone(), entry.repositories.clone()));
            }
        }
        let outcomes = join_all(
            pending
                .iter()
                .map(|(gav, repos)| poms.resolve_gav(gav, repos)),
        )
        .await;
        for ((gav, _), outcome) in pending.into_iter().zip(outcomes) {
            self.failures.extend(outcome.failures);
            self.resolved.insert(gav, outcome.value);
        }
    }
}

/// The scope a dependency is declared with: its own `<scope>`, else the
/// managed scope, else `compile`. `None` for unknown scope names.
fn declared_scope(
    dependency: &Dependency,
    managed: Option<&ResolvedManagedDependency>,
) -> Option<Scope> {
    match dependency.scope.as_deref() {
        Some(scope) => Scope::from_name(Some(scope)),
        None => Some(managed.and_then(|m| m.scope).unwrap_or_default()),
    }
}

fn extend_unique(exclusions: &mut Vec<Exclusion>, more: &[Exclusion]) {
    for exclusion in more {
        if !exclusions.contains(exclusion) {
            exclusions.push(exclusion.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dependency(scope: Option<&str>) -> Dependency {
        Dependency {
            scope: scope.map(str::to_string),
            ..Dependency::new(GroupArtifactVersion::new("g", "a", None))
        }
    }

    fn managed(scope: Option<Scope>) -> ResolvedManagedDependency {
        ResolvedManagedDependency {
            gav: GroupArtifactVersion::of("g", "a", "1"),
            scope,
            type_: "jar".into(),
            classifier: None,
            exclusions: Vec::new(),
            bom_gav: None,
        }
    }

    #[test]
    fn declared_scope_falls_back_to_management() {
        assert_eq!(declared_scope(&dependency(None), None), Some(Scope::Compile));
        assert_eq!(
            declared_scope(&dependency(None), Some(&managed(Some(Scope::Test)))),
            Some(Scope::Test)
        );
        assert_eq!(
            declared_scope(&dependency(Some("runtime")), Some(&managed(Some(Scope::Test)))),
            Some(Scope::Runtime)
        );
        assert_eq!(declared_scope(&dependency(Some("bogus")), None), None);
    }

    #[test]
    fn exclusions_are_merged_once() {
        let mut exclusions = vec![Exclusion::new("a", "*")];
        extend_unique(
            &mut exclusions,
            &[Exclusion::new("a", "*"), Exclusion::new("b", "c")],
        );
        assert_eq!(exclusions.len(), 2);
    }
}
