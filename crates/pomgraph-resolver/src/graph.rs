//! Resolved dependency graphs, one per classpath.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use pomgraph_core::gav::{DependencyKey, GroupArtifact, GroupArtifactVersion};
use pomgraph_core::pom::Exclusion;
use pomgraph_core::scope::{Classpath, Scope};

use crate::conflict::ConflictReport;

/// A dependency after conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Fully resolved coordinates; the version is always present.
    pub gav: GroupArtifactVersion,
    pub type_: String,
    pub classifier: Option<String>,
    /// Effective scope on the consumer's classpath.
    pub scope: Scope,
    pub optional: bool,
    /// Exclusions applying to everything reached through this dependency.
    pub exclusions: Vec<Exclusion>,
    pub direct: bool,
    /// 0 for the project's own dependencies.
    pub depth: usize,
}

impl ResolvedDependency {
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(
            &self.gav.group_id,
            &self.gav.artifact_id,
            Some(&self.type_),
            self.classifier.as_deref(),
        )
    }

    pub fn group_artifact(&self) -> GroupArtifact {
        self.gav.group_artifact()
    }

    pub fn version(&self) -> &str {
        self.gav.version_or_empty()
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key(), self.version())
    }
}

/// An owned subtree: a dependency and what it brought in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTree {
    pub dependency: ResolvedDependency,
    pub children: Vec<DependencyTree>,
}

/// The conflict-resolved dependencies of one classpath. Each dependency key
/// appears once; each dependency hangs below the dependency that introduced
/// it.
#[derive(Debug, Clone)]
pub struct ClasspathGraph {
    classpath: Classpath,
    graph: DiGraph<ResolvedDependency, ()>,
    index: HashMap<DependencyKey, NodeIndex>,
    direct: Vec<NodeIndex>,
}

impl ClasspathGraph {
    pub fn new(classpath: Classpath) -> Self {
        Self {
            classpath,
            graph: DiGraph::new(),
            index: HashMap::new(),
            direct: Vec::new(),
        }
    }

    /// Add a dependency below `parent` (or as a direct dependency). If the
    /// key is already present, returns the existing node.
    pub(crate) fn insert(
        &mut self,
        dependency: ResolvedDependency,
        parent: Option<NodeIndex>,
    ) -> NodeIndex {
        let key = dependency.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(dependency);
        self.index.insert(key, idx);
        match parent {
            Some(parent) => {
                self.graph.add_edge(parent, idx, ());
            }
            None => self.direct.push(idx),
        }
        idx
    }

    pub fn classpath(&self) -> Classpath {
        self.classpath
    }

    pub fn find(&self, key: &DependencyKey) -> Option<&ResolvedDependency> {
        self.index.get(key).map(|&idx| &self.graph[idx])
    }

    /// Every dependency, nearest first (breadth-first order).
    pub fn dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// The project's own dependencies, in declaration order.
    pub fn direct(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.direct.iter().map(|&idx| &self.graph[idx])
    }

    /// Dependencies introduced by `dependency`, in declaration order.
    pub fn children(&self, dependency: &ResolvedDependency) -> Vec<&ResolvedDependency> {
        match self.index.get(&dependency.key()) {
            Some(&idx) => self.child_indices(idx).map(|c| &self.graph[c]).collect(),
            None => Vec::new(),
        }
    }

    fn child_indices(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        children.sort();
        children.into_iter()
    }

    /// Owned trees rooted at each direct dependency.
    pub fn tree(&self) -> Vec<DependencyTree> {
        self.direct.iter().map(|&idx| self.subtree(idx)).collect()
    }

    fn subtree(&self, idx: NodeIndex) -> DependencyTree {
        DependencyTree {
            dependency: self.graph[idx].clone(),
            children: self.child_indices(idx).map(|c| self.subtree(c)).collect(),
        }
    }

    /// The chain of dependencies from a direct dependency down to `target`.
    ///
    /// Accepts either `group:artifact` or just `artifact`.
    pub fn find_path(&self, target: &str) -> Option<Vec<&ResolvedDependency>> {
        let mut current = self.resolve_key(target)?;
        let mut path = vec![current];
        let mut seen = HashSet::from([current]);
        while let Some(parent) = self
            .graph
            .edges_directed(current, Direction::Incoming)
            .map(|e| e.source())
            .next()
        {
            if !seen.insert(parent) {
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Some(path.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    /// Tries exact `group:artifact` first, then the artifact name alone.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        let by_ga = GroupArtifact::parse(key);
        self.graph.node_indices().find(|&idx| {
            let dep = &self.graph[idx];
            match &by_ga {
                Some(ga) => dep.gav.group_id == ga.group_id && dep.gav.artifact_id == ga.artifact_id,
                None => dep.gav.artifact_id == key,
            }
        })
    }

    /// Render the tree below `root`, down to `max_depth` levels.
    pub fn print_tree(&self, root: &str, max_depth: Option<usize>) -> String {
        let mut output = format!("{root}\n");
        let count = self.direct.len();
        for (i, &idx) in self.direct.iter().enumerate() {
            self.print_subtree(&mut output, idx, "", i == count - 1, 1, max_depth);
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let dep = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{dep} ({})", dep.scope));
        if dep.optional {
            output.push_str(" (optional)");
        }
        output.push('\n');

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children: Vec<NodeIndex> = self.child_indices(idx).collect();
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.print_subtree(output, child, &child_prefix, i == count - 1, depth + 1, max_depth);
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

/// The dependency graph of a project: one [`ClasspathGraph`] per classpath
/// plus the conflicts met while building them.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub root: GroupArtifactVersion,
    classpaths: BTreeMap<Classpath, ClasspathGraph>,
    pub conflicts: ConflictReport,
}

impl DependencyGraph {
    pub fn new(root: GroupArtifactVersion) -> Self {
        Self {
            root,
            classpaths: BTreeMap::new(),
            conflicts: ConflictReport::new(),
        }
    }

    pub(crate) fn insert_classpath(&mut self, graph: ClasspathGraph) {
        self.classpaths.insert(graph.classpath(), graph);
    }

    pub fn classpath(&self, classpath: Classpath) -> Option<&ClasspathGraph> {
        self.classpaths.get(&classpath)
    }

    /// The flattened dependencies of one classpath, nearest first.
    pub fn dependencies(&self, classpath: Classpath) -> Vec<&ResolvedDependency> {
        self.classpath(classpath)
            .map(|g| g.dependencies().collect())
            .unwrap_or_default()
    }

    /// Direct and transitive dependencies of any classpath matching
    /// `predicate`, each dependency version listed once.
    pub fn find_dependencies(
        &self,
        predicate: impl Fn(&ResolvedDependency) -> bool,
    ) -> Vec<&ResolvedDependency> {
        let mut seen = HashSet::new();
        self.classpaths
            .values()
            .flat_map(|g| g.dependencies())
            .filter(|d| predicate(d))
            .filter(|d| seen.insert((d.key(), d.gav.version.clone())))
            .collect()
    }

    /// Whether any classpath contains `groupId:artifactId` at `version`.
    pub fn contains(&self, gav: &GroupArtifactVersion) -> bool {
        self.classpaths.values().flat_map(|g| g.dependencies()).any(|d| {
            d.gav.group_id == gav.group_id
                && d.gav.artifact_id == gav.artifact_id
                && d.gav.version == gav.version
        })
    }

    pub fn find_path(&self, classpath: Classpath, target: &str) -> Option<Vec<&ResolvedDependency>> {
        self.classpath(classpath)?.find_path(target)
    }

    pub fn print_tree(&self, classpath: Classpath, max_depth: Option<usize>) -> String {
        match self.classpath(classpath) {
            Some(graph) => graph.print_tree(&self.root.to_string(), max_depth),
            None => format!("{}\n", self.root),
        }
    }
}
