//! Reactor ordering for multi-module builds.
//!
//! Models the dependencies between the modules of one build and orders
//! them so every module comes after the modules it depends on. Uses
//! `petgraph` to hold the module DAG.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use pomgraph_core::failure::{DownloadFailures, Outcome, ReactorCycle};
use pomgraph_core::gav::GroupArtifactVersion;
use pomgraph_maven::project;

use crate::graph::DependencyGraph;
use crate::merger::PomResolver;
use crate::resolved::ResolvedPom;
use crate::resolver::resolve_dependencies;

/// One module of the build with its resolved dependency graph.
#[derive(Debug)]
pub struct ReactorNode {
    pub project: Arc<ResolvedPom>,
    pub graph: DependencyGraph,
}

impl ReactorNode {
    pub fn gav(&self) -> &GroupArtifactVersion {
        &self.project.gav
    }
}

/// A module and the reactor members it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorTree {
    pub gav: GroupArtifactVersion,
    pub dependencies: Vec<ReactorTree>,
}

/// The modules of one build ordered dependencies first. An edge A -> B
/// means A depends on B.
#[derive(Debug)]
pub struct Reactor {
    graph: DiGraph<ReactorNode, ()>,
    order: Vec<NodeIndex>,
}

impl Reactor {
    /// Modules in build order.
    pub fn iter(&self) -> impl Iterator<Item = &ReactorNode> {
        self.order.iter().map(|&idx| &self.graph[idx])
    }

    pub fn build_order(&self) -> Vec<&GroupArtifactVersion> {
        self.iter().map(ReactorNode::gav).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, gav: &GroupArtifactVersion) -> Option<&ReactorNode> {
        self.graph.node_weights().find(|n| n.gav() == gav)
    }

    /// Reactor members `gav` depends on directly, in declaration order.
    pub fn dependencies_of(&self, gav: &GroupArtifactVersion) -> Vec<&ReactorNode> {
        self.index_of(gav)
            .map(|idx| {
                self.neighbors(idx, Direction::Outgoing)
                    .into_iter()
                    .map(|n| &self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// One tree per module no other member depends on.
    pub fn roots(&self) -> Vec<ReactorTree> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.tree(idx))
            .collect()
    }

    fn tree(&self, idx: NodeIndex) -> ReactorTree {
        ReactorTree {
            gav: self.graph[idx].gav().clone(),
            dependencies: self
                .neighbors(idx, Direction::Outgoing)
                .into_iter()
                .map(|n| self.tree(n))
                .collect(),
        }
    }

    fn index_of(&self, gav: &GroupArtifactVersion) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].gav() == gav)
    }

    fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(idx, direction).collect();
        neighbors.sort();
        neighbors
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Visiting,
    Done,
}

/// Order resolved modules so that each comes after the members it depends
/// on, directly or transitively, or after its parent when the parent is a
/// member too.
pub fn order(projects: Vec<(Arc<ResolvedPom>, DependencyGraph)>) -> Result<Reactor, ReactorCycle> {
    let mut graph: DiGraph<ReactorNode, ()> = DiGraph::new();
    for (project, dependencies) in projects {
        graph.add_node(ReactorNode {
            project,
            graph: dependencies,
        });
    }

    let members: Vec<(NodeIndex, GroupArtifactVersion)> = graph
        .node_indices()
        .map(|idx| (idx, graph[idx].gav().clone()))
        .collect();
    let mut edges = Vec::new();
    for &(from, _) in &members {
        let node = &graph[from];
        let parent = node.project.parent().map(|p| &p.gav);
        for (to, gav) in &members {
            if from != *to && (node.graph.contains(gav) || parent == Some(gav)) {
                edges.push((from, *to));
            }
        }
    }
    for (from, to) in edges {
        graph.add_edge(from, to, ());
    }

    let mut marks = vec![Mark::New; graph.node_count()];
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(graph.node_count());
    for idx in graph.node_indices() {
        visit(&graph, idx, &mut marks, &mut stack, &mut order)?;
    }

    tracing::debug!("Reactor order: {} module(s)", order.len());
    Ok(Reactor { graph, order })
}

fn visit(
    graph: &DiGraph<ReactorNode, ()>,
    idx: NodeIndex,
    marks: &mut [Mark],
    stack: &mut Vec<NodeIndex>,
    order: &mut Vec<NodeIndex>,
) -> Result<(), ReactorCycle> {
    match marks[idx.index()] {
        Mark::Done => return Ok(()),
        Mark::Visiting => {
            let start = stack.iter().position(|&n| n == idx).unwrap_or(0);
            let mut members: Vec<String> = stack[start..]
                .iter()
                .map(|&n| graph[n].gav().to_string())
                .collect();
            members.push(graph[idx].gav().to_string());
            return Err(ReactorCycle { members });
        }
        Mark::New => {}
    }

    marks[idx.index()] = Mark::Visiting;
    stack.push(idx);
    let mut dependencies: Vec<NodeIndex> = graph.neighbors(idx).collect();
    dependencies.sort();
    for dependency in dependencies {
        visit(graph, dependency, marks, stack, order)?;
    }
    stack.pop();
    marks[idx.index()] = Mark::Done;
    order.push(idx);
    Ok(())
}

/// Load the build rooted at `root`, resolve every module and order them.
///
/// Modules are registered with `resolver` before resolution, so members
/// never download each other. A reactor cycle is an error; download
/// failures are carried in the outcome.
pub async fn load_reactor(root: &Path, resolver: &PomResolver) -> miette::Result<Outcome<Reactor>> {
    let poms: Vec<_> = project::load_tree(root, |pom| resolver.modules_of(pom))?
        .into_iter()
        .map(Arc::new)
        .collect();
    resolver.add_local_poms(poms.iter().cloned()).await;

    let resolved = join_all(poms.iter().map(|pom| async move {
        let project = resolver.resolve(pom.clone()).await;
        let graph = resolve_dependencies(&project.value, resolver).await;
        (project, graph)
    }))
    .await;

    let mut failures = DownloadFailures::new();
    let mut projects = Vec::with_capacity(resolved.len());
    for (project, graph) in resolved {
        failures.extend(project.failures);
        failures.extend(graph.failures);
        projects.push((project.value, graph.value));
    }

    let reactor = order(projects)?;
    tracing::info!("Ordered {} module(s) under {}", reactor.len(), root.display());
    Ok(Outcome::new(reactor, failures))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pomgraph_core::pom::Pom;
    use pomgraph_core::scope::{Classpath, Scope};

    use super::*;
    use crate::graph::{ClasspathGraph, ResolvedDependency};

    fn project(artifact: &str, parent: Option<Arc<ResolvedPom>>) -> Arc<ResolvedPom> {
        Arc::new(ResolvedPom::new(
            Arc::new(Pom::default()),
            GroupArtifactVersion::of("org.build", artifact, "1.0"),
            "jar".to_string(),
            parent,
            BTreeMap::new(),
            BTreeMap::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        ))
    }

    fn depending_on(root: &ResolvedPom, artifacts: &[&str]) -> DependencyGraph {
        let mut compile = ClasspathGraph::new(Classpath::Compile);
        for artifact in artifacts {
            compile.insert(
                ResolvedDependency {
                    gav: GroupArtifactVersion::of("org.build", artifact, "1.0"),
                    type_: "jar".to_string(),
                    classifier: None,
                    scope: Scope::Compile,
                    optional: false,
                    exclusions: Vec::new(),
                    direct: true,
                    depth: 0,
                },
                None,
            );
        }
        let mut graph = DependencyGraph::new(root.gav.clone());
        graph.insert_classpath(compile);
        graph
    }

    fn module(artifact: &str, deps: &[&str]) -> (Arc<ResolvedPom>, DependencyGraph) {
        let p = project(artifact, None);
        let g = depending_on(&p, deps);
        (p, g)
    }

    fn artifacts(reactor: &Reactor) -> Vec<&str> {
        reactor
            .build_order()
            .into_iter()
            .map(|g| g.artifact_id.as_str())
            .collect()
    }

    #[test]
    fn dependencies_build_first() {
        let reactor = order(vec![
            module("m1", &["m2"]),
            module("m2", &["m3"]),
            module("m3", &[]),
        ])
        .unwrap();
        assert_eq!(artifacts(&reactor), vec!["m3", "m2", "m1"]);

        let roots = reactor.roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].gav.artifact_id, "m1");
        assert_eq!(roots[0].dependencies[0].gav.artifact_id, "m2");
        assert_eq!(roots[0].dependencies[0].dependencies[0].gav.artifact_id, "m3");
    }

    #[test]
    fn independent_modules_keep_declaration_order() {
        let reactor = order(vec![module("a", &[]), module("b", &[]), module("c", &["a"])]).unwrap();
        assert_eq!(artifacts(&reactor), vec!["a", "b", "c"]);
        assert_eq!(reactor.roots().len(), 2);
        let c = GroupArtifactVersion::of("org.build", "c", "1.0");
        assert_eq!(reactor.dependencies_of(&c).len(), 1);
    }

    #[test]
    fn parent_member_builds_before_child() {
        let parent = project("parent", None);
        let parent_graph = depending_on(&parent, &[]);
        let child = project("child", Some(parent.clone()));
        let child_graph = depending_on(&child, &[]);

        let reactor = order(vec![(child, child_graph), (parent, parent_graph)]).unwrap();
        assert_eq!(artifacts(&reactor), vec!["parent", "child"]);
    }

    #[test]
    fn external_dependencies_add_no_edges() {
        let reactor = order(vec![module("a", &["guava"]), module("b", &[])]).unwrap();
        assert_eq!(artifacts(&reactor), vec!["a", "b"]);
        assert_eq!(reactor.roots().len(), 2);
    }

    #[test]
    fn cycle_lists_its_members() {
        let err = order(vec![
            module("a", &["b"]),
            module("b", &["c"]),
            module("c", &["a"]),
        ])
        .unwrap_err();
        assert_eq!(
            err.members,
            vec![
                "org.build:a:1.0",
                "org.build:b:1.0",
                "org.build:c:1.0",
                "org.build:a:1.0"
            ]
        );
    }
}
