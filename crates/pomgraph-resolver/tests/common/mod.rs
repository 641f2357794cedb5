#![allow(dead_code)]

use std::sync::Arc;

use pomgraph_core::pom::Pom;
use pomgraph_core::repository::MavenRepository;
use pomgraph_core::scope::Classpath;
use pomgraph_core::settings::Settings;
use pomgraph_maven::downloader::MavenPomDownloader;
use pomgraph_maven::transport::InMemoryTransport;
use pomgraph_maven::xml::parse_pom;
use pomgraph_resolver::graph::{DependencyGraph, ResolvedDependency};
use pomgraph_resolver::merger::PomResolver;
use pomgraph_resolver::profile::ActivationContext;

pub const REPO: &str = "https://repo.test/maven2";

pub fn repo() -> MavenRepository {
    MavenRepository::new("test", REPO)
}

/// An in-memory repository that POMs and metadata are published to.
#[derive(Default)]
pub struct Fixture {
    transport: InMemoryTransport,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `group:artifact:version` with `body` inside `<project>`.
    pub fn publish(mut self, group: &str, artifact: &str, version: &str, body: &str) -> Self {
        let url = format!(
            "{REPO}/{}/{artifact}/{version}/{artifact}-{version}.pom",
            group.replace('.', "/")
        );
        self.transport.insert(url, project_xml(group, artifact, version, body));
        self
    }

    /// Publish artifact-level metadata listing `versions`.
    pub fn metadata(mut self, group: &str, artifact: &str, versions: &[&str]) -> Self {
        let url = format!("{REPO}/{}/{artifact}/maven-metadata.xml", group.replace('.', "/"));
        let listed: String = versions
            .iter()
            .map(|v| format!("<version>{v}</version>"))
            .collect();
        self.transport.insert(
            url,
            format!(
                "<metadata><groupId>{group}</groupId><artifactId>{artifact}</artifactId>\
                 <versioning><versions>{listed}</versions></versioning></metadata>"
            ),
        );
        self
    }

    pub fn resolver(self) -> (Arc<InMemoryTransport>, PomResolver) {
        self.resolver_with(ActivationContext::default())
    }

    pub fn resolver_with(self, activation: ActivationContext) -> (Arc<InMemoryTransport>, PomResolver) {
        let transport = Arc::new(self.transport);
        let downloader = MavenPomDownloader::new(transport.clone(), Arc::new(Settings::default()));
        let resolver = PomResolver::new(Arc::new(downloader), activation, vec![repo()]);
        (transport, resolver)
    }
}

pub fn project_xml(group: &str, artifact: &str, version: &str, body: &str) -> String {
    format!(
        "<project><groupId>{group}</groupId><artifactId>{artifact}</artifactId>\
         <version>{version}</version>{body}</project>"
    )
}

/// The project under resolution, `com.app:app:1.0`.
pub fn app(body: &str) -> Arc<Pom> {
    Arc::new(parse_pom(&project_xml("com.app", "app", "1.0", body), "app/pom.xml").unwrap())
}

pub fn dep(group: &str, artifact: &str, version: &str) -> String {
    format!("<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId><version>{version}</version></dependency>")
}

pub fn dep_scoped(group: &str, artifact: &str, version: &str, scope: &str) -> String {
    format!(
        "<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId>\
         <version>{version}</version><scope>{scope}</scope></dependency>"
    )
}

pub fn unversioned(group: &str, artifact: &str) -> String {
    format!("<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId></dependency>")
}

pub fn dependencies(deps: &[String]) -> String {
    format!("<dependencies>{}</dependencies>", deps.concat())
}

pub fn managed(deps: &[String]) -> String {
    format!("<dependencyManagement>{}</dependencyManagement>", dependencies(deps))
}

pub fn bom_import(group: &str, artifact: &str, version: &str) -> String {
    format!(
        "<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId>\
         <version>{version}</version><type>pom</type><scope>import</scope></dependency>"
    )
}

pub fn parent(group: &str, artifact: &str, version: &str) -> String {
    format!("<parent><groupId>{group}</groupId><artifactId>{artifact}</artifactId><version>{version}</version></parent>")
}

pub fn properties(pairs: &[(&str, &str)]) -> String {
    let inner: String = pairs
        .iter()
        .map(|(k, v)| format!("<{k}>{v}</{k}>"))
        .collect();
    format!("<properties>{inner}</properties>")
}

/// Find `group:artifact` on a classpath.
pub fn find<'g>(
    graph: &'g DependencyGraph,
    classpath: Classpath,
    group_artifact: &str,
) -> Option<&'g ResolvedDependency> {
    graph
        .dependencies(classpath)
        .into_iter()
        .find(|d| d.group_artifact().to_string() == group_artifact)
}

/// `group:artifact:version` of every dependency on a classpath, nearest
/// first.
pub fn listed(graph: &DependencyGraph, classpath: Classpath) -> Vec<String> {
    graph
        .dependencies(classpath)
        .into_iter()
        .map(|d| d.to_string())
        .collect()
}
