//! POM parsing into the typed requested model.
//!
//! The parser walks quick-xml events while tracking the element path. Only
//! the structurally relevant elements are kept; everything else in the
//! document is skipped. Values are stored verbatim, placeholders included.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use pomgraph_core::gav::GroupArtifactVersion;
use pomgraph_core::pom::{
    Activation, Dependency, Exclusion, FileActivation, ManagedDependency, Parent, Plugin, Pom,
    Profile, PropertyActivation, DEFAULT_PLUGIN_GROUP_ID,
};
use pomgraph_core::repository::MavenRepository;
use pomgraph_util::errors::PomgraphError;

/// Parse a POM document. `origin` names the document in error messages.
pub fn parse_pom(xml: &str, origin: &str) -> miette::Result<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parser = PomParser::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                check_root(&mut seen_root, &path, e, origin)?;
                path.push(local_name(e));
                text_buf.clear();
                parser.open(&path);
            }
            Ok(Event::Empty(ref e)) => {
                check_root(&mut seen_root, &path, e, origin)?;
                path.push(local_name(e));
                parser.open(&path);
                parser.close(&path, "");
                path.pop();
                text_buf.clear();
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| xml_error(origin, err))?;
                text_buf.push_str(&text);
            }
            Ok(Event::CData(e)) => {
                text_buf.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                parser.close(&path, text_buf.trim());
                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(origin, e).into()),
            _ => {}
        }
    }

    if !seen_root {
        return Err(PomgraphError::Xml {
            origin: origin.to_string(),
            message: "document has no <project> element".to_string(),
        }
        .into());
    }

    Ok(parser.pom)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn check_root(
    seen_root: &mut bool,
    path: &[String],
    e: &BytesStart<'_>,
    origin: &str,
) -> miette::Result<()> {
    if !path.is_empty() {
        return Ok(());
    }
    let name = local_name(e);
    if name != "project" {
        return Err(PomgraphError::Xml {
            origin: origin.to_string(),
            message: format!("expected <project> root element, found <{name}>"),
        }
        .into());
    }
    *seen_root = true;
    Ok(())
}

fn xml_error(origin: &str, err: impl std::fmt::Display) -> PomgraphError {
    PomgraphError::Xml {
        origin: origin.to_string(),
        message: err.to_string(),
    }
}

#[derive(Default)]
struct PomParser {
    pom: Pom,
    profile: Option<Profile>,
    parent: Option<Parent>,
    dependency: Option<DependencyDraft>,
    exclusion: Option<Exclusion>,
    repository: Option<RepositoryDraft>,
    plugin: Option<Plugin>,
}

#[derive(Default)]
struct DependencyDraft {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    scope: Option<String>,
    type_: Option<String>,
    classifier: Option<String>,
    optional: bool,
    exclusions: Vec<Exclusion>,
}

impl DependencyDraft {
    fn gav(&self) -> GroupArtifactVersion {
        GroupArtifactVersion::new(
            self.group_id.clone(),
            self.artifact_id.clone(),
            self.version.clone(),
        )
    }

    fn into_dependency(self) -> Dependency {
        Dependency {
            gav: self.gav(),
            scope: self.scope,
            type_: self.type_,
            classifier: self.classifier,
            optional: self.optional,
            exclusions: self.exclusions,
        }
    }

    fn into_managed(self) -> ManagedDependency {
        let is_import = self.scope.as_deref() == Some("import")
            && self.type_.as_deref() == Some("pom");
        if is_import {
            ManagedDependency::Imported { gav: self.gav() }
        } else {
            ManagedDependency::Defined {
                gav: self.gav(),
                scope: self.scope,
                type_: self.type_,
                classifier: self.classifier,
                exclusions: self.exclusions,
            }
        }
    }
}

struct RepositoryDraft {
    id: String,
    url: String,
    releases: bool,
    snapshots: bool,
}

impl Default for RepositoryDraft {
    fn default() -> Self {
        Self {
            id: String::new(),
            url: String::new(),
            releases: true,
            snapshots: true,
        }
    }
}

/// The parts of the model a `<profile>` can contribute, borrowed from
/// either the POM itself or the profile being parsed.
struct Section<'a> {
    properties: &'a mut std::collections::BTreeMap<String, String>,
    dependencies: &'a mut Vec<Dependency>,
    dependency_management: &'a mut Vec<ManagedDependency>,
    repositories: &'a mut Vec<MavenRepository>,
    modules: &'a mut Vec<String>,
}

impl PomParser {
    fn section(&mut self, in_profile: bool) -> Section<'_> {
        match (&mut self.profile, in_profile) {
            (Some(p), true) => Section {
                properties: &mut p.properties,
                dependencies: &mut p.dependencies,
                dependency_management: &mut p.dependency_management,
                repositories: &mut p.repositories,
                modules: &mut p.modules,
            },
            _ => Section {
                properties: &mut self.pom.properties,
                dependencies: &mut self.pom.dependencies,
                dependency_management: &mut self.pom.dependency_management,
                repositories: &mut self.pom.repositories,
                modules: &mut self.pom.modules,
            },
        }
    }

    fn open(&mut self, path: &[String]) {
        let (rel, in_profile) = relative(path);
        match rel.as_slice() {
            [] if in_profile => self.profile = Some(Profile::default()),
            ["parent"] if !in_profile => {
                self.parent = Some(Parent {
                    gav: GroupArtifactVersion::new("", "", None),
                    relative_path: None,
                });
            }
            ["dependencies", "dependency"]
            | ["dependencyManagement", "dependencies", "dependency"] => {
                self.dependency = Some(DependencyDraft::default());
            }
            [.., "dependency", "exclusions", "exclusion"] => {
                self.exclusion = Some(Exclusion::new("", ""));
            }
            ["repositories", "repository"] => {
                self.repository = Some(RepositoryDraft::default());
            }
            ["build", "plugins", "plugin"] | ["build", "pluginManagement", "plugins", "plugin"]
                if !in_profile =>
            {
                self.plugin = Some(Plugin {
                    group_id: DEFAULT_PLUGIN_GROUP_ID.to_string(),
                    artifact_id: String::new(),
                    version: None,
                });
            }
            ["activation"] if in_profile => {
                if let Some(p) = self.profile.as_mut() {
                    p.activation = Some(Activation::default());
                }
            }
            ["activation", "property"] => {
                if let Some(a) = self.activation_mut() {
                    a.property = Some(PropertyActivation {
                        name: String::new(),
                        value: None,
                    });
                }
            }
            ["activation", "file"] => {
                if let Some(a) = self.activation_mut() {
                    a.file = Some(FileActivation::default());
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, path: &[String], text: &str) {
        let (rel, in_profile) = relative(path);
        let value = text.to_string();

        match rel.as_slice() {
            [] if in_profile => {
                if let Some(profile) = self.profile.take() {
                    self.pom.profiles.push(profile);
                }
            }

            // Coordinates
            ["groupId"] if !in_profile => self.pom.group_id = Some(value),
            ["artifactId"] if !in_profile => self.pom.artifact_id = value,
            ["version"] if !in_profile => self.pom.version = Some(value),
            ["packaging"] if !in_profile => self.pom.packaging = Some(value),
            ["id"] if in_profile => {
                if let Some(p) = self.profile.as_mut() {
                    p.id = value;
                }
            }

            // Parent
            ["parent", field] if !in_profile => {
                if let Some(parent) = self.parent.as_mut() {
                    match *field {
                        "groupId" => parent.gav.group_id = value,
                        "artifactId" => parent.gav.artifact_id = value,
                        "version" => parent.gav.version = Some(value),
                        "relativePath" => parent.relative_path = Some(value),
                        _ => {}
                    }
                }
            }
            ["parent"] if !in_profile => self.pom.parent = self.parent.take(),

            ["properties", name] => {
                self.section(in_profile)
                    .properties
                    .insert(name.to_string(), value);
            }

            // Exclusions
            [.., "dependency", "exclusions", "exclusion", field] => {
                if let Some(exclusion) = self.exclusion.as_mut() {
                    match *field {
                        "groupId" => exclusion.group_id = value,
                        "artifactId" => exclusion.artifact_id = value,
                        _ => {}
                    }
                }
            }
            [.., "dependency", "exclusions", "exclusion"] => {
                if let (Some(mut exclusion), Some(dep)) =
                    (self.exclusion.take(), self.dependency.as_mut())
                {
                    if exclusion.artifact_id.is_empty() {
                        exclusion.artifact_id = "*".to_string();
                    }
                    if !exclusion.group_id.is_empty() {
                        dep.exclusions.push(exclusion);
                    }
                }
            }

            // Dependencies
            ["dependencies", "dependency", field]
            | ["dependencyManagement", "dependencies", "dependency", field] => {
                if let Some(dep) = self.dependency.as_mut() {
                    match *field {
                        "groupId" => dep.group_id = value,
                        "artifactId" => dep.artifact_id = value,
                        "version" => dep.version = Some(value),
                        "scope" => dep.scope = Some(value),
                        "type" => dep.type_ = Some(value),
                        "classifier" => dep.classifier = Some(value),
                        "optional" => dep.optional = value == "true",
                        _ => {}
                    }
                }
            }
            ["dependencies", "dependency"] => {
                if let Some(dep) = self.dependency.take() {
                    self.section(in_profile)
                        .dependencies
                        .push(dep.into_dependency());
                }
            }
            ["dependencyManagement", "dependencies", "dependency"] => {
                if let Some(dep) = self.dependency.take() {
                    self.section(in_profile)
                        .dependency_management
                        .push(dep.into_managed());
                }
            }

            // Repositories
            ["repositories", "repository", field] => {
                if let Some(repo) = self.repository.as_mut() {
                    match *field {
                        "id" => repo.id = value,
                        "url" => repo.url = value,
                        _ => {}
                    }
                }
            }
            ["repositories", "repository", policy, "enabled"] => {
                if let Some(repo) = self.repository.as_mut() {
                    let enabled = value != "false";
                    match *policy {
                        "releases" => repo.releases = enabled,
                        "snapshots" => repo.snapshots = enabled,
                        _ => {}
                    }
                }
            }
            ["repositories", "repository"] => {
                if let Some(draft) = self.repository.take() {
                    if draft.url.is_empty() {
                        tracing::debug!("Skipping repository '{}' without a URL", draft.id);
                    } else {
                        let repo = MavenRepository {
                            releases: draft.releases,
                            snapshots: draft.snapshots,
                            ..MavenRepository::new(draft.id, &draft.url)
                        };
                        self.section(in_profile).repositories.push(repo);
                    }
                }
            }

            // Plugins
            ["build", "plugins", "plugin", field]
            | ["build", "pluginManagement", "plugins", "plugin", field]
                if !in_profile =>
            {
                if let Some(plugin) = self.plugin.as_mut() {
                    match *field {
                        "groupId" => plugin.group_id = value,
                        "artifactId" => plugin.artifact_id = value,
                        "version" => plugin.version = Some(value),
                        _ => {}
                    }
                }
            }
            ["build", "plugins", "plugin"] if !in_profile => {
                if let Some(plugin) = self.plugin.take() {
                    self.pom.plugins.push(plugin);
                }
            }
            ["build", "pluginManagement", "plugins", "plugin"] if !in_profile => {
                if let Some(plugin) = self.plugin.take() {
                    self.pom.plugin_management.push(plugin);
                }
            }

            ["modules", "module"] => self.section(in_profile).modules.push(value),

            // Profile activation
            ["activation", "activeByDefault"] => {
                if let Some(a) = self.activation_mut() {
                    a.active_by_default = value == "true";
                }
            }
            ["activation", "jdk"] => {
                if let Some(a) = self.activation_mut() {
                    a.jdk = Some(value);
                }
            }
            ["activation", "property", field] => {
                if let Some(p) = self.activation_mut().and_then(|a| a.property.as_mut()) {
                    match *field {
                        "name" => p.name = value,
                        "value" => p.value = Some(value),
                        _ => {}
                    }
                }
            }
            ["activation", "file", field] => {
                if let Some(f) = self.activation_mut().and_then(|a| a.file.as_mut()) {
                    match *field {
                        "exists" => f.exists = Some(value),
                        "missing" => f.missing = Some(value),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn activation_mut(&mut self) -> Option<&mut Activation> {
        self.profile.as_mut().and_then(|p| p.activation.as_mut())
    }
}

/// Split an element path into the part relative to `<project>` or to the
/// enclosing `<profile>`, and whether it lies inside a profile.
fn relative(path: &[String]) -> (Vec<&str>, bool) {
    let parts: Vec<&str> = path.iter().map(String::as_str).collect();
    match parts.as_slice() {
        ["project", "profiles", "profile", rest @ ..] => (rest.to_vec(), true),
        ["project", rest @ ..] => (rest.to_vec(), false),
        _ => (Vec::new(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>org.example</groupId>
    <artifactId>my-lib</artifactId>
    <version>1.0.0</version>
    <packaging>jar</packaging>

    <properties>
        <slf4j.version>2.3.0</slf4j.version>
    </properties>

    <dependencies>
        <dependency>
            <groupId>org.slf4j</groupId>
            <artifactId>slf4j-api</artifactId>
            <version>${slf4j.version}</version>
        </dependency>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.13.2</version>
            <scope>test</scope>
            <optional>true</optional>
        </dependency>
    </dependencies>
</project>"#;

    #[test]
    fn parse_simple_pom() {
        let pom = parse_pom(SIMPLE_POM, "my-lib.pom").unwrap();
        assert_eq!(pom.group_id.as_deref(), Some("org.example"));
        assert_eq!(pom.artifact_id, "my-lib");
        assert_eq!(pom.version.as_deref(), Some("1.0.0"));
        assert_eq!(pom.packaging.as_deref(), Some("jar"));
        assert_eq!(pom.properties.get("slf4j.version").unwrap(), "2.3.0");
        assert_eq!(pom.dependencies.len(), 2);
        assert_eq!(
            pom.dependencies[0].gav.version.as_deref(),
            Some("${slf4j.version}")
        );
        assert_eq!(pom.dependencies[0].scope, None);
        assert_eq!(pom.dependencies[1].scope.as_deref(), Some("test"));
        assert!(pom.dependencies[1].optional);
    }

    #[test]
    fn dependency_management_and_bom() {
        let xml = r#"<project>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.0.0</version>
    <dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>com.fasterxml.jackson</groupId>
                <artifactId>jackson-bom</artifactId>
                <version>1.8.0</version>
                <type>pom</type>
                <scope>import</scope>
            </dependency>
            <dependency>
                <groupId>com.google.guava</groupId>
                <artifactId>guava</artifactId>
                <version>32.0.0-jre</version>
                <scope>runtime</scope>
                <exclusions>
                    <exclusion>
                        <groupId>com.google.code.findbugs</groupId>
                        <artifactId>*</artifactId>
                    </exclusion>
                </exclusions>
            </dependency>
        </dependencies>
    </dependencyManagement>
</project>"#;
        let pom = parse_pom(xml, "parent.pom").unwrap();
        assert_eq!(pom.dependency_management.len(), 2);
        let boms: Vec<_> = pom.bom_imports().collect();
        assert_eq!(boms.len(), 1);
        assert_eq!(boms[0].artifact_id, "jackson-bom");

        match &pom.dependency_management[1] {
            ManagedDependency::Defined {
                gav,
                scope,
                exclusions,
                ..
            } => {
                assert_eq!(gav.version.as_deref(), Some("32.0.0-jre"));
                assert_eq!(scope.as_deref(), Some("runtime"));
                assert_eq!(exclusions, &vec![Exclusion::new("com.google.code.findbugs", "*")]);
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn parent_with_empty_relative_path() {
        let xml = r#"<project>
    <parent>
        <groupId>org.example</groupId>
        <artifactId>parent-pom</artifactId>
        <version>2.0.0</version>
        <relativePath/>
    </parent>
    <artifactId>child</artifactId>
</project>"#;
        let pom = parse_pom(xml, "child.pom").unwrap();
        let parent = pom.parent.as_ref().unwrap();
        assert_eq!(parent.gav.to_string(), "org.example:parent-pom:2.0.0");
        assert_eq!(parent.relative_path.as_deref(), Some(""));
        assert_eq!(parent.effective_relative_path(), None);
        assert_eq!(pom.declared_gav().to_string(), "org.example:child:2.0.0");
    }

    #[test]
    fn exclusion_without_artifact_is_wildcard() {
        let xml = r#"<project>
    <artifactId>app</artifactId>
    <dependencies>
        <dependency>
            <groupId>com.example</groupId>
            <artifactId>lib</artifactId>
            <exclusions>
                <exclusion><groupId>commons-logging</groupId></exclusion>
            </exclusions>
        </dependency>
    </dependencies>
</project>"#;
        let pom = parse_pom(xml, "app.pom").unwrap();
        assert_eq!(
            pom.dependencies[0].exclusions,
            vec![Exclusion::new("commons-logging", "*")]
        );
        assert!(pom.dependencies[0].gav.version.is_none());
    }

    #[test]
    fn plugins_and_repositories() {
        let xml = r#"<project>
    <artifactId>app</artifactId>
    <repositories>
        <repository>
            <id>corp-snapshots</id>
            <url>https://nexus.corp/snapshots/</url>
            <releases><enabled>false</enabled></releases>
        </repository>
    </repositories>
    <build>
        <pluginManagement>
            <plugins>
                <plugin>
                    <artifactId>maven-surefire-plugin</artifactId>
                    <version>3.2.5</version>
                </plugin>
            </plugins>
        </pluginManagement>
        <plugins>
            <plugin>
                <groupId>org.codehaus.mojo</groupId>
                <artifactId>exec-maven-plugin</artifactId>
                <version>${exec.version}</version>
            </plugin>
        </plugins>
    </build>
</project>"#;
        let pom = parse_pom(xml, "app.pom").unwrap();
        assert_eq!(pom.repositories.len(), 1);
        let repo = &pom.repositories[0];
        assert_eq!(repo.url, "https://nexus.corp/snapshots");
        assert!(!repo.releases);
        assert!(repo.snapshots);

        assert_eq!(pom.plugin_management.len(), 1);
        assert_eq!(pom.plugin_management[0].group_id, DEFAULT_PLUGIN_GROUP_ID);
        assert_eq!(pom.plugins[0].group_id, "org.codehaus.mojo");
    }

    #[test]
    fn profiles_are_kept_apart_from_the_main_model() {
        let xml = r#"<project>
    <artifactId>app</artifactId>
    <modules><module>core</module></modules>
    <profiles>
        <profile>
            <id>ci</id>
            <activation>
                <property><name>!skipCi</name></property>
                <jdk>[17,)</jdk>
                <file><exists>${basedir}/ci.marker</exists></file>
            </activation>
            <properties><flavor>ci</flavor></properties>
            <modules><module>integration</module></modules>
            <dependencies>
                <dependency>
                    <groupId>org.test</groupId>
                    <artifactId>harness</artifactId>
                    <version>1.0</version>
                </dependency>
            </dependencies>
        </profile>
        <profile>
            <id>default</id>
            <activation><activeByDefault>true</activeByDefault></activation>
        </profile>
    </profiles>
</project>"#;
        let pom = parse_pom(xml, "app.pom").unwrap();
        assert_eq!(pom.modules, vec!["core"]);
        assert!(pom.dependencies.is_empty());
        assert!(pom.properties.is_empty());
        assert_eq!(pom.profiles.len(), 2);

        let ci = &pom.profiles[0];
        assert_eq!(ci.id, "ci");
        assert_eq!(ci.modules, vec!["integration"]);
        assert_eq!(ci.properties.get("flavor").map(String::as_str), Some("ci"));
        assert_eq!(ci.dependencies.len(), 1);
        let activation = ci.activation.as_ref().unwrap();
        assert_eq!(activation.property.as_ref().unwrap().name, "!skipCi");
        assert_eq!(activation.jdk.as_deref(), Some("[17,)"));
        assert_eq!(
            activation.file.as_ref().unwrap().exists.as_deref(),
            Some("${basedir}/ci.marker")
        );

        assert!(pom.profiles[1].activation.as_ref().unwrap().active_by_default);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse_pom("<project><artifactId>x</groupId></project>", "broken.pom")
            .unwrap_err();
        assert!(err.to_string().contains("broken.pom"), "{err}");
    }

    #[test]
    fn non_pom_root_is_an_error() {
        let err = parse_pom("<metadata><groupId>g</groupId></metadata>", "x.pom").unwrap_err();
        assert!(err.to_string().contains("<project>"), "{err}");
    }
}
