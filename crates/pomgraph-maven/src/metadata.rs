//! maven-metadata.xml parsing for version discovery and SNAPSHOT resolution.
//!
//! One type covers both flavours of the document: the artifact-level file
//! listing published versions, and the version-level file that maps a
//! `-SNAPSHOT` version to its timestamped file names.

use quick_xml::events::Event;
use quick_xml::Reader;

use pomgraph_util::errors::PomgraphError;

/// Parsed `maven-metadata.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MavenMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    /// Present only in version-level metadata.
    pub version: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
    /// `yyyyMMddHHmmss`, as published by the repository.
    pub last_updated: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub snapshot_versions: Vec<SnapshotVersion>,
}

/// `<versioning><snapshot>`: the newest deployed build of a SNAPSHOT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub timestamp: Option<String>,
    pub build_number: Option<u32>,
    pub local_copy: bool,
}

/// `<snapshotVersions><snapshotVersion>`: the timestamped file version of one
/// deployed file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: String,
    pub value: String,
    pub updated: Option<String>,
}

impl MavenMetadata {
    /// Fold metadata published by another repository into this one.
    ///
    /// Versions are unioned in first-seen order. `latest`, `release` and the
    /// snapshot information come from whichever document was updated most
    /// recently.
    pub fn merge(&mut self, other: MavenMetadata) {
        for version in other.versions {
            if !self.versions.contains(&version) {
                self.versions.push(version);
            }
        }

        let other_is_newer = match (&self.last_updated, &other.last_updated) {
            (Some(mine), Some(theirs)) => theirs > mine,
            (None, Some(_)) => true,
            _ => false,
        };

        if other_is_newer || self.latest.is_none() {
            self.latest = other.latest.or(self.latest.take());
        }
        if other_is_newer || self.release.is_none() {
            self.release = other.release.or(self.release.take());
        }
        if other_is_newer || self.snapshot.is_none() {
            self.snapshot = other.snapshot.or(self.snapshot.take());
        }
        if (other_is_newer || self.snapshot_versions.is_empty())
            && !other.snapshot_versions.is_empty()
        {
            self.snapshot_versions = other.snapshot_versions;
        }
        if other_is_newer {
            self.last_updated = other.last_updated;
        }
        self.group_id = self.group_id.take().or(other.group_id);
        self.artifact_id = self.artifact_id.take().or(other.artifact_id);
        self.version = self.version.take().or(other.version);
    }

    /// The timestamped version of the file with the given extension and
    /// classifier, e.g. `1.0-20240615.143022-42` for `1.0-SNAPSHOT`.
    ///
    /// Returns `None` when the repository stores the file under its literal
    /// `-SNAPSHOT` name.
    pub fn timestamped_version(&self, extension: &str, classifier: Option<&str>) -> Option<String> {
        let listed = self.snapshot_versions.iter().find(|sv| {
            sv.extension == extension && sv.classifier.as_deref() == classifier
        });
        if let Some(sv) = listed {
            return Some(sv.value.clone());
        }

        let snapshot = self.snapshot.as_ref()?;
        if snapshot.local_copy {
            return None;
        }
        let base = self.version.as_deref()?.strip_suffix("-SNAPSHOT")?;
        let ts = snapshot.timestamp.as_deref()?;
        let bn = snapshot.build_number?;
        Some(format!("{base}-{ts}-{bn}"))
    }
}

/// Parse a `maven-metadata.xml` document. `origin` names the document in
/// error messages.
pub fn parse_metadata(xml: &str, origin: &str) -> miette::Result<MavenMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = MavenMetadata::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut snapshot_version: Option<SnapshotVersion> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                text_buf.clear();
                let ctx = path.join(">");
                match ctx.as_str() {
                    "metadata>versioning>snapshot" => {
                        meta.snapshot.get_or_insert_with(Snapshot::default);
                    }
                    "metadata>versioning>snapshotVersions>snapshotVersion" => {
                        snapshot_version = Some(SnapshotVersion::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| metadata_error(origin, err))?;
                text_buf.push_str(&text);
            }
            Ok(Event::End(_)) => {
                let ctx = path.join(">");
                let value = text_buf.trim().to_string();

                match ctx.as_str() {
                    "metadata>groupId" => meta.group_id = Some(value),
                    "metadata>artifactId" => meta.artifact_id = Some(value),
                    "metadata>version" => meta.version = Some(value),
                    "metadata>versioning>latest" => meta.latest = Some(value),
                    "metadata>versioning>release" => meta.release = Some(value),
                    "metadata>versioning>lastUpdated" => meta.last_updated = Some(value),
                    "metadata>versioning>versions>version" => {
                        if !value.is_empty() && !meta.versions.contains(&value) {
                            meta.versions.push(value);
                        }
                    }
                    "metadata>versioning>snapshot>timestamp" => {
                        if let Some(s) = meta.snapshot.as_mut() {
                            s.timestamp = Some(value);
                        }
                    }
                    "metadata>versioning>snapshot>buildNumber" => {
                        if let Some(s) = meta.snapshot.as_mut() {
                            s.build_number = value.parse().ok();
                        }
                    }
                    "metadata>versioning>snapshot>localCopy" => {
                        if let Some(s) = meta.snapshot.as_mut() {
                            s.local_copy = value == "true";
                        }
                    }
                    "metadata>versioning>snapshotVersions>snapshotVersion>classifier" => {
                        if let Some(sv) = snapshot_version.as_mut() {
                            sv.classifier = Some(value).filter(|c| !c.is_empty());
                        }
                    }
                    "metadata>versioning>snapshotVersions>snapshotVersion>extension" => {
                        if let Some(sv) = snapshot_version.as_mut() {
                            sv.extension = value;
                        }
                    }
                    "metadata>versioning>snapshotVersions>snapshotVersion>value" => {
                        if let Some(sv) = snapshot_version.as_mut() {
                            sv.value = value;
                        }
                    }
                    "metadata>versioning>snapshotVersions>snapshotVersion>updated" => {
                        if let Some(sv) = snapshot_version.as_mut() {
                            sv.updated = Some(value);
                        }
                    }
                    "metadata>versioning>snapshotVersions>snapshotVersion" => {
                        if let Some(sv) = snapshot_version.take() {
                            meta.snapshot_versions.push(sv);
                        }
                    }
                    _ => {}
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(metadata_error(origin, e).into()),
            _ => {}
        }
    }

    Ok(meta)
}

fn metadata_error(origin: &str, err: impl std::fmt::Display) -> PomgraphError {
    PomgraphError::Xml {
        origin: origin.to_string(),
        message: err.to_string(),
    }
}
