//! Failure taxonomy shared by every resolution stage.
//!
//! Download failures are recovered locally: resolution continues with a
//! best-effort model and hands the accumulated failures to the caller inside
//! an [`Outcome`]. Only reactor cycles abort the operation that found them.

use std::fmt;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Why a single repository could not provide an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The repository answered 404.
    NotFound,
    /// The repository could not be reached or answered with an error status.
    Network(String),
    /// The document was downloaded but is not a valid POM/metadata file.
    Parse(String),
    /// The fetch exceeded the per-fetch timeout.
    Timeout(Duration),
    /// No version published in the repositories satisfies the requested selector.
    NoMatchingVersion(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Parse(msg) => write!(f, "unparseable: {msg}"),
            Self::Timeout(d) => write!(f, "timed out after {}s", d.as_secs()),
            Self::NoMatchingVersion(selector) => {
                write!(f, "no published version satisfies '{selector}'")
            }
        }
    }
}

/// One attempt to obtain an artifact from one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryAttempt {
    pub repository: String,
    pub cause: FailureCause,
}

/// An artifact that could not be obtained from any listed repository.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Unable to download {artifact}: {}", describe_attempts(.attempts))]
#[diagnostic(help("Check the repository declarations and network access for this artifact"))]
pub struct DownloadFailure {
    pub artifact: String,
    pub attempts: Vec<RepositoryAttempt>,
}

impl DownloadFailure {
    pub fn new(artifact: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            attempts: Vec::new(),
        }
    }

    pub fn with_attempt(mut self, repository: impl Into<String>, cause: FailureCause) -> Self {
        self.push_attempt(repository, cause);
        self
    }

    pub fn push_attempt(&mut self, repository: impl Into<String>, cause: FailureCause) {
        let attempt = RepositoryAttempt {
            repository: repository.into(),
            cause,
        };
        if !self.attempts.contains(&attempt) {
            self.attempts.push(attempt);
        }
    }

    /// Whether every repository simply did not have the artifact.
    pub fn is_not_found(&self) -> bool {
        self.attempts
            .iter()
            .all(|a| a.cause == FailureCause::NotFound)
    }
}

fn describe_attempts(attempts: &[RepositoryAttempt]) -> String {
    if attempts.is_empty() {
        return "no repository accepts this artifact".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.repository, a.cause))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The accumulated download failures of a resolution run, one entry per
/// artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Diagnostic)]
#[error("{} artifact(s) could not be downloaded", .failures.len())]
pub struct DownloadFailures {
    failures: Vec<DownloadFailure>,
}

impl DownloadFailures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a failure, merging its attempts into an existing entry for the
    /// same artifact.
    pub fn push(&mut self, failure: DownloadFailure) {
        if let Some(existing) = self
            .failures
            .iter_mut()
            .find(|f| f.artifact == failure.artifact)
        {
            for attempt in failure.attempts {
                existing.push_attempt(attempt.repository, attempt.cause);
            }
        } else {
            self.failures.push(failure);
        }
    }

    pub fn extend(&mut self, other: DownloadFailures) {
        for failure in other.failures {
            self.push(failure);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DownloadFailure> {
        self.failures.iter()
    }

    /// Flattened `(artifact, repository, cause)` triples.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &FailureCause)> {
        self.failures.iter().flat_map(|f| {
            f.attempts
                .iter()
                .map(move |a| (f.artifact.as_str(), a.repository.as_str(), &a.cause))
        })
    }

    pub fn contains_artifact(&self, artifact: &str) -> bool {
        self.failures.iter().any(|f| f.artifact == artifact)
    }
}

impl From<DownloadFailure> for DownloadFailures {
    fn from(failure: DownloadFailure) -> Self {
        let mut failures = Self::new();
        failures.push(failure);
        failures
    }
}

/// A property whose value refers back to itself.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Property cycle: {}", .chain.join(" -> "))]
pub struct PropertyCycle {
    pub chain: Vec<String>,
}

/// A version selector that none of the comparators understand.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Invalid version selector '{pattern}'")]
#[diagnostic(help(
    "Use an exact version, latest.release, latest.integration, latest.patch, 1.2.x, ^1.2.3, ~1.2.3 or '1.2 - 1.3'"
))]
pub struct VersionSelectorInvalid {
    pub pattern: String,
}

/// Reactor members that depend on each other in a cycle. The first member
/// is repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Reactor cycle: {}", .members.join(" -> "))]
#[diagnostic(help("A module cannot depend on itself through other modules of the same build"))]
pub struct ReactorCycle {
    pub members: Vec<String>,
}

/// Two BOMs imported at the same level manage one dependency at different
/// versions. The first import wins; this record exists for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousManagedVersion {
    pub dependency: String,
    pub chosen_version: String,
    pub chosen_from: String,
    pub ignored_version: String,
    pub ignored_from: String,
}

impl fmt::Display for AmbiguousManagedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} managed at {} by {} and at {} by {}; using {}",
            self.dependency,
            self.chosen_version,
            self.chosen_from,
            self.ignored_version,
            self.ignored_from,
            self.chosen_version
        )
    }
}

/// A best-effort value together with the download failures encountered
/// while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub failures: DownloadFailures,
}

impl<T> Outcome<T> {
    pub fn new(value: T, failures: DownloadFailures) -> Self {
        Self { value, failures }
    }

    pub fn complete(value: T) -> Self {
        Self::new(value, DownloadFailures::new())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome::new(f(self.value), self.failures)
    }

    /// Strict view: any failure turns the whole outcome into an error.
    pub fn into_result(self) -> Result<T, DownloadFailures> {
        if self.failures.is_empty() {
            Ok(self.value)
        } else {
            Err(self.failures)
        }
    }
}
