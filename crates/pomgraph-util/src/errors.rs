use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for operations that cannot continue.
///
/// Recoverable per-artifact problems (a POM missing from one repository, a
/// property cycle) are never reported through this type; they accumulate as
/// failures next to a best-effort result instead.
#[derive(Debug, Error, Diagnostic)]
pub enum PomgraphError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A POM or metadata document is not well-formed XML.
    #[error("Malformed XML in {origin}: {message}")]
    #[diagnostic(help("Check that the document is a valid Maven POM or maven-metadata.xml"))]
    Xml { origin: String, message: String },

    /// Invalid or malformed configuration file.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.pomgraph/config.toml or the file passed with --config"))]
    Config { message: String },

    /// The project tree on disk could not be loaded.
    #[error("Project error: {message}")]
    Project { message: String },

    /// Dependency resolution failed in a way that leaves no usable result.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Network client setup or a request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PomgraphResult<T> = miette::Result<T>;
