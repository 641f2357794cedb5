//! Command dispatch, handler modules and the helpers they share.

mod reactor;
mod resolve;
mod tree;
mod versions;

use std::path::Path;
use std::sync::Arc;

use miette::Result;

use pomgraph_core::config::ResolverConfig;
use pomgraph_core::failure::{DownloadFailures, Outcome};
use pomgraph_maven::project;
use pomgraph_resolver::merger::PomResolver;
use pomgraph_resolver::resolved::ResolvedPom;
use pomgraph_util::errors::PomgraphError;
use pomgraph_util::progress;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Resolve { path } => resolve::exec(&config, &path).await,
        Command::Tree {
            path,
            scope,
            depth,
            why,
            conflicts,
        } => {
            let opts = tree::TreeOptions {
                classpath: scope,
                depth,
                why,
                conflicts,
            };
            tree::exec(&config, &path, &opts).await
        }
        Command::Reactor { path } => reactor::exec(&config, &path).await,
        Command::Versions {
            coordinate,
            selector,
            current,
            pattern,
        } => {
            versions::exec(
                &config,
                &coordinate,
                &selector,
                current.as_deref(),
                pattern.as_deref(),
            )
            .await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
    let path = match path {
        Some(path) if !path.is_file() => {
            return Err(PomgraphError::Config {
                message: format!("{} does not exist", path.display()),
            }
            .into())
        }
        Some(path) => path.to_path_buf(),
        None => ResolverConfig::default_path(),
    };
    tracing::debug!("Loading configuration from {}", path.display());
    ResolverConfig::from_path(&path)
}

/// Read the POM at `path` (a file or a directory holding `pom.xml`) and
/// resolve it.
async fn resolve_project(
    config: &ResolverConfig,
    path: &Path,
) -> Result<(PomResolver, Outcome<Arc<ResolvedPom>>)> {
    let file = project::pom_file(path);
    let file = file.canonicalize().map_err(|e| PomgraphError::Project {
        message: format!("No POM at {}: {e}", file.display()),
    })?;
    let pom = Arc::new(project::read_pom_file(&file)?);

    let resolver = PomResolver::from_config(config)?;
    progress::status("Resolving", &pom.declared_gav().to_string());
    let sp = progress::spinner("Consulting repositories...");
    let resolved = resolver.resolve(pom).await;
    sp.finish_and_clear();
    Ok((resolver, resolved))
}

/// Print recovered download failures as warnings.
fn report_failures(failures: &DownloadFailures) {
    for failure in failures.iter() {
        progress::status_warn("Warning", &failure.to_string());
    }
}
