//! Handler for `pomgraph versions`.

use miette::Result;

use pomgraph_core::config::ResolverConfig;
use pomgraph_core::gav::GroupArtifact;
use pomgraph_resolver::comparator::parse_selector;
use pomgraph_resolver::merger::PomResolver;
use pomgraph_resolver::version::MavenVersion;
use pomgraph_util::errors::PomgraphError;

pub async fn exec(
    config: &ResolverConfig,
    coordinate: &str,
    selector: &str,
    current: Option<&str>,
    pattern: Option<&str>,
) -> Result<()> {
    let ga = GroupArtifact::parse(coordinate).ok_or_else(|| PomgraphError::Generic {
        message: format!("Expected group:artifact, got '{coordinate}'"),
    })?;
    let comparator = parse_selector(selector, pattern)?;

    let resolver = PomResolver::from_config(config)?;
    let metadata = match resolver
        .downloader()
        .download_metadata(&ga, resolver.default_repositories())
        .await
    {
        Ok(metadata) => metadata,
        Err(failure) => {
            pomgraph_util::progress::status_warn("Warning", &failure.to_string());
            return Ok(());
        }
    };

    let mut valid: Vec<&String> = metadata
        .versions
        .iter()
        .filter(|v| comparator.is_valid(current, v))
        .collect();
    valid.sort_by_key(|v| MavenVersion::parse(v));

    if valid.is_empty() {
        println!("No published version of {ga} matches '{selector}'.");
    } else {
        println!("Versions of {ga} matching '{selector}':");
        for version in &valid {
            println!("  {version}");
        }
    }

    match comparator.upgrade(current, &metadata.versions) {
        Some(upgrade) => println!("Upgrade: {upgrade}"),
        None => println!("Upgrade: none"),
    }
    Ok(())
}
