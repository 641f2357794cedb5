//! Handler for `pomgraph reactor`.

use std::path::Path;

use miette::Result;

use pomgraph_core::config::ResolverConfig;
use pomgraph_resolver::merger::PomResolver;
use pomgraph_resolver::reactor::load_reactor;
use pomgraph_util::progress;

pub async fn exec(config: &ResolverConfig, path: &Path) -> Result<()> {
    let resolver = PomResolver::from_config(config)?;
    let sp = progress::spinner("Resolving modules...");
    let reactor = load_reactor(path, &resolver).await;
    sp.finish_and_clear();
    let reactor = reactor?;

    println!("Reactor build order:");
    for (i, node) in reactor.value.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, node.gav(), node.project.packaging);
    }

    super::report_failures(&reactor.failures);
    Ok(())
}
