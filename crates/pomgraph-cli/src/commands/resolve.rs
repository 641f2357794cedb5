//! Handler for `pomgraph resolve`.

use std::path::Path;

use miette::Result;

use pomgraph_core::config::ResolverConfig;

pub async fn exec(config: &ResolverConfig, path: &Path) -> Result<()> {
    let (_, resolved) = super::resolve_project(config, path).await?;
    let pom = &resolved.value;

    println!("{} ({})", pom.gav, pom.packaging);
    if let Some(parent) = pom.parent() {
        let chain: Vec<String> = parent.lineage().map(|p| p.gav.to_string()).collect();
        println!("Parents: {}", chain.join(" -> "));
    }

    let profiles = pom.active_profiles();
    if !profiles.is_empty() {
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        println!("Active profiles: {}", ids.join(", "));
    }

    println!();
    println!("Properties:");
    if pom.properties.is_empty() {
        println!("  (none)");
    }
    for (name, value) in &pom.properties {
        println!("  {name} = {value}");
    }

    println!();
    println!("Managed dependencies:");
    if pom.dependency_management.is_empty() {
        println!("  (none)");
    }
    for managed in &pom.dependency_management {
        println!("  {managed}");
    }

    println!();
    println!("Repositories:");
    for repo in &pom.repositories {
        println!("  {} {}", repo.id, repo.url);
    }

    for cycle in pom.all_property_cycles() {
        pomgraph_util::progress::status_warn("Warning", &cycle.to_string());
    }
    for ambiguous in &pom.ambiguous_versions {
        pomgraph_util::progress::status_warn("Warning", &ambiguous.to_string());
    }
    super::report_failures(&resolved.failures);
    Ok(())
}
