//! Handler for `pomgraph tree`.

use std::path::Path;

use miette::Result;

use pomgraph_core::config::ResolverConfig;
use pomgraph_core::scope::Classpath;
use pomgraph_resolver::resolver::resolve_dependencies;

/// Options for `pomgraph tree`.
pub struct TreeOptions {
    pub classpath: Classpath,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Show the path to a specific dependency.
    pub why: Option<String>,
    /// Show version conflicts.
    pub conflicts: bool,
}

pub async fn exec(config: &ResolverConfig, path: &Path, opts: &TreeOptions) -> Result<()> {
    let (resolver, root) = super::resolve_project(config, path).await?;
    let mut failures = root.failures;
    let sp = pomgraph_util::progress::spinner("Resolving dependencies...");
    let graph = resolve_dependencies(&root.value, &resolver).await;
    sp.finish_and_clear();
    failures.extend(graph.failures);
    let graph = graph.value;

    if let Some(ref target) = opts.why {
        match graph.find_path(opts.classpath, target) {
            Some(path) => {
                println!("Path to {target}:");
                for (i, node) in path.iter().enumerate() {
                    let indent = "  ".repeat(i);
                    println!("{indent}{node}");
                }
            }
            None => println!(
                "Dependency '{target}' not found on the {} classpath.",
                opts.classpath
            ),
        }
    } else if opts.conflicts {
        print!("{}", graph.conflicts);
        if graph.conflicts.is_empty() {
            println!();
        }
    } else {
        print!("{}", graph.print_tree(opts.classpath, opts.depth));
    }

    super::report_failures(&failures);
    Ok(())
}
