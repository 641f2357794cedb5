//! CLI argument definitions for pomgraph.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pomgraph_core::scope::Classpath;

#[derive(Parser, Debug)]
#[command(
    name = "pomgraph",
    version,
    about = "Resolve Maven POMs: effective models, dependency graphs and reactor order",
    long_about = "pomgraph merges POMs with their parents and imported BOMs, builds \
                  nearest-wins dependency graphs per classpath and orders the modules \
                  of multi-module builds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ~/.pomgraph/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the effective model of a POM
    Resolve {
        /// Project directory or POM file
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Display the dependency tree
    Tree {
        /// Project directory or POM file
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Classpath to show: compile, runtime, provided, test-compile, test-runtime
        #[arg(short, long, default_value = "compile")]
        scope: Classpath,
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
        /// Show why a dependency is included (group:artifact or artifact)
        #[arg(long)]
        why: Option<String>,
        /// Show version conflicts
        #[arg(long)]
        conflicts: bool,
    },

    /// Show the build order of a multi-module project
    Reactor {
        /// Root project directory or POM file
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List published versions matching a selector
    Versions {
        /// Artifact coordinates (group:artifact)
        coordinate: String,
        /// Selector: exact, latest.release, latest.integration, latest.patch, 1.x, ^1.2.3, ~1.2.3, '1.2 - 1.3'
        selector: String,
        /// Version currently in use
        #[arg(long)]
        current: Option<String>,
        /// Only accept versions whose qualifier contains this text (e.g. -jre)
        #[arg(long)]
        pattern: Option<String>,
    },
}

/// Parse CLI arguments from the environment.
pub fn parse() -> Cli {
    Cli::parse()
}
