//! Loading a multi-module project from disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pomgraph_core::pom::Pom;
use pomgraph_util::errors::PomgraphError;

use crate::xml;

/// The POM file for a path: the path itself if it is a file, otherwise
/// `pom.xml` inside it.
pub fn pom_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join("pom.xml")
    } else {
        path.to_path_buf()
    }
}

/// Read and parse a POM file, recording where it came from.
pub fn read_pom_file(path: &Path) -> miette::Result<Pom> {
    let content = std::fs::read_to_string(path).map_err(|e| PomgraphError::Project {
        message: format!("Failed to read {}: {e}", path.display()),
    })?;
    let mut pom = xml::parse_pom(&content, &path.display().to_string())?;
    pom.source_path = Some(path.to_path_buf());
    Ok(pom)
}

/// Load a project and, recursively, every module it lists.
///
/// `modules_of` decides which module paths a POM contributes, so callers
/// can include modules of active profiles. The root comes first, followed
/// by modules depth-first in declaration order; a POM reachable twice is
/// loaded once.
pub fn load_tree(
    root: &Path,
    modules_of: impl Fn(&Pom) -> Vec<String>,
) -> miette::Result<Vec<Pom>> {
    let mut loaded = Vec::new();
    let mut seen = HashSet::new();
    load_recursive(&pom_file(root), &modules_of, &mut seen, &mut loaded)?;
    Ok(loaded)
}

fn load_recursive(
    file: &Path,
    modules_of: &impl Fn(&Pom) -> Vec<String>,
    seen: &mut HashSet<PathBuf>,
    loaded: &mut Vec<Pom>,
) -> miette::Result<()> {
    let canonical = file.canonicalize().map_err(|e| PomgraphError::Project {
        message: format!("Module POM {} is not readable: {e}", file.display()),
    })?;
    if !seen.insert(canonical.clone()) {
        return Ok(());
    }

    let pom = read_pom_file(&canonical)?;
    let base_dir = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let modules = modules_of(&pom);
    tracing::debug!(
        "Loaded {} with {} module(s)",
        canonical.display(),
        modules.len()
    );
    loaded.push(pom);

    for module in modules {
        load_recursive(&pom_file(&base_dir.join(&module)), modules_of, seen, loaded)?;
    }
    Ok(())
}
