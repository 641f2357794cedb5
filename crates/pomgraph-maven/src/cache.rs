//! On-disk cache of downloaded POMs mirroring the repository layout.
//!
//! Only release POMs are stored: they never change once published. Metadata
//! and SNAPSHOT POMs are fetched fresh on every run.

use std::fs;
use std::path::{Path, PathBuf};

use pomgraph_util::errors::PomgraphError;

/// Cache rooted at a directory, one subdirectory per repository id:
/// `<root>/<repository-id>/<layout path>`.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path within the cache for a layout path of a repository.
    pub fn path_for(&self, repository_id: &str, layout_path: &str) -> PathBuf {
        let mut path = self.root.join(sanitize(repository_id));
        for part in layout_path.split('/').filter(|p| !p.is_empty() && *p != "..") {
            path.push(part);
        }
        path
    }

    /// Read a cached document.
    pub fn get(&self, repository_id: &str, layout_path: &str) -> Option<String> {
        let path = self.path_for(repository_id, layout_path);
        if !path.is_file() {
            return None;
        }
        fs::read_to_string(&path).ok()
    }

    /// Store a document, creating directories as needed.
    pub fn put(
        &self,
        repository_id: &str,
        layout_path: &str,
        content: &str,
    ) -> miette::Result<PathBuf> {
        let path = self.path_for(repository_id, layout_path);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(PomgraphError::Io)?;
        }
        fs::write(&path, content).map_err(PomgraphError::Io)?;
        Ok(path)
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
