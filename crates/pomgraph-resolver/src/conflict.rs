//! Version conflict reporting.

use std::fmt;

/// Every version conflict met while building a dependency graph.
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// One artifact requested at a version other than the one resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub group: String,
    pub artifact: String,
    pub requested: String,
    pub resolved: String,
    /// `managed by root`, `nearest wins (depth d1 vs d2)` or
    /// `first declaration wins at depth d`.
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a conflict once, however many classpaths meet it.
    pub fn add(&mut self, conflict: VersionConflict) {
        if !self.conflicts.contains(&conflict) {
            self.conflicts.push(conflict);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Conflicts for one `groupId:artifactId`.
    pub fn for_artifact<'a>(
        &'a self,
        group: &'a str,
        artifact: &'a str,
    ) -> impl Iterator<Item = &'a VersionConflict> {
        self.conflicts
            .iter()
            .filter(move |c| c.group == group && c.artifact == artifact)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(
                f,
                "  {}:{} requested {} but resolved {} ({})",
                c.group, c.artifact, c.requested, c.resolved, c.reason
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} -> {} ({})",
            self.group, self.artifact, self.requested, self.resolved, self.reason
        )
    }
}
