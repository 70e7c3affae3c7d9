use crate::error::Result;
use crate::state::PersistedState;
use crate::vcs::{DiffFilter, EMPTY_TREE, Vcs};
use crate::zone::catalog::normalize_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Zone files that differ between two revisions.
///
/// Computed once per phase and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: BTreeSet<PathBuf>,
}

impl ChangeSet {
    /// Diffs `current` against `reference`, restricted to `pathspec`
    pub fn compute(vcs: &dyn Vcs, current: &str, reference: &str, pathspec: &str) -> Result<Self> {
        Self::diff(vcs, current, reference, None, pathspec)
    }

    /// Like [`ChangeSet::compute`], keeping only files whose change matches `filter`
    pub fn compute_filtered(
        vcs: &dyn Vcs,
        current: &str,
        reference: &str,
        filter: DiffFilter,
        pathspec: &str,
    ) -> Result<Self> {
        Self::diff(vcs, current, reference, Some(filter), pathspec)
    }

    fn diff(
        vcs: &dyn Vcs,
        current: &str,
        reference: &str,
        filter: Option<DiffFilter>,
        pathspec: &str,
    ) -> Result<Self> {
        let paths: BTreeSet<PathBuf> = vcs
            .diff_names(current, reference, filter, pathspec)?
            .iter()
            .map(|p| normalize_path(p))
            .collect();
        debug!(
            "{} changed zone files between {} and {}{}",
            paths.len(),
            current,
            reference,
            filter.map(|f| format!(" (filter {})", f)).unwrap_or_default()
        );
        Ok(Self { paths })
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            paths: paths.into_iter().map(|p| normalize_path(p.as_ref())).collect(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Revision a change set is computed against: the deployed commit, or the
/// parent of `HEAD` when nothing was deployed yet. A root commit falls back
/// to the empty tree.
pub fn reference_revision(vcs: &dyn Vcs, deployed: &PersistedState) -> Result<String> {
    if deployed.has_commit() {
        return Ok(deployed.commit.clone());
    }
    Ok(vcs
        .rev_parse("HEAD~1")?
        .unwrap_or_else(|| EMPTY_TREE.to_string()))
}
