use crate::error::{PipelineError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::trace;

/// Object id of git's empty tree, used as the parent of a root commit
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Status letters accepted by `git diff --diff-filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    Unmerged,
}

impl FileStatus {
    pub fn letter(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Copied => 'C',
            Self::Deleted => 'D',
            Self::Modified => 'M',
            Self::Renamed => 'R',
            Self::Unmerged => 'U',
        }
    }
}

/// A set of file statuses to restrict a diff to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffFilter(pub &'static [FileStatus]);

impl DiffFilter {
    /// Changes to the zone list that require a configuration reload
    pub const RECONFIGURE: DiffFilter = DiffFilter(&[
        FileStatus::Added,
        FileStatus::Copied,
        FileStatus::Deleted,
        FileStatus::Renamed,
        FileStatus::Unmerged,
    ]);

    /// Changes that only require reloading the zone itself
    pub const RELOAD: DiffFilter = DiffFilter(&[FileStatus::Modified]);
}

impl fmt::Display for DiffFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for status in self.0 {
            write!(f, "{}", status.letter())?;
        }
        Ok(())
    }
}

/// Version control operations the pipeline depends on
pub trait Vcs {
    /// Paths matching `pathspec` that differ between `from` and `to`, with
    /// rename detection off.
    fn diff_names(
        &self,
        from: &str,
        to: &str,
        filter: Option<DiffFilter>,
        pathspec: &str,
    ) -> Result<Vec<PathBuf>>;

    /// Resolves `rev` to a commit id, or `None` if it does not exist
    fn rev_parse(&self, rev: &str) -> Result<Option<String>>;
}

/// [`Vcs`] backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.workdir);
        cmd
    }
}

impl Vcs for GitCli {
    fn diff_names(
        &self,
        from: &str,
        to: &str,
        filter: Option<DiffFilter>,
        pathspec: &str,
    ) -> Result<Vec<PathBuf>> {
        let mut cmd = self.git();
        cmd.args(["diff", "-z", "--name-only", "--no-renames", "--relative"]);
        if let Some(filter) = filter {
            cmd.arg(format!("--diff-filter={}", filter));
        }
        cmd.args([from, to, "--", pathspec]);
        trace!("Running {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| PipelineError::Vcs(format!("cannot run git: {}", e)))?;
        if !output.status.success() {
            return Err(PipelineError::Vcs(format!(
                "git diff {} {} failed: {}",
                from,
                to,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(parse_nul_separated(&output.stdout))
    }

    fn rev_parse(&self, rev: &str) -> Result<Option<String>> {
        let output = self
            .git()
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", rev))
            .output()
            .map_err(|e| PipelineError::Vcs(format!("cannot run git: {}", e)))?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(id))
    }
}

/// Splits `git -z` output into paths
pub fn parse_nul_separated(stdout: &[u8]) -> Vec<PathBuf> {
    String::from_utf8_lossy(stdout)
        .split('\0')
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Path filter matching zone files directly inside `zones_dir`
pub fn zone_pathspec(zones_dir: &Path, suffix: &str) -> String {
    let dir = crate::zone::catalog::normalize_path(zones_dir);
    if dir.as_os_str().is_empty() {
        format!(":(glob)*{}", suffix)
    } else {
        format!(":(glob){}/*{}", dir.display(), suffix)
    }
}
