use super::origin::zone_name;
use super::{Result, ZoneError, constants};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// A zone source file discovered in the zones directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSource {
    /// Canonical zone name (lower-case, no trailing dot)
    pub name: String,
    /// Source file path, relative to the working directory
    pub path: PathBuf,
}

impl ZoneSource {
    /// File name of the zone source, reused for the built file
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Zone names allowed or denied for this repository.
///
/// Entries may be wildcards (`*.example.com`, `*`); a zone matches an entry
/// when any of its [`wildcards`] is listed.
#[derive(Debug, Clone, Default)]
pub struct ZoneFilter {
    allow: HashSet<String>,
    deny: HashSet<String>,
}

impl ZoneFilter {
    pub fn new(allow: HashSet<String>, deny: HashSet<String>) -> Self {
        Self { allow, deny }
    }

    /// Returns why `name` is rejected, or `None` if it is permitted
    pub fn rejection(&self, name: &str) -> Option<&'static str> {
        if !self.allow.is_empty() && !wildcards(name).any(|w| self.allow.contains(&w)) {
            return Some("not allowed");
        }
        if wildcards(name).any(|w| self.deny.contains(&w)) {
            return Some("denied");
        }
        None
    }
}

/// Reads a name list file: one entry per line, `#` comments and blank lines
/// skipped. A missing path yields an empty list.
pub fn load_name_list(path: Option<&Path>) -> io::Result<HashSet<String>> {
    let Some(path) = path else {
        return Ok(HashSet::new());
    };
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Yields `name`, then `name` with leading labels progressively replaced by
/// a single `*`, ending with `*` alone.
///
/// `a.b.c` yields `a.b.c`, `*.b.c`, `*.c`, `*`.
pub fn wildcards(name: &str) -> impl Iterator<Item = String> + '_ {
    let labels: Vec<&str> = name.split('.').collect();
    let count = labels.len();
    std::iter::once(name.to_string()).chain((0..count).map(move |i| {
        let rest = &labels[i + 1..];
        if rest.is_empty() {
            "*".to_string()
        } else {
            format!("*.{}", rest.join("."))
        }
    }))
}

/// Drops `.` components so paths compare equal regardless of spelling
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// The set of zones managed from one zones directory, in sorted file order
#[derive(Debug, Clone, Default)]
pub struct ZoneCatalog {
    zones: Vec<ZoneSource>,
    by_name: HashMap<String, usize>,
}

impl ZoneCatalog {
    /// Scans `zones_dir` for zone files and derives their canonical names.
    ///
    /// `workdir` is the directory paths are reported relative to. Duplicate
    /// names keep the first file in sorted order. A name/origin mismatch is
    /// fatal unless `allow_divergence` is set.
    pub fn enumerate(
        workdir: &Path,
        zones_dir: &Path,
        allow_divergence: bool,
        filter: &ZoneFilter,
    ) -> Result<Self> {
        let full_dir = workdir.join(zones_dir);
        info!("Listing zones in {}", full_dir.display());

        let entries = fs::read_dir(&full_dir).map_err(|e| ZoneError::Unreadable {
            path: full_dir.clone(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ZoneError::Unreadable {
                path: full_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            let is_zone = path
                .extension()
                .is_some_and(|ext| ext == constants::ZONE_EXTENSION);
            if is_zone && path.is_file() {
                if let Some(file_name) = path.file_name() {
                    files.push(normalize_path(&zones_dir.join(file_name)));
                }
            }
        }
        files.sort();

        let mut catalog = ZoneCatalog::default();
        for rel_path in files {
            let full_path = workdir.join(&rel_path);
            let contents = fs::read_to_string(&full_path).map_err(|e| ZoneError::Unreadable {
                path: rel_path.clone(),
                source: e,
            })?;
            let name = zone_name(&rel_path, &contents, allow_divergence)?;

            if let Some(reason) = filter.rejection(&name) {
                warn!("Ignoring zone {} - {} for this repository", name, reason);
                continue;
            }
            if let Some(existing) = catalog.get(&name) {
                warn!(
                    "Duplicate zone file found for zone {}. Using file {}, ignoring {}",
                    name,
                    existing.path.display(),
                    rel_path.display()
                );
                continue;
            }

            debug!("Found zone {} in {}", name, rel_path.display());
            catalog.by_name.insert(name.clone(), catalog.zones.len());
            catalog.zones.push(ZoneSource {
                name,
                path: rel_path,
            });
        }

        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&ZoneSource> {
        self.by_name.get(name).map(|&i| &self.zones[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneSource> {
        self.zones.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|z| z.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
