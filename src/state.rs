//! Persisted pipeline state.
//!
//! Two copies exist: the deployed state in the working directory and the
//! staged state written by `build` into the build directory. They are only
//! reconciled by `deploy`, which promotes the staged file over the deployed
//! one.

use crate::error::{PipelineError, Result};
use crate::serial::{BASELINE_SERIAL, Serial};
use ring::digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of both the deployed and the staged state
pub const STATE_FILE: &str = "zones_deploy.json";

/// Commit id meaning "no prior state"
pub const NO_COMMIT: &str = "0000000000000000000000000000000000000000";

/// Serials and configuration hashes recorded for one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub commit: String,
    #[serde(default)]
    pub serials: BTreeMap<String, Serial>,
    #[serde(default)]
    pub conf_hashes: BTreeMap<String, String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::empty()
    }
}

impl PersistedState {
    /// State of a repository that was never deployed
    pub fn empty() -> Self {
        Self::new(NO_COMMIT.to_string())
    }

    pub fn new(commit: String) -> Self {
        Self {
            commit,
            serials: BTreeMap::new(),
            conf_hashes: BTreeMap::new(),
        }
    }

    /// Whether this state refers to a real commit
    pub fn has_commit(&self) -> bool {
        self.commit != NO_COMMIT
    }

    /// Reads a state file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let state: PersistedState =
            serde_json::from_str(&data).map_err(|e| PipelineError::MalformedState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        state.validate(path)?;
        debug!(
            "Loaded state {} (commit {}, {} serials, {} config hashes)",
            path.display(),
            state.commit,
            state.serials.len(),
            state.conf_hashes.len()
        );
        Ok(state)
    }

    /// Reads a state file, treating a missing file as the empty state
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("State file {} does not exist, starting empty", path.display());
                Ok(Self::empty())
            }
            Err(e) => Err(PipelineError::io(path, e)),
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let valid = self.commit.len() == 40 && self.commit.bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(PipelineError::MalformedState {
                path: path.to_path_buf(),
                reason: format!("invalid commit id {:?}", self.commit),
            });
        }
        Ok(())
    }

    /// Writes the state, replacing any previous file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        let mut data = serde_json::to_string_pretty(self).map_err(|e| {
            PipelineError::MalformedState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        data.push('\n');

        let temp_path = temp_sibling(path);
        fs::write(&temp_path, data).map_err(|e| PipelineError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| PipelineError::io(path, e))?;
        debug!("Saved state {} (commit {})", path.display(), self.commit);
        Ok(())
    }

    pub fn serial(&self, zone: &str) -> Option<Serial> {
        self.serials.get(zone).copied()
    }

    /// Recorded serial of `zone`, or the baseline for a zone never built
    pub fn serial_or_baseline(&self, zone: &str) -> Serial {
        self.serial(zone).unwrap_or(BASELINE_SERIAL)
    }

    pub fn set_serial(&mut self, zone: &str, serial: Serial) {
        self.serials.insert(zone.to_string(), serial);
    }

    /// Records the SHA-256 of a generated artifact under `key`
    pub fn record_conf_hash(&mut self, key: &str, contents: &[u8]) -> String {
        let hash = content_hash(contents);
        self.conf_hashes.insert(key.to_string(), hash.clone());
        hash
    }

    /// Whether any configuration artifact differs between the two states,
    /// including artifacts present in only one of them.
    pub fn config_differs(&self, other: &PersistedState) -> bool {
        self.conf_hashes != other.conf_hashes
    }

    /// Zones of `staged` whose serial differs from the one recorded here,
    /// in name order.
    pub fn changed_serials(&self, staged: &PersistedState) -> Vec<String> {
        staged
            .serials
            .iter()
            .filter(|(zone, serial)| self.serials.get(*zone) != Some(*serial))
            .map(|(zone, _)| zone.clone())
            .collect()
    }
}

/// Hex SHA-256 of `contents`
pub fn content_hash(contents: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, contents))
}

/// Replaces the deployed state with the staged one.
///
/// The staged file is copied next to the deployed file and renamed over it,
/// so the deployed state is either fully old or fully new. The staged file
/// itself is left in place.
pub fn promote(staged: &Path, deployed: &Path) -> Result<()> {
    let temp_path = temp_sibling(deployed);
    fs::copy(staged, &temp_path).map_err(|e| PipelineError::io(staged, e))?;
    fs::rename(&temp_path, deployed).map_err(|e| PipelineError::io(deployed, e))?;
    info!("Promoted {} to {}", staged.display(), deployed.display());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
