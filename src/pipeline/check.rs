use super::Pipeline;
use crate::changeset::{ChangeSet, reference_revision};
use crate::error::Result;
use crate::serial::{Serial, is_increased};
use crate::state::PersistedState;
use crate::tools::missing_trailing_dots;
use crate::zone::constants::ZONE_SUFFIX;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Reason a zone failed `check`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// Zone has no staged serial or no built file
    NotBuilt,
    Syntax(String),
    Compile(String),
    /// Serial embedded in the built file differs from the staged one
    SerialMismatch { staged: Serial, built: Serial },
    /// Built serial does not advance past the one currently served
    NotIncreased { live: Serial, built: Serial },
    MissingDot(Vec<String>),
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::NotBuilt => write!(f, "zone was not built, run build first"),
            CheckFailure::Syntax(diag) => write!(f, "syntax check failed:\n{}", diag),
            CheckFailure::Compile(diag) => write!(f, "zone does not load:\n{}", diag),
            CheckFailure::SerialMismatch { staged, built } => write!(
                f,
                "built serial {} does not match staged serial {}",
                built, staged
            ),
            CheckFailure::NotIncreased { live, built } => write!(
                f,
                "serial {} is not increased over live serial {}",
                built, live
            ),
            CheckFailure::MissingDot(lines) => {
                write!(f, "possibly missing trailing dot:\n{}", lines.join("\n"))
            }
        }
    }
}

/// Result of checking one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCheck {
    pub zone: String,
    pub built_file: PathBuf,
    /// Serial reported by the compiler
    pub serial: Option<Serial>,
    /// Serial currently served, when it was queried successfully
    pub live_serial: Option<Serial>,
    pub failures: Vec<CheckFailure>,
}

impl ZoneCheck {
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub zones: Vec<ZoneCheck>,
}

impl CheckReport {
    /// True only if every zone passed
    pub fn ok(&self) -> bool {
        self.zones.iter().all(ZoneCheck::ok)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ZoneCheck> {
        self.zones.iter().filter(|z| !z.ok())
    }
}

/// A zone to check and whether its live serial should be compared
struct Target {
    zone: String,
    file_name: String,
    compare_live: bool,
}

impl Pipeline {
    /// Validates the built zones without modifying any state.
    ///
    /// Every zone is checked even after failures; the report carries all of
    /// them.
    pub fn check(&self) -> Result<CheckReport> {
        let config = &self.config;
        info!("Checking built zones in {}", config.build_dir().display());

        let staged = self.load_staged()?;
        let deployed = self.load_deployed()?;
        let catalog = self.catalog()?;

        let changes = match &config.server {
            Some(_) => {
                let vcs = self.tools.vcs.as_ref();
                let reference = reference_revision(vcs, &deployed)?;
                ChangeSet::compute(vcs, &staged.commit, &reference, &self.pathspec()?)?
            }
            None => ChangeSet::default(),
        };

        let mut targets: Vec<Target> = catalog
            .iter()
            .map(|source| Target {
                zone: source.name.clone(),
                file_name: source.file_name().to_string(),
                compare_live: config.all_zones || changes.contains(&source.path),
            })
            .collect();
        // Synthesized catalog zones: staged, no source file, hash recorded by build
        for (name, serial) in &staged.serials {
            let file_name = format!("{}{}", name, ZONE_SUFFIX);
            let key = self.built_path(&file_name).display().to_string();
            if catalog.get(name).is_none() && staged.conf_hashes.contains_key(&key) {
                targets.push(Target {
                    zone: name.clone(),
                    file_name,
                    compare_live: deployed.serial(name) != Some(*serial),
                });
            }
        }

        let mut report = CheckReport::default();
        for target in &targets {
            let result = self.check_zone(&staged, target)?;
            for failure in &result.failures {
                error!("{}: {}", result.built_file.display(), failure);
            }
            report.zones.push(result);
        }

        if report.ok() {
            info!("All {} zones passed", report.zones.len());
        } else {
            error!(
                "{} of {} zones failed",
                report.failed().count(),
                report.zones.len()
            );
        }
        Ok(report)
    }

    /// Runs the checks for one zone. A tool that exits unsuccessfully is a
    /// failure of that zone; a tool that cannot be started at all is a
    /// configuration problem and aborts the whole check.
    fn check_zone(&self, staged: &PersistedState, target: &Target) -> Result<ZoneCheck> {
        let built_file = self.config.build_dir().join(&target.file_name);
        let mut result = ZoneCheck {
            zone: target.zone.clone(),
            built_file: built_file.clone(),
            serial: None,
            live_serial: None,
            failures: Vec::new(),
        };

        let Some(staged_serial) = staged.serial(&target.zone) else {
            result.failures.push(CheckFailure::NotBuilt);
            return Ok(result);
        };
        if !built_file.is_file() {
            result.failures.push(CheckFailure::NotBuilt);
            return Ok(result);
        }
        debug!("Checking {} ({})", target.zone, built_file.display());

        let syntax = self.tools.checker.check(&target.zone, &built_file)?;
        if !syntax.success {
            result.failures.push(CheckFailure::Syntax(syntax.diagnostics));
        }

        let compiled = self.tools.compiler.compile(&target.zone, &built_file)?;
        let built_serial = match compiled.serial {
            Some(serial) if compiled.success => serial,
            _ => {
                result.failures.push(CheckFailure::Compile(compiled.diagnostics));
                return Ok(result);
            }
        };
        result.serial = Some(built_serial);
        if let Some(hash) = &compiled.zone_hash {
            debug!("Zone {} compiled hash {}", target.zone, hash);
        }

        if built_serial != staged_serial {
            result.failures.push(CheckFailure::SerialMismatch {
                staged: staged_serial,
                built: built_serial,
            });
        }

        if self.config.missing_dot_check {
            let lines = missing_trailing_dots(&target.zone, &compiled.compiled);
            if !lines.is_empty() {
                result.failures.push(CheckFailure::MissingDot(lines));
            }
        }

        if let (true, Some(server)) = (target.compare_live, &self.config.server) {
            result.live_serial = self.live_serial(&target.zone, server);
            if let Some(live) = result.live_serial {
                if !is_increased(live, built_serial) {
                    result.failures.push(CheckFailure::NotIncreased {
                        live,
                        built: built_serial,
                    });
                }
            }
        }

        Ok(result)
    }

    /// Serial currently served for `zone`, or `None` if it cannot be obtained
    fn live_serial(&self, zone: &str, server: &str) -> Option<Serial> {
        match self.tools.lookup.soa_serial(zone, server) {
            Ok(serial) => {
                debug!("Zone {} live serial {}", zone, serial);
                Some(serial)
            }
            Err(e) => {
                warn!(
                    "Cannot get serial of {} from {}, skipping live comparison: {}",
                    zone, server, e
                );
                None
            }
        }
    }
}
