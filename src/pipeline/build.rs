use super::Pipeline;
use crate::changeset::{ChangeSet, reference_revision};
use crate::error::{PipelineError, Result};
use crate::nsconf::{ConfTemplate, ConfZone};
use crate::serial::{Serial, next_serial};
use crate::state::{PersistedState, content_hash};
use crate::zone::constants::ZONE_SUFFIX;
use crate::zone::{ZoneSource, catzone, substitute_serial};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A zone file written to the build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltZone {
    pub name: String,
    /// Built file, relative to the working directory
    pub path: PathBuf,
    pub serial: Serial,
    /// A new serial was assigned in this build
    pub bumped: bool,
    /// The serial placeholder was found and replaced
    pub substituted: bool,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub commit: String,
    pub reference: String,
    pub zones: Vec<BuiltZone>,
    pub catalog_zone: Option<BuiltZone>,
    /// Rendered name server configuration, relative to the working directory
    pub conf_path: PathBuf,
}

impl Pipeline {
    /// Builds every zone into the build directory and writes the staged state.
    ///
    /// Serials start from the deployed state; the deployed state file is
    /// never written here.
    pub fn build(&self) -> Result<BuildReport> {
        let config = &self.config;
        info!("Building zones from {}", config.zones_dir().display());

        let deployed = self.load_deployed()?;
        let catalog = self.catalog()?;

        let vcs = self.tools.vcs.as_ref();
        let commit = vcs
            .rev_parse("HEAD")?
            .ok_or_else(|| PipelineError::Vcs("repository has no HEAD commit".to_string()))?;
        let reference = reference_revision(vcs, &deployed)?;
        let changes = ChangeSet::compute(vcs, &commit, &reference, &self.pathspec()?)?;

        let build_dir = config.build_dir();
        fs::create_dir_all(&build_dir).map_err(|e| PipelineError::io(&build_dir, e))?;

        let mut staged = PersistedState::new(commit.clone());
        let mut zones = Vec::with_capacity(catalog.len());

        for source in catalog.iter() {
            let bump = config.all_zones
                || changes.contains(&source.path)
                || deployed.serial(&source.name).is_none();
            let serial = assign_serial(&deployed, &source.name, bump);
            staged.set_serial(&source.name, serial);

            let source_path = config.workdir.join(&source.path);
            let contents =
                fs::read_to_string(&source_path).map_err(|e| PipelineError::io(&source_path, e))?;
            zones.push(self.write_zone(source, &contents, serial, bump)?);
        }

        let catalog_zone = match &config.catalog_zone {
            Some(name) if catalog.get(name).is_some() => {
                warn!(
                    "Catalog zone {} is also a managed zone file, not generating it",
                    name
                );
                None
            }
            Some(name) => {
                let text = catzone::render(name, catalog.names());
                let path = self.built_path(&format!("{}{}", name, ZONE_SUFFIX));
                let key = path.display().to_string();
                let hash = content_hash(text.as_bytes());
                let bump = deployed.conf_hashes.get(&key) != Some(&hash)
                    || deployed.serial(name).is_none();
                let serial = assign_serial(&deployed, name, bump);
                staged.set_serial(name, serial);
                staged.conf_hashes.insert(key, hash);

                let source = ZoneSource {
                    name: name.clone(),
                    path,
                };
                Some(self.write_zone(&source, &text, serial, bump)?)
            }
            None => None,
        };

        let template = match &config.conf_template {
            Some(path) => {
                let path = config.resolve(path);
                let json = fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
                ConfTemplate::parse(&json)?
            }
            None => ConfTemplate::builtin(),
        };
        let conf_zones: Vec<ConfZone> = zones
            .iter()
            .chain(catalog_zone.iter())
            .map(|z| ConfZone {
                name: z.name.clone(),
                path: z.path.clone(),
            })
            .collect();
        let conf_text = template.render(&conf_zones)?;
        let conf_path = self.built_path(&config.conf_output);
        let conf_full = config.workdir.join(&conf_path);
        info!("Generating configuration {}", conf_path.display());
        fs::write(&conf_full, &conf_text).map_err(|e| PipelineError::io(&conf_full, e))?;
        staged.record_conf_hash(&conf_path.display().to_string(), conf_text.as_bytes());

        staged.save(&config.staged_state_path())?;
        info!(
            "Built {} zones at {} ({} changed since {})",
            staged.serials.len(),
            commit,
            changes.len(),
            reference
        );

        Ok(BuildReport {
            commit,
            reference,
            zones,
            catalog_zone,
            conf_path,
        })
    }

    fn write_zone(
        &self,
        source: &ZoneSource,
        contents: &str,
        serial: Serial,
        bumped: bool,
    ) -> Result<BuiltZone> {
        let path = self.built_path(source.file_name());
        let rendered = substitute_serial(contents, serial);
        if !rendered.substituted {
            warn!(
                "No serial placeholder found in {}, copying it unchanged",
                source.path.display()
            );
        }

        let full_path = self.config.workdir.join(&path);
        debug!("Generating zone {} with serial {}", full_path.display(), serial);
        fs::write(&full_path, &rendered.text).map_err(|e| PipelineError::io(&full_path, e))?;

        Ok(BuiltZone {
            name: source.name.clone(),
            path,
            serial,
            bumped,
            substituted: rendered.substituted,
        })
    }
}

fn assign_serial(deployed: &PersistedState, zone: &str, bump: bool) -> Serial {
    let current = deployed.serial_or_baseline(zone);
    if !bump {
        return current;
    }
    let serial = next_serial(current);
    info!("Zone {} serial {} -> {}", zone, current, serial);
    serial
}
