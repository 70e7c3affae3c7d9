//! Build, check and deploy phases.
//!
//! Each phase loads what it needs from disk, runs to completion and hands
//! its result to the next phase through the staged state file. Nothing is
//! kept in memory between phases.

mod build;
mod check;
mod deploy;

pub use build::{BuildReport, BuiltZone};
pub use check::{CheckFailure, CheckReport, ZoneCheck};
pub use deploy::{DeployPlan, DeployReport, plan_deploy};

use crate::config::PipelineConfig;
use crate::dns::{SerialLookup, UdpSerialLookup};
use crate::error::{PipelineError, Result};
use crate::state::PersistedState;
use crate::tools::{CommandChecker, CommandCompiler, Deployer, ScriptDeployer, SyntaxChecker, ZoneCompiler};
use crate::vcs::{GitCli, Vcs, zone_pathspec};
use crate::zone::catalog::load_name_list;
use crate::zone::constants::ZONE_SUFFIX;
use crate::zone::{ZoneCatalog, ZoneFilter};
use std::path::{Path, PathBuf};

/// External collaborators used by the phases
pub struct Tools {
    pub vcs: Box<dyn Vcs>,
    pub checker: Box<dyn SyntaxChecker>,
    pub compiler: Box<dyn ZoneCompiler>,
    pub lookup: Box<dyn SerialLookup>,
    pub deployer: Option<Box<dyn Deployer>>,
}

impl Tools {
    /// Collaborators backed by git, the configured commands and UDP
    pub fn system(config: &PipelineConfig) -> Self {
        Self {
            vcs: Box::new(GitCli::new(&config.workdir)),
            checker: Box::new(CommandChecker::new(config.check_template())),
            compiler: Box::new(CommandCompiler::new(config.compile_template())),
            lookup: Box::new(UdpSerialLookup::new(config.query_timeout)),
            deployer: config
                .deploy_command
                .as_ref()
                .map(|script| Box::new(ScriptDeployer::new(script)) as Box<dyn Deployer>),
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    tools: Tools,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, tools: Tools) -> Self {
        Self { config, tools }
    }

    fn zone_filter(&self) -> Result<ZoneFilter> {
        let load = |path: &Option<PathBuf>| -> Result<_> {
            let path = path.as_ref().map(|p| self.config.resolve(p));
            load_name_list(path.as_deref())
                .map_err(|e| PipelineError::io(path.as_deref().unwrap_or(Path::new("")), e))
        };
        Ok(ZoneFilter::new(
            load(&self.config.zone_allowlist)?,
            load(&self.config.zone_denylist)?,
        ))
    }

    fn catalog(&self) -> Result<ZoneCatalog> {
        let filter = self.zone_filter()?;
        Ok(ZoneCatalog::enumerate(
            &self.config.workdir,
            &self.config.zones_relative()?,
            self.config.allow_fancy_names,
            &filter,
        )?)
    }

    fn pathspec(&self) -> Result<String> {
        Ok(zone_pathspec(&self.config.zones_relative()?, ZONE_SUFFIX))
    }

    fn load_deployed(&self) -> Result<PersistedState> {
        PersistedState::load_or_empty(&self.config.deployed_state_path())
    }

    fn load_staged(&self) -> Result<PersistedState> {
        let path = self.config.staged_state_path();
        if !path.exists() {
            return Err(PipelineError::MissingStagedState(path));
        }
        PersistedState::load(&path)
    }

    /// Path of a built file, relative to the working directory
    fn built_path(&self, file_name: &str) -> PathBuf {
        crate::zone::catalog::normalize_path(&self.config.build_subdir.join(file_name))
    }
}
