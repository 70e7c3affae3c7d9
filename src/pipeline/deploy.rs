use super::Pipeline;
use crate::changeset::ChangeSet;
use crate::error::{ConfigError, Result};
use crate::state::{PersistedState, promote};
use crate::vcs::DiffFilter;
use tracing::{info, warn};

/// What has to be pushed to the name server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployPlan {
    /// The whole configuration must be reloaded
    pub reconfigure: bool,
    /// Zones to reload individually; empty when `reconfigure` is set
    pub reload: Vec<String>,
}

impl DeployPlan {
    pub fn is_empty(&self) -> bool {
        !self.reconfigure && self.reload.is_empty()
    }

    fn escalate(&mut self) {
        self.reconfigure = true;
        self.reload.clear();
    }
}

/// Decides what to push from the deployed and staged states alone.
///
/// Any configuration hash difference means a full reconfigure, which
/// supersedes per-zone reloads. Otherwise the zones whose serial moved are
/// reloaded.
pub fn plan_deploy(deployed: &PersistedState, staged: &PersistedState) -> DeployPlan {
    if deployed.config_differs(staged) {
        return DeployPlan {
            reconfigure: true,
            reload: Vec::new(),
        };
    }
    DeployPlan {
        reconfigure: false,
        reload: deployed.changed_serials(staged),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub plan: DeployPlan,
    /// The deploy collaborator was invoked
    pub executed: bool,
    /// The staged state replaced the deployed state
    pub promoted: bool,
}

impl Pipeline {
    /// Pushes the staged build and promotes the staged state.
    ///
    /// The deployed state only changes after the deploy collaborator
    /// succeeded. With `dry_run` the plan is computed and logged only.
    pub fn deploy(&self, dry_run: bool) -> Result<DeployReport> {
        let config = &self.config;
        let server = config
            .server
            .as_deref()
            .ok_or(ConfigError::MissingOption("server"))?;

        let staged = self.load_staged()?;
        let deployed = self.load_deployed()?;
        let mut plan = plan_deploy(&deployed, &staged);

        if deployed.has_commit() && deployed.commit != staged.commit {
            self.cross_check(&deployed, &staged, &mut plan)?;
        }

        if plan.reconfigure {
            info!("Configuration changed, full reconfiguration of {}", server);
        } else if plan.reload.is_empty() {
            info!("Nothing to deploy to {}", server);
        } else {
            info!("Zones to reload on {}: {}", server, plan.reload.join(" "));
        }

        if dry_run {
            info!("Dry run, not deploying");
            return Ok(DeployReport {
                plan,
                executed: false,
                promoted: false,
            });
        }

        let executed = !plan.is_empty();
        if executed {
            let deployer = self
                .tools
                .deployer
                .as_deref()
                .ok_or(ConfigError::MissingOption("deploy_command"))?;
            deployer.deploy(&config.zones_dir(), &config.build_dir(), server, &plan.reload)?;
        }

        promote(&config.staged_state_path(), &config.deployed_state_path())?;
        info!("Deployed commit {}", staged.commit);

        Ok(DeployReport {
            plan,
            executed,
            promoted: true,
        })
    }

    /// Compares the file lists of the two commits: added, removed or renamed
    /// zone files change the zone list, and modified files are expected to
    /// be reloaded.
    fn cross_check(
        &self,
        deployed: &PersistedState,
        staged: &PersistedState,
        plan: &mut DeployPlan,
    ) -> Result<()> {
        if plan.reconfigure {
            return Ok(());
        }
        let vcs = self.tools.vcs.as_ref();
        let pathspec = self.pathspec()?;

        let structural = ChangeSet::compute_filtered(
            vcs,
            &deployed.commit,
            &staged.commit,
            DiffFilter::RECONFIGURE,
            &pathspec,
        )?;
        if !structural.is_empty() {
            info!(
                "{} zone files added, removed or renamed, reconfiguring",
                structural.len()
            );
            plan.escalate();
            return Ok(());
        }

        let modified = ChangeSet::compute_filtered(
            vcs,
            &deployed.commit,
            &staged.commit,
            DiffFilter::RELOAD,
            &pathspec,
        )?;
        if modified.is_empty() {
            return Ok(());
        }
        let catalog = self.catalog()?;
        for source in catalog.iter().filter(|s| modified.contains(&s.path)) {
            if !plan.reload.contains(&source.name) {
                warn!(
                    "{} was modified but zone {} is not reloaded, was the build skipped?",
                    source.path.display(),
                    source.name
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::Serial;

    fn state(serials: &[(&str, u32)], conf_hash: &str) -> PersistedState {
        let mut state = PersistedState::new("1111111111111111111111111111111111111111".to_string());
        for (zone, serial) in serials {
            state.set_serial(zone, Serial(*serial));
        }
        state
            .conf_hashes
            .insert("build/zones.conf".to_string(), conf_hash.to_string());
        state
    }

    #[test]
    fn test_plan_reloads_changed_serials() {
        let deployed = state(&[("a", 5), ("b", 7)], "aa");
        let staged = state(&[("a", 5), ("b", 8)], "aa");
        let plan = plan_deploy(&deployed, &staged);
        assert!(!plan.reconfigure);
        assert_eq!(plan.reload, vec!["b"]);
    }

    #[test]
    fn test_plan_config_change_supersedes_reloads() {
        let deployed = state(&[("a", 5), ("b", 7)], "aa");
        let staged = state(&[("a", 6), ("b", 8)], "bb");
        let plan = plan_deploy(&deployed, &staged);
        assert!(plan.reconfigure);
        assert!(plan.reload.is_empty());
    }

    #[test]
    fn test_plan_nothing_changed() {
        let deployed = state(&[("a", 5)], "aa");
        let plan = plan_deploy(&deployed, &deployed.clone());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_first_deploy_reconfigures() {
        let staged = state(&[("a", 5)], "aa");
        let plan = plan_deploy(&PersistedState::empty(), &staged);
        assert!(plan.reconfigure);
    }
}
