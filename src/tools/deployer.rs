use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Pushes built zones and configuration to the name server
pub trait Deployer {
    /// An empty `reload` list asks for a full reconfiguration.
    fn deploy(&self, zones_dir: &Path, build_dir: &Path, server: &str, reload: &[String])
    -> Result<()>;
}

/// [`Deployer`] running an external script as
/// `script ZONES_DIR BUILD_DIR SERVER [ZONE...]`
#[derive(Debug, Clone)]
pub struct ScriptDeployer {
    script: PathBuf,
}

impl ScriptDeployer {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    // build_command builds the command line for logging purposes.
    fn build_command(&self, args: &[String]) -> String {
        format!("{} {}", self.script.display(), args.join(" "))
    }
}

impl Deployer for ScriptDeployer {
    fn deploy(
        &self,
        zones_dir: &Path,
        build_dir: &Path,
        server: &str,
        reload: &[String],
    ) -> Result<()> {
        let mut args = vec![
            zones_dir.display().to_string(),
            build_dir.display().to_string(),
            server.to_string(),
        ];
        args.extend(reload.iter().cloned());
        info!("Calling {}", self.build_command(&args));

        let status = Command::new(&self.script)
            .args(&args)
            .status()
            .map_err(|e| PipelineError::ToolSpawn {
                command: self.script.display().to_string(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(PipelineError::DeployFailed(format!(
                "{} exited with {}",
                self.script.display(),
                status
            )));
        }
        Ok(())
    }
}
