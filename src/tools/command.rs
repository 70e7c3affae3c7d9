use crate::error::{PipelineError, Result};
use std::path::Path;
use std::process::{Command, Output};
use tracing::trace;

/// A command line with `{zone}` and `{zone_file}` placeholders.
///
/// The template is split on whitespace before substitution, so a zone file
/// path containing spaces stays a single argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    template: String,
}

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Expands the template into a program and its arguments
    pub fn expand(&self, zone: &str, zone_file: &Path) -> Vec<String> {
        let file = zone_file.to_string_lossy();
        self.template
            .split_whitespace()
            .map(|word| word.replace("{zone_file}", &file).replace("{zone}", zone))
            .collect()
    }

    /// Runs the expanded command and captures its output
    pub fn run(&self, zone: &str, zone_file: &Path) -> Result<Output> {
        let argv = self.expand(zone, zone_file);
        let (program, args) = argv.split_first().ok_or_else(|| PipelineError::ToolSpawn {
            command: self.template.clone(),
            reason: "empty command".to_string(),
        })?;
        trace!("Running {} {}", program, args.join(" "));
        Command::new(program)
            .args(args)
            .output()
            .map_err(|e| PipelineError::ToolSpawn {
                command: program.clone(),
                reason: e.to_string(),
            })
    }
}
