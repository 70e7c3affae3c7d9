use crate::error::ConfigError;
use crate::state::STATE_FILE;
use crate::tools::CommandTemplate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the optional configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "zonedeploy.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Working directory: repository checkout holding the deployed state
    pub workdir: PathBuf,

    /// Subdirectory receiving built zone files, configuration and staged state
    pub build_subdir: PathBuf,

    /// Subdirectory containing source zone files
    pub zones_subdir: PathBuf,

    /// Consider every zone changed
    pub all_zones: bool,

    /// Name server to compare serials against and deploy to
    pub server: Option<String>,

    /// Permit `$ORIGIN` to differ from the zone file name
    pub allow_fancy_names: bool,

    /// Syntax checker command, `{zone}` and `{zone_file}` are substituted
    pub check_command: String,

    /// Zone compiler command reporting `loaded serial N`
    pub compile_command: String,

    /// Deploy script
    pub deploy_command: Option<PathBuf>,

    /// JSON template of the name server configuration (None = built-in)
    pub conf_template: Option<PathBuf>,

    /// File name of the rendered configuration inside the build directory
    pub conf_output: String,

    /// Name of the catalog zone to synthesize (None = no catalog zone)
    pub catalog_zone: Option<String>,

    /// Zone allow list file
    pub zone_allowlist: Option<PathBuf>,

    /// Zone deny list file
    pub zone_denylist: Option<PathBuf>,

    /// Flag PTR targets that look like a forgotten trailing dot
    pub missing_dot_check: bool,

    /// Timeout of the live SOA query
    pub query_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            build_subdir: PathBuf::from("build"),
            zones_subdir: PathBuf::from("."),
            all_zones: false,
            server: None,
            allow_fancy_names: false,
            check_command: "kzonecheck -o {zone} {zone_file}".to_string(),
            compile_command: "named-compilezone -o - {zone} {zone_file}".to_string(),
            deploy_command: None,
            conf_template: None,
            conf_output: "zones.conf".to_string(),
            catalog_zone: None,
            zone_allowlist: None,
            zone_denylist: None,
            missing_dot_check: true,
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// Options settable from the configuration file; absent keys keep their value
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    build_subdir: Option<PathBuf>,
    zones_subdir: Option<PathBuf>,
    all_zones: Option<bool>,
    server: Option<String>,
    allow_fancy_names: Option<bool>,
    check_command: Option<String>,
    compile_command: Option<String>,
    deploy_command: Option<PathBuf>,
    conf_template: Option<PathBuf>,
    conf_output: Option<String>,
    catalog_zone: Option<String>,
    zone_allowlist: Option<PathBuf>,
    zone_denylist: Option<PathBuf>,
    missing_dot_check: Option<bool>,
    query_timeout_secs: Option<u64>,
}

impl PipelineConfig {
    /// Applies settings from TOML `content`
    pub fn apply_toml(&mut self, content: &str) -> Result<(), ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(value) = file.$field { self.$field = value; })*
            };
        }
        take!(
            build_subdir,
            zones_subdir,
            all_zones,
            allow_fancy_names,
            check_command,
            compile_command,
            conf_output,
            missing_dot_check
        );

        macro_rules! take_opt {
            ($($field:ident),*) => {
                $(if file.$field.is_some() { self.$field = file.$field; })*
            };
        }
        take_opt!(
            server,
            deploy_command,
            conf_template,
            catalog_zone,
            zone_allowlist,
            zone_denylist
        );

        if let Some(secs) = file.query_timeout_secs {
            self.query_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Applies `ZONEDEPLOY_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Applies variables looked up through `var`
    pub fn apply_vars(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = var("ZONEDEPLOY_BUILD_SUBDIR") {
            self.build_subdir = PathBuf::from(v);
        }
        if let Some(v) = var("ZONEDEPLOY_ZONES_SUBDIR") {
            self.zones_subdir = PathBuf::from(v);
        }
        if let Some(v) = var("ZONEDEPLOY_ALL_ZONES") {
            self.all_zones = parse_bool(&v, self.all_zones);
        }
        if let Some(v) = var("ZONEDEPLOY_SERVER") {
            self.server = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = var("ZONEDEPLOY_ALLOW_FANCY_NAMES") {
            self.allow_fancy_names = parse_bool(&v, self.allow_fancy_names);
        }
        if let Some(v) = var("ZONEDEPLOY_CHECK_COMMAND") {
            self.check_command = v;
        }
        if let Some(v) = var("ZONEDEPLOY_COMPILE_COMMAND") {
            self.compile_command = v;
        }
        if let Some(v) = var("ZONEDEPLOY_DEPLOY_COMMAND") {
            self.deploy_command = Some(PathBuf::from(v));
        }
        if let Some(v) = var("ZONEDEPLOY_CATALOG_ZONE") {
            self.catalog_zone = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = var("ZONEDEPLOY_MISSING_DOT_CHECK") {
            self.missing_dot_check = parse_bool(&v, self.missing_dot_check);
        }
        if let Some(v) = var("ZONEDEPLOY_QUERY_TIMEOUT") {
            let secs = v
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(v.clone()))?;
            self.query_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_command.split_whitespace().next().is_none() {
            return Err(ConfigError::InvalidCommand {
                option: "check_command",
                reason: "command is empty".to_string(),
            });
        }
        if self.compile_command.split_whitespace().next().is_none() {
            return Err(ConfigError::InvalidCommand {
                option: "compile_command",
                reason: "command is empty".to_string(),
            });
        }
        if !self.compile_command.contains("{zone_file}") {
            return Err(ConfigError::InvalidCommand {
                option: "compile_command",
                reason: "missing {zone_file} placeholder".to_string(),
            });
        }
        if self.query_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "Query timeout must be greater than 0".to_string(),
            ));
        }
        self.zones_relative()?;
        if let Some(name) = &self.catalog_zone {
            let valid = !name.is_empty()
                && !name.ends_with('.')
                && name.split('.').all(|l| !l.is_empty() && l.len() <= 63);
            if !valid {
                return Err(ConfigError::InvalidZoneName(name.clone()));
            }
        }
        Ok(())
    }

    pub fn zones_dir(&self) -> PathBuf {
        self.workdir.join(&self.zones_subdir)
    }

    /// Zones directory relative to the working directory, the form git
    /// reports changed paths in
    pub fn zones_relative(&self) -> Result<PathBuf, ConfigError> {
        if self.zones_subdir.is_relative() {
            return Ok(self.zones_subdir.clone());
        }
        if let Ok(rel) = self.zones_subdir.strip_prefix(&self.workdir) {
            return Ok(rel.to_path_buf());
        }

        // Relative or symlinked working directory
        let outside = || ConfigError::ZonesOutsideWorkdir(self.zones_subdir.clone());
        let workdir = self.workdir.canonicalize().map_err(|_| outside())?;
        let zones = self.zones_subdir.canonicalize().map_err(|_| outside())?;
        zones
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| outside())
    }

    pub fn build_dir(&self) -> PathBuf {
        self.workdir.join(&self.build_subdir)
    }

    /// State of the last successful deploy
    pub fn deployed_state_path(&self) -> PathBuf {
        self.workdir.join(STATE_FILE)
    }

    /// State written by the last build
    pub fn staged_state_path(&self) -> PathBuf {
        self.build_dir().join(STATE_FILE)
    }

    pub fn check_template(&self) -> CommandTemplate {
        CommandTemplate::new(&self.check_command)
    }

    pub fn compile_template(&self) -> CommandTemplate {
        CommandTemplate::new(&self.compile_command)
    }

    /// Resolves a configured file path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }
}

/// Parse a boolean from a string, with a default value for invalid input
pub fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}
