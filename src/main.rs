use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use zonedeploy::config::CONFIG_FILE;
use zonedeploy::{Pipeline, PipelineConfig, PipelineError, Tools};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build, check and deploy DNS zones from a git repository", long_about = None)]
struct Cli {
    /// Repository checkout to work in
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Configuration file (default: zonedeploy.toml in the working directory, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subdirectory containing built zone files (with automatically updated serial)
    #[arg(long)]
    build_subdir: Option<PathBuf>,

    /// Subdirectory containing source zone files
    #[arg(long)]
    zones_subdir: Option<PathBuf>,

    /// Consider all zones as updated
    #[arg(long)]
    all_zones: bool,

    /// Name server address, as host or host:port
    #[arg(long)]
    server: Option<String>,

    /// Allow $ORIGIN to differ from the zone file name
    #[arg(long)]
    allow_fancy_names: bool,

    /// Generate a catalog zone with this name
    #[arg(long, global = true)]
    catalog_zone: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Phase,
}

#[derive(Subcommand, Debug)]
enum Phase {
    /// Build zone files and the name server configuration
    Build(BuildArgs),
    /// Check built zones
    Check(CheckArgs),
    /// Deploy built zones to the name server
    Deploy(DeployArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Name server configuration template (JSON)
    #[arg(long)]
    conf_template: Option<PathBuf>,

    /// File name of the generated configuration in the build directory
    #[arg(long)]
    conf_output: Option<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Syntax check command, {zone} and {zone_file} are substituted
    #[arg(long)]
    check_command: Option<String>,

    /// Zone compiler command reporting the loaded serial
    #[arg(long)]
    compile_command: Option<String>,

    /// Do not flag PTR targets that look like a forgotten trailing dot
    #[arg(long)]
    no_missing_dot_check: bool,
}

#[derive(Args, Debug)]
struct DeployArgs {
    /// Deploy script, called as SCRIPT ZONES_DIR BUILD_DIR SERVER [ZONE...]
    #[arg(long)]
    deploy_command: Option<PathBuf>,

    /// Only show what would be deployed
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, PipelineError> {
    let mut config = PipelineConfig {
        workdir: cli.workdir.clone(),
        ..Default::default()
    };

    let file = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(cli.workdir.join(CONFIG_FILE)).filter(|p| p.is_file()),
    };
    if let Some(path) = file {
        let content =
            std::fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
        config.apply_toml(&content)?;
    }
    config.apply_env()?;

    if let Some(dir) = &cli.build_subdir {
        config.build_subdir = dir.clone();
    }
    if let Some(dir) = &cli.zones_subdir {
        config.zones_subdir = dir.clone();
    }
    if cli.all_zones {
        config.all_zones = true;
    }
    if let Some(server) = &cli.server {
        config.server = Some(server.clone());
    }
    if cli.allow_fancy_names {
        config.allow_fancy_names = true;
    }
    if let Some(name) = &cli.catalog_zone {
        config.catalog_zone = Some(name.clone());
    }

    match &cli.command {
        Phase::Build(args) => {
            if let Some(path) = &args.conf_template {
                config.conf_template = Some(path.clone());
            }
            if let Some(name) = &args.conf_output {
                config.conf_output = name.clone();
            }
        }
        Phase::Check(args) => {
            if let Some(command) = &args.check_command {
                config.check_command = command.clone();
            }
            if let Some(command) = &args.compile_command {
                config.compile_command = command.clone();
            }
            if args.no_missing_dot_check {
                config.missing_dot_check = false;
            }
        }
        Phase::Deploy(args) => {
            if let Some(script) = &args.deploy_command {
                config.deploy_command = Some(script.clone());
            }
        }
    }

    config.validate()?;
    Ok(config)
}

/// Runs the selected phase; `Ok(false)` means check found failing zones
fn run(cli: Cli) -> Result<bool, PipelineError> {
    let config = load_config(&cli)?;
    let tools = Tools::system(&config);
    let pipeline = Pipeline::new(config, tools);

    match cli.command {
        Phase::Build(_) => {
            pipeline.build()?;
            Ok(true)
        }
        Phase::Check(_) => Ok(pipeline.check()?.ok()),
        Phase::Deploy(args) => {
            pipeline.deploy(args.dry_run)?;
            Ok(true)
        }
    }
}
