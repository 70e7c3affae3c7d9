//! Common test utilities for pipeline tests
//!
//! Fakes for the external collaborators plus a temporary workspace holding
//! zone files and state.

#![allow(dead_code)] // These helpers are used by various test files

use regex::Regex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::sync::LazyLock;
use tempfile::TempDir;
use zonedeploy::dns::{LookupError, SerialLookup};
use zonedeploy::error::{PipelineError, Result};
use zonedeploy::serial::Serial;
use zonedeploy::tools::checker::interpret_compile;
use zonedeploy::tools::{CheckOutcome, CompileOutcome, Deployer, SyntaxChecker, ZoneCompiler};
use zonedeploy::vcs::{DiffFilter, GitCli, Vcs};
use zonedeploy::{Pipeline, PipelineConfig, Tools};

pub const HEAD: &str = "cccccccccccccccccccccccccccccccccccccccc";
pub const PARENT: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

static SOA_SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\sSOA\s+\S+\s+\S+\s*\(?\s*([0-9]+)\s").unwrap());

/// Zone file text with an `$ORIGIN` line and a serial placeholder
pub fn zone_text(origin: &str) -> String {
    format!(
        "$TTL 3600\n\
         $ORIGIN {origin}.\n\
         @ IN SOA ns1.{origin}. hostmaster.{origin}. (\n\
         \x20       1 ; SERIALAUTOUPDATE\n\
         \x20       3600 900 604800 86400 )\n\
         @ IN NS ns1.{origin}.\n\
         ns1 IN A 192.0.2.1\n"
    )
}

#[derive(Default)]
struct VcsState {
    head: Option<String>,
    parent: Option<String>,
    changed: Vec<PathBuf>,
    filtered: HashMap<String, Vec<PathBuf>>,
    calls: Vec<String>,
}

/// In-memory [`Vcs`]; clones share state so a test can adjust it between
/// phases.
#[derive(Clone)]
pub struct FakeVcs {
    state: Rc<RefCell<VcsState>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        let state = VcsState {
            head: Some(HEAD.to_string()),
            parent: Some(PARENT.to_string()),
            ..Default::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn set_head(&self, commit: &str) {
        self.state.borrow_mut().head = Some(commit.to_string());
    }

    pub fn set_changed(&self, paths: &[&str]) {
        self.state.borrow_mut().changed = paths.iter().map(PathBuf::from).collect();
    }

    pub fn set_filtered(&self, filter: DiffFilter, paths: &[&str]) {
        self.state
            .borrow_mut()
            .filtered
            .insert(filter.to_string(), paths.iter().map(PathBuf::from).collect());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }
}

impl Vcs for FakeVcs {
    fn diff_names(
        &self,
        from: &str,
        to: &str,
        filter: Option<DiffFilter>,
        pathspec: &str,
    ) -> Result<Vec<PathBuf>> {
        let mut state = self.state.borrow_mut();
        let filter = filter.map(|f| f.to_string());
        state.calls.push(format!(
            "diff {} {} {} {}",
            from,
            to,
            filter.as_deref().unwrap_or("-"),
            pathspec
        ));
        Ok(match filter {
            Some(f) => state.filtered.get(&f).cloned().unwrap_or_default(),
            None => state.changed.clone(),
        })
    }

    fn rev_parse(&self, rev: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        Ok(match rev {
            "HEAD" => state.head.clone(),
            "HEAD~1" => state.parent.clone(),
            _ => None,
        })
    }
}

/// Syntax checker failing for a configured set of zones
#[derive(Default)]
pub struct FakeChecker {
    pub failing: HashSet<String>,
    /// Behave like a checker binary that is not installed
    pub missing: bool,
}

impl SyntaxChecker for FakeChecker {
    fn check(&self, zone: &str, _zone_file: &Path) -> Result<CheckOutcome> {
        if self.missing {
            return Err(PipelineError::ToolSpawn {
                command: "kzonecheck".to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        let success = !self.failing.contains(zone);
        Ok(CheckOutcome {
            success,
            diagnostics: if success {
                String::new()
            } else {
                format!("{}: semantic error", zone)
            },
        })
    }
}

/// Compiler reading the SOA serial straight from the built file
#[derive(Default)]
pub struct FakeCompiler;

impl ZoneCompiler for FakeCompiler {
    fn compile(&self, zone: &str, zone_file: &Path) -> Result<CompileOutcome> {
        let text = fs::read_to_string(zone_file).map_err(|e| PipelineError::io(zone_file, e))?;
        let diagnostics = match SOA_SERIAL.captures(&text) {
            Some(caps) => format!("zone {}/IN: loaded serial {}\nOK\n", zone, &caps[1]),
            None => format!("zone {}/IN: has no SOA record\n", zone),
        };
        Ok(interpret_compile(true, text.as_bytes(), diagnostics))
    }
}

/// Live lookup answering from a fixed table; unknown zones fail
#[derive(Default)]
pub struct FakeLookup {
    pub serials: HashMap<String, Serial>,
}

impl SerialLookup for FakeLookup {
    fn soa_serial(&self, zone: &str, server: &str) -> std::result::Result<Serial, LookupError> {
        self.serials
            .get(zone)
            .copied()
            .ok_or_else(|| LookupError::Resolve(server.to_string()))
    }
}

/// Deployer recording every reload list it receives
#[derive(Clone, Default)]
pub struct RecordingDeployer {
    pub calls: Rc<RefCell<Vec<Vec<String>>>>,
    pub fail: bool,
}

impl Deployer for RecordingDeployer {
    fn deploy(
        &self,
        _zones_dir: &Path,
        _build_dir: &Path,
        _server: &str,
        reload: &[String],
    ) -> Result<()> {
        self.calls.borrow_mut().push(reload.to_vec());
        if self.fail {
            return Err(PipelineError::DeployFailed("deploy script exited with 1".to_string()));
        }
        Ok(())
    }
}

/// A temporary repository checkout
pub struct Workspace {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            workdir: dir.path().to_path_buf(),
            server: Some("192.0.2.53".to_string()),
            ..Default::default()
        };
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `rel` inside the workspace
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }

    pub fn pipeline(&self, vcs: &FakeVcs) -> Pipeline {
        self.pipeline_with(vcs, FakeChecker::default(), FakeLookup::default(), None)
    }

    pub fn pipeline_with(
        &self,
        vcs: &FakeVcs,
        checker: FakeChecker,
        lookup: FakeLookup,
        deployer: Option<RecordingDeployer>,
    ) -> Pipeline {
        let tools = Tools {
            vcs: Box::new(vcs.clone()),
            checker: Box::new(checker),
            compiler: Box::new(FakeCompiler),
            lookup: Box::new(lookup),
            deployer: deployer.map(|d| Box::new(d) as Box<dyn Deployer>),
        };
        Pipeline::new(self.config.clone(), tools)
    }

    /// Pipeline whose version control is the real `git` binary
    pub fn git_pipeline(&self, deployer: RecordingDeployer) -> Pipeline {
        let tools = Tools {
            vcs: Box::new(GitCli::new(self.path())),
            checker: Box::new(FakeChecker::default()),
            compiler: Box::new(FakeCompiler),
            lookup: Box::new(FakeLookup::default()),
            deployer: Some(Box::new(deployer) as Box<dyn Deployer>),
        };
        Pipeline::new(self.config.clone(), tools)
    }

    /// Runs git in the workspace and returns its trimmed stdout
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.path())
            .args(["-c", "user.name=Zone Admin", "-c", "user.email=hostmaster@example.com"])
            .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Stages everything under `paths` and commits, returning the commit id
    pub fn commit(&self, paths: &[&str], message: &str) -> String {
        let mut add = vec!["add", "--"];
        add.extend_from_slice(paths);
        self.git(&add);
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }
}

/// Whether a `git` binary is available to run repository tests
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}
