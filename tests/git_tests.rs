//! Pipeline runs against a real git repository

mod common;

use common::*;
use std::path::{Path, PathBuf};
use zonedeploy::serial::is_increased;
use zonedeploy::vcs::{DiffFilter, EMPTY_TREE, GitCli, Vcs, zone_pathspec};

fn repository() -> Option<Workspace> {
    if !git_available() {
        eprintln!("git not found, skipping");
        return None;
    }
    let mut ws = Workspace::new();
    ws.git(&["init", "-q"]);
    ws.config.zones_subdir = "zones".into();
    Some(ws)
}

#[test]
fn test_git_cli_on_root_commit() {
    let Some(ws) = repository() else { return };
    ws.write("zones/example.com.zone", &zone_text("example.com"));
    ws.write("zones/nested/other.zone", &zone_text("other"));
    ws.write("README.md", "zones\n");
    let head = ws.commit(&["."], "initial");

    let vcs = GitCli::new(ws.path());
    assert_eq!(vcs.rev_parse("HEAD").unwrap(), Some(head.clone()));
    assert_eq!(vcs.rev_parse("HEAD~1").unwrap(), None);
    assert_eq!(vcs.rev_parse("no-such-branch").unwrap(), None);

    let pathspec = zone_pathspec(Path::new("zones"), ".zone");
    let changed = vcs.diff_names(&head, EMPTY_TREE, None, &pathspec).unwrap();
    assert_eq!(changed, vec![PathBuf::from("zones/example.com.zone")]);

    let added = vcs
        .diff_names(EMPTY_TREE, &head, Some(DiffFilter::RECONFIGURE), &pathspec)
        .unwrap();
    assert_eq!(added, changed);
    let modified = vcs
        .diff_names(EMPTY_TREE, &head, Some(DiffFilter::RELOAD), &pathspec)
        .unwrap();
    assert!(modified.is_empty());
}

#[test]
fn test_first_build_on_root_commit() {
    let Some(ws) = repository() else { return };
    ws.write("zones/example.com.zone", &zone_text("example.com"));
    let head = ws.commit(&["zones"], "initial");

    let report = ws.git_pipeline(RecordingDeployer::default()).build().unwrap();
    assert_eq!(report.commit, head);
    assert_eq!(report.reference, EMPTY_TREE);
    assert_eq!(report.zones.len(), 1);
    assert!(report.zones[0].bumped);
}

fn edit_deploy_cycle(ws: Workspace) {
    ws.write("zones/example.com.zone", &zone_text("example.com"));
    ws.commit(&["zones"], "initial");
    let deployer = RecordingDeployer::default();
    let pipeline = || ws.git_pipeline(deployer.clone());

    let first = pipeline().build().unwrap().zones[0].serial;
    assert!(pipeline().deploy(false).unwrap().promoted);

    // Modified zone: next serial, reloaded alone
    let mut text = zone_text("example.com");
    text.push_str("www IN A 192.0.2.80\n");
    ws.write("zones/example.com.zone", &text);
    ws.commit(&["zones"], "add www");

    let second = pipeline().build().unwrap();
    assert!(second.zones[0].bumped);
    assert!(
        is_increased(first, second.zones[0].serial),
        "changed zone was not given a new serial"
    );
    let report = pipeline().deploy(false).unwrap();
    assert!(!report.plan.reconfigure);
    assert_eq!(report.plan.reload, vec!["example.com"]);

    // Commit outside the zones directory: nothing moves
    ws.write("README.md", "zones\n");
    ws.commit(&["README.md"], "docs");

    let third = pipeline().build().unwrap();
    assert!(!third.zones[0].bumped);
    assert_eq!(third.zones[0].serial, second.zones[0].serial);
    assert!(pipeline().deploy(false).unwrap().plan.is_empty());

    // New zone file: full reconfigure
    ws.write("zones/example.org.zone", &zone_text("example.org"));
    ws.commit(&["zones"], "add example.org");

    pipeline().build().unwrap();
    let report = pipeline().deploy(false).unwrap();
    assert!(report.plan.reconfigure);
    assert!(report.plan.reload.is_empty());
    assert_eq!(deployer.calls.borrow().len(), 3);
}

#[test]
fn test_edit_deploy_cycle() {
    let Some(ws) = repository() else { return };
    edit_deploy_cycle(ws);
}

#[test]
fn test_edit_deploy_cycle_with_absolute_zones_dir() {
    let Some(mut ws) = repository() else { return };
    ws.config.zones_subdir = ws.path().join("zones");
    edit_deploy_cycle(ws);
}
