// tests/publish_test.rs

//! Publishing: archive lookup, key issuance and reuse, multi-remote
//! agreement, and the publish-then-install round trip.

mod common;

use common::{make_tarball, setup_root, tree_contents, TestRemote};
use quarry::{
    executor, publish, repository, resolver, state, Error, Request, ScriptedPrompter,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SPEC: &str = r#"[package]
name = "demo"
version = "1.0"
description = "Demo package"

[build]
script = ["mkdir -p out", "printf lib > out/demo.lib"]

[install]
lib = ["out/*"]
"#;

/// A working directory holding demo.spec and, optionally, its archive.
/// Returns the path handed to `upload`.
fn workdir(spec: &str, with_archive: bool) -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("demo.spec"), spec).unwrap();
    if with_archive {
        fs::write(
            dir.path().join("demo-1.0.tar.gz"),
            make_tarball("demo-1.0", &[("src/demo.c", "int demo;"), ("Makefile", "all:\n")]),
        )
        .unwrap();
    }
    let arg = dir.path().join("demo").to_str().unwrap().to_string();
    (dir, arg)
}

#[test]
fn test_upload_issues_and_reuses_a_key() {
    let remote = TestRemote::start("remote-key");
    let (_root, snapshot) = setup_root(vec![remote.url()]);
    let (_work, spec_arg) = workdir(SPEC, true);

    let mut prompter = ScriptedPrompter::new(&[]);
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();

    // the remote accepted the spec and archive, and the key is stored
    assert_eq!(remote.stored_key("demo"), Some("remote-key".to_string()));
    assert_eq!(
        state::read_key(&snapshot, "demo").unwrap(),
        Some("remote-key".to_string())
    );
    let key_file = fs::read(snapshot.key_path("demo")).unwrap();

    // a second upload reuses the key without rewriting it
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();
    assert_eq!(fs::read(snapshot.key_path("demo")).unwrap(), key_file);
}

#[test]
fn test_upload_with_wrong_key_is_refused() {
    let remote = TestRemote::start("remote-key");
    let (_root, snapshot) = setup_root(vec![remote.url()]);
    let (_work, spec_arg) = workdir(SPEC, true);

    let mut prompter = ScriptedPrompter::new(&[]);
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();

    // sabotage the stored key; the remote must now refuse the update
    state::write_atomic(&snapshot.key_path("demo"), b"stolen\n").unwrap();
    let err = publish::upload(&snapshot, &spec_arg, &mut prompter);
    assert!(err.is_err());
}

#[test]
fn test_disagreeing_remotes_abort_with_key_mismatch() {
    let first = TestRemote::start("key-a");
    let second = TestRemote::start("key-b");
    let (_root, snapshot) = setup_root(vec![first.url(), second.url()]);
    let (_work, spec_arg) = workdir(SPEC, true);

    // two remotes configured: one confirmation prompt per remote
    let mut prompter = ScriptedPrompter::new(&[true, true]);
    let err = publish::upload(&snapshot, &spec_arg, &mut prompter);
    assert!(matches!(err, Err(Error::KeyMismatch(name)) if name == "demo"));
    assert_eq!(prompter.asked.len(), 2);
    assert!(prompter.asked[0].starts_with("Upload to "));
    // no key survives an aborted first publication
    assert_eq!(state::read_key(&snapshot, "demo").unwrap(), None);
}

#[test]
fn test_upload_prompt_can_skip_a_remote() {
    let first = TestRemote::start("key-a");
    let second = TestRemote::start("key-b");
    let (_root, snapshot) = setup_root(vec![first.url(), second.url()]);
    let (_work, spec_arg) = workdir(SPEC, true);

    // decline the first remote, accept the second
    let mut prompter = ScriptedPrompter::new(&[false, true]);
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();
    assert_eq!(first.stored_key("demo"), None);
    assert_eq!(second.stored_key("demo"), Some("key-b".to_string()));
}

#[test]
fn test_upload_without_archive_or_sources_contacts_no_remote() {
    let remote = TestRemote::start("k");
    let (_root, snapshot) = setup_root(vec![remote.url()]);
    let (_work, spec_arg) = workdir(
        "[package]\nname = \"demo\"\nversion = \"1.0\"\n",
        false,
    );

    let mut prompter = ScriptedPrompter::new(&[]);
    let err = publish::upload(&snapshot, &spec_arg, &mut prompter);
    assert!(
        matches!(err, Err(Error::NoArchiveLocation(name)) if name == "demo-1.0.tar.gz")
    );
    assert!(remote.store.lock().unwrap().specs.is_empty(), "no remote was called");
    assert_eq!(state::read_key(&snapshot, "demo").unwrap(), None);
}

#[test]
fn test_upload_accepts_explicit_spec_suffix() {
    let (_root, snapshot) = setup_root(vec![]);
    let (_work, spec_arg) = workdir(SPEC, true);
    let with_suffix = format!("{spec_arg}.spec");
    assert!(PathBuf::from(&with_suffix).exists());

    let mut prompter = ScriptedPrompter::new(&[]);
    publish::upload(&snapshot, &with_suffix, &mut prompter).unwrap();
    assert!(snapshot.index_dir().join("demo-1.0.spec").exists());
}

#[test]
fn test_publish_then_install_round_trips_the_source_tree() {
    // no remotes: the local mirror alone serves the publication
    let (_root, snapshot) = setup_root(vec![]);
    let (_work, spec_arg) = workdir(SPEC, true);

    let mut prompter = ScriptedPrompter::new(&[]);
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();

    // the mirror issued a key and indexed the release
    assert!(state::read_key(&snapshot, "demo").unwrap().is_some());
    assert!(snapshot.index_dir().join("demo-1.0.spec").exists());

    // install straight from the mirror's archive store
    let request = Request {
        wish_install: vec![("demo".to_string(), None)],
        ..Default::default()
    };
    let solution = resolver::request_solution(&snapshot, &request, &mut prompter)
        .unwrap()
        .expect("fresh install auto-accepted");
    executor::apply(&snapshot, &solution, &mut prompter).unwrap();

    // the build tree holds exactly the published sources (plus build output)
    let build = snapshot.build_dir(&quarry::NV::parse("demo-1.0").unwrap());
    assert_eq!(
        fs::read(build.join("src/demo.c")).unwrap(),
        b"int demo;",
        "sources survive publish, fetch and extraction byte for byte"
    );
    assert_eq!(fs::read(build.join("Makefile")).unwrap(), b"all:\n");
    assert!(snapshot.lib_dir("demo").join("demo.lib").exists());
}

#[test]
fn test_republish_with_stored_key_changes_nothing() {
    let (_root, snapshot) = setup_root(vec![]);
    let (_work, spec_arg) = workdir(SPEC, true);

    let mut prompter = ScriptedPrompter::new(&[]);
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();
    let index_before = tree_contents(&snapshot.index_dir());

    // re-publication with the stored key succeeds and changes nothing
    publish::upload(&snapshot, &spec_arg, &mut prompter).unwrap();
    assert_eq!(tree_contents(&snapshot.index_dir()), index_before);

    // a stale update run right after is a no-op with no remotes
    let report = repository::update(&snapshot).unwrap();
    assert!(report.new_packages.is_empty());
}
