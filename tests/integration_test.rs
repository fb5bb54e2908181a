// tests/integration_test.rs

//! Integration tests for the client root lifecycle and remote registry.

mod common;

use common::setup_root;
use quarry::{remotes, state, Environment, Error, RemoteUrl};
use std::fs;

#[test]
fn test_load_before_init_reports_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let result = state::load(&Environment::at(dir.path()));
    assert!(matches!(result, Err(Error::ConfigMissing)));
}

#[test]
fn test_init_creates_a_loadable_root() {
    let (_dir, snapshot) = setup_root(vec![
        RemoteUrl::parse("quarry://pkg.example.org").unwrap(),
    ]);
    assert!(snapshot.config_path().exists());
    assert!(snapshot.installed_path().exists());
    assert!(snapshot.index_dir().is_dir());

    let reloaded = state::load(&Environment::at(&snapshot.root)).unwrap();
    assert_eq!(reloaded.remotes, snapshot.remotes);
    assert!(state::read_installed(&reloaded).unwrap().is_empty());
}

#[test]
fn test_second_init_fails_and_leaves_config_untouched() {
    let (dir, _snapshot) = setup_root(vec![
        RemoteUrl::parse("quarry://a.example.org").unwrap(),
    ]);
    let before = fs::read(dir.path().join("config")).unwrap();

    let second = state::init(
        &Environment::at(dir.path()),
        vec![RemoteUrl::parse("quarry://b.example.org").unwrap()],
    );
    assert!(matches!(second, Err(Error::AlreadyInitialized)));
    assert_eq!(fs::read(dir.path().join("config")).unwrap(), before);
}

#[test]
fn test_remote_add_then_rm_restores_config_bytes() {
    let (_dir, mut snapshot) = setup_root(vec![
        RemoteUrl::parse("quarry://stable.example.org").unwrap(),
    ]);
    let before = fs::read(snapshot.config_path()).unwrap();

    let extra = RemoteUrl::parse("quarry://extra.example.org").unwrap();
    remotes::add(&mut snapshot, extra.clone()).unwrap();
    assert_ne!(fs::read(snapshot.config_path()).unwrap(), before);

    remotes::remove(&mut snapshot, &extra.to_string()).unwrap();
    assert_eq!(
        fs::read(snapshot.config_path()).unwrap(),
        before,
        "add then rm must round-trip the config byte for byte"
    );
}

#[test]
fn test_new_remotes_are_tried_first() {
    let (_dir, mut snapshot) = setup_root(vec![
        RemoteUrl::parse("quarry://old.example.org").unwrap(),
    ]);
    let new = RemoteUrl::parse("quarry://new.example.org").unwrap();
    remotes::add(&mut snapshot, new.clone()).unwrap();
    assert_eq!(snapshot.remotes[0], new);

    let reloaded = state::load(&Environment::at(&snapshot.root)).unwrap();
    assert_eq!(reloaded.remotes[0], new);
}

#[test]
fn test_duplicate_remote_is_rejected() {
    let (_dir, mut snapshot) = setup_root(vec![
        RemoteUrl::parse("quarry://pkg.example.org").unwrap(),
    ]);
    let duplicate = RemoteUrl::parse("quarry://pkg.example.org").unwrap();
    assert!(matches!(
        remotes::add(&mut snapshot, duplicate),
        Err(Error::DuplicateRemote(_))
    ));
    assert_eq!(snapshot.remotes.len(), 1);
}

#[test]
fn test_remote_rm_matches_by_hostname() {
    let (_dir, mut snapshot) = setup_root(vec![
        RemoteUrl::parse("quarry://pkg.example.org:8080").unwrap(),
        RemoteUrl::parse("quarry://other.example.org").unwrap(),
    ]);
    remotes::remove(&mut snapshot, "pkg.example.org").unwrap();
    assert_eq!(snapshot.remotes.len(), 1);
    assert_eq!(snapshot.remotes[0].host, "other.example.org");

    // matching nothing is not an error
    remotes::remove(&mut snapshot, "ghost.example.org").unwrap();
    assert_eq!(snapshot.remotes.len(), 1);
}
