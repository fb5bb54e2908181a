// src/commands/remote.rs
//! Remote registry commands

use anyhow::Result;
use quarry::{remotes, Environment, RemoteUrl};

pub fn cmd_remote_list(env: &Environment) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    print!("{}", remotes::render_list(&snapshot));
    Ok(())
}

pub fn cmd_remote_add(env: &Environment, url: &str) -> Result<()> {
    let mut snapshot = super::load_snapshot(env)?;
    let url = RemoteUrl::parse(url)?;
    remotes::add(&mut snapshot, url.clone())?;
    println!("Added remote {url}");
    Ok(())
}

pub fn cmd_remote_add_git(env: &Environment, url: &str) -> Result<()> {
    let mut snapshot = super::load_snapshot(env)?;
    let url = RemoteUrl::parse_git(url)?;
    remotes::add(&mut snapshot, url.clone())?;
    println!("Added git remote {url}");
    Ok(())
}

pub fn cmd_remote_rm(env: &Environment, url_or_host: &str) -> Result<()> {
    let mut snapshot = super::load_snapshot(env)?;
    remotes::remove(&mut snapshot, url_or_host)?;
    Ok(())
}
