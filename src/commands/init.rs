// src/commands/init.rs
//! Client root initialization

use anyhow::{Context, Result};
use quarry::{repository, state, Environment, RemoteUrl};

/// Create the client root and fetch the initial index
pub fn cmd_init(env: &Environment, urls: &[String]) -> Result<()> {
    let remotes = urls
        .iter()
        .map(|u| RemoteUrl::parse(u))
        .collect::<quarry::Result<Vec<_>>>()
        .context("Invalid remote URL")?;

    let snapshot = state::init(env, remotes)?;
    println!("Initialized {}", snapshot.root.display());

    let report = repository::update(&snapshot)?;
    super::report_update(&report);
    Ok(())
}
