// src/commands/upload.rs
//! Publishing a package to the configured remotes

use anyhow::Result;
use quarry::{publish, Environment};

pub fn cmd_upload(env: &Environment, spec: &str, yes: bool) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    let mut prompter = super::make_prompter(yes);
    publish::upload(&snapshot, spec, prompter.as_mut())?;
    Ok(())
}
