// src/commands/query.rs
//! Read-only commands: list, info, search, config

use anyhow::Result;
use quarry::query::{self, ConfigMode};
use quarry::Environment;

pub fn cmd_list(env: &Environment) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    print!("{}", query::list(&snapshot)?);
    Ok(())
}

pub fn cmd_info(env: &Environment, name: &str) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    print!("{}", query::info(&snapshot, name)?);
    Ok(())
}

pub fn cmd_search(env: &Environment, pattern: &str) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    print!("{}", query::search(&snapshot, pattern)?);
    Ok(())
}

pub fn cmd_config(
    env: &Environment,
    recursive: bool,
    mode: ConfigMode,
    names: &[String],
) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    println!("{}", query::config(&snapshot, recursive, mode, names)?);
    Ok(())
}
