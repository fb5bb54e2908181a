// src/commands/update.rs
//! Index refresh from all configured remotes

use anyhow::Result;
use quarry::{repository, Environment};

pub fn cmd_update(env: &Environment) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    let report = repository::update(&snapshot)?;
    super::report_update(&report);
    if report.new_packages.is_empty() {
        println!("Index is up to date.");
    }
    Ok(())
}
