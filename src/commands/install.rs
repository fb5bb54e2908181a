// src/commands/install.rs
//! Install, remove and upgrade: the solver-driven mutations

use anyhow::Result;
use quarry::{
    executor, resolver, state, Constraint, Environment, Error, Request, Version, NV,
};
use tracing::info;

/// Install a package by name, or pin an exact release with `name-version`
pub fn cmd_install(env: &Environment, package: &str, yes: bool) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    let mut prompter = super::make_prompter(yes);

    let wish = if package.contains('-') {
        let nv = NV::parse(package)?;
        let constraint = match nv.version {
            Version::Release(release) => Some(Constraint::eq(release)),
            Version::Head(_) => None,
        };
        (nv.name, constraint)
    } else {
        (package.to_string(), None)
    };

    let known = state::index_list(&snapshot)?.iter().any(|nv| nv.name == wish.0);
    if !known {
        return Err(Error::UnknownPackage(wish.0).into());
    }

    info!("Installing {}", package);
    let request = Request {
        wish_install: vec![wish],
        ..Default::default()
    };
    run(&snapshot, &request, prompter.as_mut())
}

/// Remove an installed package (and whatever depends on it)
pub fn cmd_remove(env: &Environment, name: &str, yes: bool) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    let mut prompter = super::make_prompter(yes);

    if state::installed_version(&snapshot, name)?.is_none() {
        return Err(Error::UnknownPackage(name.to_string()).into());
    }

    info!("Removing {}", name);
    let request = Request {
        wish_remove: vec![(name.to_string(), None)],
        ..Default::default()
    };
    run(&snapshot, &request, prompter.as_mut())
}

/// Upgrade every installed package to its newest known release
pub fn cmd_upgrade(env: &Environment, yes: bool) -> Result<()> {
    let snapshot = super::load_snapshot(env)?;
    let mut prompter = super::make_prompter(yes);

    let installed = state::read_installed(&snapshot)?;
    if installed.is_empty() {
        println!("Nothing installed.");
        return Ok(());
    }

    info!("Upgrading {} package(s)", installed.len());
    let request = Request {
        wish_upgrade: installed.into_keys().map(|name| (name, None)).collect(),
        ..Default::default()
    };
    run(&snapshot, &request, prompter.as_mut())
}

fn run(
    snapshot: &quarry::Snapshot,
    request: &Request,
    prompter: &mut dyn quarry::Prompter,
) -> Result<()> {
    match resolver::request_solution(snapshot, request, prompter)? {
        Some(solution) => Ok(executor::apply(snapshot, &solution, prompter)?),
        None => Ok(()),
    }
}
