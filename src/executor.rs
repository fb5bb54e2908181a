// src/executor.rs

//! Applying an accepted solution to the tree.
//!
//! Batches run in solver order, actions within a batch in order. Each
//! change action clears the build tree, obtains sources (remote archive
//! first, the spec's own links as fallback), runs the build script and
//! hands the manifest to the installer. The installed map is rewritten
//! after every action, so an interruption loses at most the in-flight
//! package.

use crate::archive::{self, Links};
use crate::error::{Error, Result};
use crate::install;
use crate::prompt::Prompter;
use crate::repository::{self, RemoteServer};
use crate::solver::{Action, Previous, Solution};
use crate::spec::PackageSpec;
use crate::state::{self, Snapshot};
use crate::version::{HeadState, NV};
use std::fs;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Apply every action of an accepted solution
pub fn apply(
    snapshot: &Snapshot,
    solution: &Solution,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    for batch in solution {
        for action in batch {
            match action {
                Action::Delete(nv) => delete(snapshot, nv, prompter)?,
                Action::Change(previous, nv) => change(snapshot, previous, nv, prompter)?,
                Action::Recompile(nv) => {
                    change(snapshot, &Previous::Installed(nv.clone()), nv, prompter)?
                }
            }
        }
    }
    Ok(())
}

/// Remove an installed release. A no-op when `installed` no longer maps
/// the name to this version: an earlier action already superseded it.
pub fn delete(snapshot: &Snapshot, nv: &NV, prompter: &mut dyn Prompter) -> Result<()> {
    let mut installed = state::read_installed(snapshot)?;
    match installed.get(&nv.name) {
        Some(version) if *version == nv.version => {}
        _ => {
            debug!("{} is not installed at this version, nothing to delete", nv);
            return Ok(());
        }
    }

    let manifest_path = snapshot.to_install_path(nv);
    let manifest = match crate::spec::InstallManifest::read(&manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("No install manifest for {}: {}", nv, e);
            Default::default()
        }
    };
    install::remove_artifacts(snapshot, nv, &manifest, prompter)?;

    installed.remove(&nv.name);
    state::write_installed(snapshot, &installed)?;
    println!("{} removed.", nv);
    Ok(())
}

/// Install (or replace, or rebuild) one release
fn change(
    snapshot: &Snapshot,
    previous: &Previous,
    nv: &NV,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    if let Previous::Installed(old) = previous {
        delete(snapshot, old, prompter)?;
    }

    let spec_path = snapshot.spec_path(nv);
    if !spec_path.exists() {
        return Err(Error::UnknownPackage(nv.name.clone()));
    }
    let spec = PackageSpec::read(&spec_path)?;

    let build = snapshot.build_dir(nv);
    if build.exists() {
        fs::remove_dir_all(&build)?;
    }
    fs::create_dir_all(&build)?;

    obtain_sources(snapshot, &spec, nv)?;
    run_build_script(snapshot, &spec, nv)?;

    let manifest = spec.install.clone();
    state::write_atomic(
        &snapshot.to_install_path(nv),
        manifest.to_toml()?.as_bytes(),
    )?;
    install::install_artifacts(snapshot, nv, &manifest, prompter)?;

    let mut installed = state::read_installed(snapshot)?;
    installed.insert(
        nv.name.clone(),
        nv.version.with_head_state(HeadState::UpToDate),
    );
    state::write_installed(snapshot, &installed)?;
    println!("{} installed.", nv);
    Ok(())
}

/// Fill the build tree: first remote serving an archive wins, otherwise
/// the spec's source links are fetched directly
fn obtain_sources(snapshot: &Snapshot, spec: &PackageSpec, nv: &NV) -> Result<()> {
    let build = snapshot.build_dir(nv);
    for remote in &snapshot.remotes {
        let server = repository::connect(snapshot, remote);
        match server.get_archive(nv) {
            Ok(Some(bytes)) => {
                debug!("Archive for {} served by {}", nv, remote);
                let staging = tempfile::tempdir()?;
                archive::extract_tgz_bytes(&bytes, staging.path())?;
                archive::settle_extracted(staging.path(), &build)?;
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!("Remote {} could not serve {}: {}", remote, nv, e),
        }
    }

    // the local mirror keeps archives of everything published here
    let mirror = repository::LocalMirror::new(snapshot);
    if let Some(bytes) = mirror.get_archive(nv)? {
        debug!("Archive for {} served by the local mirror", nv);
        let staging = tempfile::tempdir()?;
        archive::extract_tgz_bytes(&bytes, staging.path())?;
        archive::settle_extracted(staging.path(), &build)?;
        return Ok(());
    }

    let links = Links {
        urls: spec.source.urls.clone(),
        patches: spec.source.patches.clone(),
    };
    if links.urls.is_empty() && links.patches.is_empty() {
        return Err(Error::NoArchiveLocation(format!("{}.tar.gz", nv.stem())));
    }
    info!("No remote serves {}, fetching its source links", nv);
    let staging = tempfile::tempdir()?;
    links.materialize(staging.path())?;
    archive::settle_extracted(staging.path(), &build)?;
    Ok(())
}

/// Run the spec's build commands in the build tree.
///
/// Output is relayed through the log; a non-zero exit aborts the action
/// before any tree mutation.
fn run_build_script(snapshot: &Snapshot, spec: &PackageSpec, nv: &NV) -> Result<()> {
    let build = snapshot.build_dir(nv);
    for command in &spec.build.script {
        info!("[{}] $ {}", nv, command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&build)
            .env("QUARRY_ROOT", &snapshot.root)
            .env("QUARRY_PACKAGE_NAME", &nv.name)
            .env("QUARRY_PACKAGE_VERSION", nv.version.to_string())
            .stdin(Stdio::null())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            info!("[{}] {}", nv, line);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            warn!("[{}] {}", nv, line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(Error::BuildFailed(code));
        }
    }
    Ok(())
}
