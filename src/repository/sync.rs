// src/repository/sync.rs

//! Repository aggregation: pull every configured remote into the local
//! index.
//!
//! Remotes are visited in configured order. A spec already present in
//! the index is never re-fetched, so the first remote listing a release
//! wins and a second run with unchanged remotes writes nothing.
//! A failing remote is reported and skipped; the run only fails as a
//! whole when every remote failed.

use super::{connect, GitRemote, RemoteServer};
use crate::error::{Error, Result};
use crate::remotes::{RemoteUrl, Scheme};
use crate::state::{self, Snapshot};
use crate::version::{HeadState, NV};
use tracing::{info, warn};

/// Outcome of one `update` run
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Releases that entered the index during this run
    pub new_packages: Vec<NV>,
    /// Remotes that failed, with the failure text
    pub failed: Vec<(String, String)>,
}

/// Fetch indexes from all configured remotes
pub fn update(snapshot: &Snapshot) -> Result<UpdateReport> {
    let mut report = UpdateReport::default();
    for remote in &snapshot.remotes {
        let outcome = match remote.scheme {
            Scheme::Quarry => update_plain(snapshot, remote, &mut report),
            Scheme::Git => update_git(snapshot, remote, &mut report),
        };
        if let Err(e) = outcome {
            warn!("Remote {} failed: {}", remote, e);
            report.failed.push((remote.to_string(), e.to_string()));
        }
    }
    if !snapshot.remotes.is_empty() && report.failed.len() == snapshot.remotes.len() {
        let (remote, reason) = report.failed.remove(0);
        return Err(Error::RemoteUnreachable(remote, reason));
    }
    Ok(report)
}

/// Plain remote: list releases, fetch specs the index lacks
fn update_plain(
    snapshot: &Snapshot,
    remote: &RemoteUrl,
    report: &mut UpdateReport,
) -> Result<()> {
    let server = connect(snapshot, remote);
    for nv in server.list()? {
        let spec_path = snapshot.spec_path(&nv);
        if spec_path.exists() {
            continue;
        }
        let spec = server.get_spec(&nv)?;
        state::write_atomic(&spec_path, &spec)?;
        info!("New package {} from {}", nv, remote);
        report.new_packages.push(nv);
    }
    Ok(())
}

/// Git remote: clone on first contact, otherwise diff-then-pull
fn update_git(
    snapshot: &Snapshot,
    remote: &RemoteUrl,
    report: &mut UpdateReport,
) -> Result<()> {
    let git = GitRemote::new(remote.clone(), snapshot.index_dir());
    if !git.is_cloned() {
        git.clone_repo()?;
        let mut fresh = git.list()?;
        for nv in &fresh {
            info!("New package {} from {}", nv, remote);
        }
        report.new_packages.append(&mut fresh);
        return Ok(());
    }

    let updates = git.fetch_updates()?;
    git.pull()?;
    if updates.is_empty() {
        return Ok(());
    }

    for file in &updates {
        let Some(stem) = file.strip_suffix(".spec") else { continue };
        if let Ok(nv) = NV::parse(stem) {
            info!("New package {} from {}", nv, remote);
            report.new_packages.push(nv);
        }
    }
    mark_behind_heads(snapshot, &updates)
}

/// Installed git-tracked packages whose spec or tracked sources changed
/// are no longer current
fn mark_behind_heads(snapshot: &Snapshot, updates: &[String]) -> Result<()> {
    let mut installed = state::read_installed(snapshot)?;
    let mut dirty = false;
    for (name, version) in installed.iter_mut() {
        if !version.is_head() || version.head_state() == Some(HeadState::Behind) {
            continue;
        }
        let touched = updates.iter().any(|file| {
            file == &format!("{name}-head.spec")
                || file.strip_prefix(name.as_str()).is_some_and(|rest| rest.starts_with('/'))
        });
        if touched {
            info!("{} has new upstream commits", name);
            *version = version.with_head_state(HeadState::Behind);
            dirty = true;
        }
    }
    if dirty {
        state::write_installed(snapshot, &installed)?;
    }
    Ok(())
}
