// src/publish.rs

//! Publishing a package to the configured remotes.
//!
//! The spec file is read from the working directory, an archive is
//! located or synthesized from the spec's source links, and the pair is
//! pushed to every eligible (non-git) remote plus the local mirror.
//! The first publication of a name yields a key that is stored under
//! `keys/` and reused for every later re-publication.

use crate::archive::{self, Links};
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::remotes::Scheme;
use crate::repository::{self, LocalMirror, RemoteServer};
use crate::spec::PackageSpec;
use crate::state::{self, Snapshot};
use crate::version::NV;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Publish a spec (plus its archive) to every eligible remote
pub fn upload(
    snapshot: &Snapshot,
    name_or_file: &str,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let spec_path = if name_or_file.ends_with(".spec") {
        PathBuf::from(name_or_file)
    } else {
        PathBuf::from(format!("{name_or_file}.spec"))
    };
    let spec_text = fs::read_to_string(&spec_path)?;
    let spec = PackageSpec::parse(&spec_text)?;
    let nv = spec.nv()?;

    // the archive is looked up next to the spec file
    let spec_dir = match spec_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let archive_bytes = locate_archive(&spec_dir, &spec, &nv)?;

    let eligible: Vec<_> = snapshot
        .remotes
        .iter()
        .filter(|r| r.scheme != Scheme::Git)
        .collect();
    let mut selected = Vec::new();
    for remote in &eligible {
        if eligible.len() > 1 {
            let question = format!("Upload to {} ?", remote.host);
            if !prompter.confirm(&question)? {
                continue;
            }
        }
        selected.push(repository::connect(snapshot, remote));
    }

    let mirror = LocalMirror::new(snapshot);
    let spec_bytes = spec_text.as_bytes();
    let archive = archive_bytes.as_deref();

    match state::read_key(snapshot, &nv.name)? {
        Some(key) => {
            for server in &selected {
                server.update_archive(&nv, spec_bytes, archive, &key)?;
                println!("{} updated on {}.", nv, server.address());
            }
            mirror.update_archive(&nv, spec_bytes, archive, &key)?;
        }
        None => {
            let mut remote_key: Option<String> = None;
            for server in &selected {
                let returned = server.new_archive(&nv, spec_bytes, archive)?;
                println!("{} published to {}.", nv, server.address());
                match (&remote_key, returned) {
                    (Some(seen), Some(fresh)) if *seen != fresh => {
                        return Err(Error::KeyMismatch(nv.name.clone()))
                    }
                    (None, Some(fresh)) => remote_key = Some(fresh),
                    _ => {}
                }
            }
            let mirror_key = mirror.new_archive(&nv, spec_bytes, archive)?;
            // A remote-issued key wins over the mirror's; either way the
            // stored key is what every server will be told next time
            if let Some(key) = remote_key.or(mirror_key) {
                state::write_key(snapshot, &nv.name, &key)?;
                debug!("Stored publication key for {}", nv.name);
            }
        }
    }
    info!("Published {}", nv);
    Ok(())
}

/// Find `name-version.tar.gz` beside the spec, or synthesize it from
/// the spec's source links.
///
/// `Ok(None)` publishes the spec alone, which only works when the spec
/// points every consumer at external sources.
fn locate_archive(spec_dir: &std::path::Path, spec: &PackageSpec, nv: &NV) -> Result<Option<Vec<u8>>> {
    let archive_name = format!("{}.tar.gz", nv.stem());
    let local_file = spec_dir.join(&archive_name);
    if local_file.exists() {
        debug!("Using prebuilt archive {}", archive_name);
        return Ok(Some(fs::read(&local_file)?));
    }

    let urls = &spec.source.urls;
    let (local, external): (Vec<_>, Vec<_>) = spec
        .source
        .patches
        .iter()
        .cloned()
        .partition(|p| Links::is_local(p));

    if !local.is_empty() && !external.is_empty() {
        return Err(Error::MixedPatchesUnsupported);
    }
    if !urls.is_empty() && external.is_empty() {
        info!("Synthesizing {} from source links", archive_name);
        let staging = tempfile::tempdir()?;
        let fetched = staging.path().join("fetched");
        Links { urls: urls.clone(), patches: local }.materialize(&fetched)?;
        // canonicalize: the repacked tarball holds exactly one top-level
        // directory named after the release
        let tree = staging.path().join("tree");
        archive::settle_extracted(&fetched, &tree)?;
        let tarball = staging.path().join(&archive_name);
        archive::pack_tgz(&tree, &nv.stem(), &tarball)?;
        return Ok(Some(fs::read(&tarball)?));
    }
    if external.is_empty() {
        // no archive, no URLs, and local patches alone cannot seed a tree
        return Err(Error::NoArchiveLocation(archive_name));
    }
    debug!("Publishing {} without an archive", nv);
    Ok(None)
}
