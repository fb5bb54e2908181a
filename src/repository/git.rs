// src/repository/git.rs

//! Git backend: a remote whose index is a git repository of spec files.
//!
//! The repository is cloned straight into `index/`, so its spec files
//! are the index entries. Updates are two-phase: fetch and diff to
//! learn which files changed, then merge. Sources for a package can be
//! tracked in the checkout under a directory named after the package,
//! in which case `get_archive` packs them on the fly.

use super::RemoteServer;
use crate::archive;
use crate::error::{Error, Result};
use crate::remotes::RemoteUrl;
use crate::version::NV;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// A git-backed remote and its checkout inside `index/`
pub struct GitRemote {
    url: RemoteUrl,
    checkout: PathBuf,
}

impl GitRemote {
    pub fn new(url: RemoteUrl, checkout: PathBuf) -> Self {
        Self { url, checkout }
    }

    /// Whether the index already holds a clone
    pub fn is_cloned(&self) -> bool {
        self.checkout.join(".git").is_dir()
    }

    /// Clone the remote into the index directory
    pub fn clone_repo(&self) -> Result<()> {
        let address = self.url.git_address();
        info!("Cloning {} into {}", address, self.checkout.display());
        fs::create_dir_all(&self.checkout)?;
        let output = Command::new("git")
            .arg("clone")
            .arg(&address)
            .arg(&self.checkout)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            warn!("git clone failed: {}", String::from_utf8_lossy(&output.stderr).trim());
            return Err(Error::UnknownGitRepo(address));
        }
        Ok(())
    }

    /// Fetch the remote and report the files changed since the local
    /// head, without touching the working tree yet
    pub fn fetch_updates(&self) -> Result<Vec<String>> {
        self.run_git(&["fetch", "--quiet", "origin"])?;
        let diff = self.run_git(&["diff", "--name-only", "HEAD..FETCH_HEAD"])?;
        Ok(diff.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
    }

    /// Advance the checkout to the fetched head
    pub fn pull(&self) -> Result<()> {
        self.run_git(&["merge", "--ff-only", "--quiet", "FETCH_HEAD"])?;
        Ok(())
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        debug!("git {:?} in {}", args, self.checkout.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.checkout)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(Error::RemoteUnreachable(
                self.url.to_string(),
                format!(
                    "git {} failed: {}",
                    args.first().unwrap_or(&""),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Directory of tracked sources for `name`, when the checkout has one
    fn source_dir(&self, name: &str) -> Option<PathBuf> {
        let dir = self.checkout.join(name);
        dir.is_dir().then_some(dir)
    }
}

/// Spec files in a checkout whose stems parse as `name-version`
pub fn spec_files(dir: &Path) -> Result<Vec<NV>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        if let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".spec")) {
            if let Ok(nv) = NV::parse(stem) {
                out.push(nv);
            }
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    Ok(out)
}

impl RemoteServer for GitRemote {
    fn address(&self) -> String {
        self.url.to_string()
    }

    fn list(&self) -> Result<Vec<NV>> {
        spec_files(&self.checkout)
    }

    fn get_spec(&self, nv: &NV) -> Result<Vec<u8>> {
        Ok(fs::read(self.checkout.join(format!("{}.spec", nv.stem())))?)
    }

    fn get_archive(&self, nv: &NV) -> Result<Option<Vec<u8>>> {
        let Some(sources) = self.source_dir(&nv.name) else {
            return Ok(None);
        };
        debug!("Packing tracked sources of {} from {}", nv, sources.display());
        let staging = tempfile::tempdir()?;
        let tarball = staging.path().join(format!("{}.tar.gz", nv.stem()));
        archive::pack_tgz(&sources, &nv.stem(), &tarball)?;
        Ok(Some(fs::read(&tarball)?))
    }

    fn new_archive(&self, _nv: &NV, _spec: &[u8], _archive: Option<&[u8]>) -> Result<Option<String>> {
        Err(Error::Download(format!(
            "git remote {} does not accept publications",
            self.url
        )))
    }

    fn update_archive(&self, _nv: &NV, _spec: &[u8], _archive: Option<&[u8]>, _key: &str) -> Result<()> {
        Err(Error::Download(format!(
            "git remote {} does not accept publications",
            self.url
        )))
    }
}
