// src/archive.rs

//! Archive handling: tar.gz extraction and repacking, plus the `Links`
//! fallback used when no remote serves a pre-built archive.
//!
//! A `Links` descriptor combines the spec's source URLs and patches.
//! Materializing it downloads (or copies, for local paths) every entry
//! into a target tree: tarballs are unpacked, plain files and patches
//! land at the tree root for the build script to pick up.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

/// HTTP timeout for source downloads
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Source URLs plus patches, combined
#[derive(Debug, Clone)]
pub struct Links {
    pub urls: Vec<String>,
    pub patches: Vec<String>,
}

impl Links {
    /// A link is local when it carries no transport scheme
    pub fn is_local(link: &str) -> bool {
        !link.contains("://")
    }

    /// Fetch every URL and patch into `dest`. Tarballs are unpacked,
    /// everything else is placed at the tree root.
    pub fn materialize(&self, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)?;
        for url in &self.urls {
            let local = fetch_link(url, dest)?;
            if is_tarball(&local) {
                debug!("Unpacking {}", local.display());
                let staging = tempfile::tempdir_in(dest)?;
                extract_tgz(&local, staging.path())?;
                merge_tree(staging.path(), dest)?;
                fs::remove_file(&local)?;
            }
        }
        for patch in &self.patches {
            fetch_link(patch, dest)?;
        }
        Ok(())
    }
}

fn is_tarball(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Download or copy one link into `dest`, returning the landed path
fn fetch_link(link: &str, dest: &Path) -> Result<PathBuf> {
    let file_name = link
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::Download(format!("link '{link}' has no file name")))?;
    let target = dest.join(file_name);
    if Links::is_local(link) {
        debug!("Copying local source {}", link);
        fs::copy(link, &target)
            .map_err(|e| Error::Download(format!("cannot copy '{link}': {e}")))?;
    } else {
        download(link, &target)?;
    }
    Ok(target)
}

/// Stream a URL to a file through a temp-then-rename, with a progress bar
pub fn download(url: &str, dest: &Path) -> Result<()> {
    info!("Downloading {}", url);
    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::Download(format!("cannot build HTTP client: {e}")))?;
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Error::Download(format!("failed to fetch {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(Error::Download(format!(
            "failed to fetch {url}: HTTP {}",
            response.status()
        )));
    }

    let total = response.content_length().unwrap_or(0);
    let bar = if total > 0 {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(dest.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string());
        Some(bar)
    } else {
        None
    };

    let tmp = dest.with_extension("part");
    let mut file = File::create(&tmp)?;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];
    loop {
        let n = response
            .read(&mut buffer)
            .map_err(|e| Error::Download(format!("failed to read response: {e}")))?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
        if let Some(bar) = &bar {
            bar.inc(n as u64);
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    fs::rename(&tmp, dest)?;
    Ok(())
}

/// Unpack a gzip-compressed tarball into `dest`
pub fn extract_tgz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let decoder = GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    fs::create_dir_all(dest)?;
    tar.unpack(dest)?;
    Ok(())
}

/// Unpack an in-memory tarball into `dest`
pub fn extract_tgz_bytes(bytes: &[u8], dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(io::Cursor::new(bytes));
    let mut tar = tar::Archive::new(decoder);
    fs::create_dir_all(dest)?;
    tar.unpack(dest)?;
    Ok(())
}

/// Pack `src` into a gzip-compressed tarball whose entries live under
/// `top_level/`
pub fn pack_tgz(src: &Path, top_level: &str, out: &Path) -> Result<()> {
    let file = File::create(out)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(top_level, src)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Move the extracted tree into `dest`, flattening a single top-level
/// directory when the tarball has one
pub fn settle_extracted(staging: &Path, dest: &Path) -> Result<()> {
    let entries: Vec<_> = fs::read_dir(staging)?.collect::<io::Result<_>>()?;
    let source = if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        entries[0].path()
    } else {
        staging.to_path_buf()
    };
    merge_tree(&source, dest)
}

/// Move every entry of `src` into `dest`, falling back to copy+delete
/// when a rename crosses devices
fn merge_tree(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if fs::rename(entry.path(), &target).is_err() {
            if entry.file_type()?.is_dir() {
                copy_tree(&entry.path(), &target)?;
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::copy(entry.path(), &target)?;
                fs::remove_file(entry.path())?;
            }
        }
    }
    Ok(())
}

/// Recursively copy a file or directory tree
pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    if src.is_file() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dest)?;
        return Ok(());
    }
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Parse(format!("walk failed: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields children of its root");
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_extract_round_trip() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("lib")).unwrap();
        fs::write(src.path().join("lib/core.a"), b"object code").unwrap();
        fs::write(src.path().join("Makefile"), b"all:\n").unwrap();

        let work = tempfile::tempdir().unwrap();
        let tarball = work.path().join("pkg-1.0.tar.gz");
        pack_tgz(src.path(), "pkg-1.0", &tarball).unwrap();

        let extracted = work.path().join("out");
        extract_tgz(&tarball, &extracted).unwrap();
        assert_eq!(
            fs::read(extracted.join("pkg-1.0/lib/core.a")).unwrap(),
            b"object code"
        );
        assert_eq!(fs::read(extracted.join("pkg-1.0/Makefile")).unwrap(), b"all:\n");
    }

    #[test]
    fn test_settle_flattens_single_top_level_dir() {
        let staging = tempfile::tempdir().unwrap();
        fs::create_dir_all(staging.path().join("pkg-1.0/src")).unwrap();
        fs::write(staging.path().join("pkg-1.0/src/main.c"), b"int main;").unwrap();

        let dest = tempfile::tempdir().unwrap();
        settle_extracted(staging.path(), dest.path()).unwrap();
        assert!(dest.path().join("src/main.c").exists());
        assert!(!dest.path().join("pkg-1.0").exists());
    }

    #[test]
    fn test_materialize_local_links() {
        let sources = tempfile::tempdir().unwrap();
        let tree = tempfile::tempdir().unwrap();
        fs::write(tree.path().join("README"), b"hello").unwrap();
        let tarball = sources.path().join("pkg-1.0.tar.gz");
        pack_tgz(tree.path(), "pkg-1.0", &tarball).unwrap();
        let patch = sources.path().join("fix.patch");
        fs::write(&patch, b"--- a\n+++ b\n").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let links = Links {
            urls: vec![tarball.to_str().unwrap().to_string()],
            patches: vec![patch.to_str().unwrap().to_string()],
        };
        links.materialize(dest.path()).unwrap();

        assert!(dest.path().join("pkg-1.0/README").exists());
        assert!(dest.path().join("fix.patch").exists());
        assert!(!dest.path().join("pkg-1.0.tar.gz").exists());
    }

    #[test]
    fn test_is_local() {
        assert!(Links::is_local("patches/fix.patch"));
        assert!(Links::is_local("/abs/fix.patch"));
        assert!(!Links::is_local("https://example.org/fix.patch"));
    }

    #[test]
    fn test_copy_tree_single_file() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("one"), b"1").unwrap();
        let dest = tempfile::tempdir().unwrap();
        copy_tree(&src.path().join("one"), &dest.path().join("sub/one")).unwrap();
        assert_eq!(fs::read(dest.path().join("sub/one")).unwrap(), b"1");
    }
}
