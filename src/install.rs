// src/install.rs

//! Placing built artifacts into the tree, and taking them out again.
//!
//! The install manifest names three kinds of movement out of a build
//! tree: `lib` entries land under `lib/<name>/`, `bin` entries become
//! programs in `bin/`, and `misc` entries copy to absolute destinations
//! outside the root, each confirmed interactively. Removal is the exact
//! inverse, driven by the same manifest.

use crate::archive::copy_tree;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::spec::InstallManifest;
use crate::state::Snapshot;
use crate::version::NV;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Apply a manifest: copy artifacts from the build tree into the root
pub fn install_artifacts(
    snapshot: &Snapshot,
    nv: &NV,
    manifest: &InstallManifest,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let build = snapshot.build_dir(nv);

    let lib_dest = snapshot.lib_dir(&nv.name);
    fs::create_dir_all(&lib_dest)?;
    for pattern in &manifest.lib {
        let matches = expand_pattern(&build, pattern)?;
        if matches.is_empty() {
            return Err(Error::Parse(format!(
                "install pattern '{pattern}' matched nothing in the build tree"
            )));
        }
        for path in matches {
            let file_name = path
                .file_name()
                .ok_or_else(|| Error::Parse(format!("bad install path '{pattern}'")))?;
            copy_tree(&path, &lib_dest.join(file_name))?;
        }
    }

    fs::create_dir_all(snapshot.bin_dir())?;
    for (src, program) in &manifest.bin {
        let matches = expand_pattern(&build, src)?;
        let source = match matches.as_slice() {
            [single] if single.is_file() => single,
            _ => return Err(Error::InvalidBinPattern(src.clone())),
        };
        if !valid_program_name(program) {
            return Err(Error::InvalidProgramName(program.clone()));
        }
        let dest = snapshot.bin_dir().join(program);
        fs::copy(source, &dest)?;
        make_executable(&dest)?;
        debug!("Installed program {}", program);
    }

    for (src, dest) in &manifest.misc {
        println!("Copy {src} => {dest}.");
        if prompter.confirm("Continue ?")? {
            copy_tree(&build.join(src), Path::new(dest))?;
        }
    }

    info!("Installed {}", nv);
    Ok(())
}

/// Undo a manifest: remove the artifacts a previous install placed
pub fn remove_artifacts(
    snapshot: &Snapshot,
    nv: &NV,
    manifest: &InstallManifest,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let lib_dest = snapshot.lib_dir(&nv.name);
    if lib_dest.exists() {
        fs::remove_dir_all(&lib_dest)?;
    }

    for (_, program) in &manifest.bin {
        let path = snapshot.bin_dir().join(program);
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }

    for (_, dest) in &manifest.misc {
        let question =
            format!("The complete directory '{dest}' will be removed. Continue ?");
        if prompter.confirm(&question)? {
            let path = Path::new(dest);
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else if path.is_file() {
                fs::remove_file(path)?;
            }
        }
    }

    info!("Removed {}", nv);
    Ok(())
}

/// A program name is a bare file name, no separators, no dot-dot
fn valid_program_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

/// Resolve a manifest path pattern against the build tree. The last
/// path component may hold one `*` matching any run of characters.
fn expand_pattern(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let (dir_part, last) = match pattern.rsplit_once('/') {
        Some((dir, last)) => (base.join(dir), last),
        None => (base.to_path_buf(), pattern),
    };
    let Some((prefix, suffix)) = last.split_once('*') else {
        let path = base.join(pattern);
        return Ok(if path.exists() { vec![path] } else { Vec::new() });
    };
    if suffix.contains('*') {
        return Err(Error::InvalidBinPattern(pattern.to_string()));
    }
    let mut matches = Vec::new();
    let entries = match fs::read_dir(&dir_part) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(matches),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(prefix)
            && name.ends_with(suffix)
            && name.len() >= prefix.len() + suffix.len()
        {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
