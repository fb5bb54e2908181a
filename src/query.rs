// src/query.rs

//! Read-only projections over the index and installed set: the package
//! listing, per-package details, substring search, and the compiler /
//! linker flag lines emitted by `quarry config`.

use crate::error::{Error, Result};
use crate::resolver;
use crate::solver;
use crate::spec::PackageSpec;
use crate::state::{self, Snapshot};
use crate::version::{Version, NV};
use std::collections::BTreeMap;

/// Marker shown in place of a version for packages not installed
const NOT_INSTALLED: &str = "--";

struct ListRow {
    name: String,
    version: Option<Version>,
    synopsis: String,
}

fn rows(snapshot: &Snapshot) -> Result<Vec<ListRow>> {
    let installed = state::read_installed(snapshot)?;
    let mut by_name: BTreeMap<String, Vec<NV>> = BTreeMap::new();
    for nv in state::index_list(snapshot)? {
        by_name.entry(nv.name.clone()).or_default().push(nv);
    }

    let mut out = Vec::new();
    for (name, versions) in by_name {
        let installed_version = installed.get(&name).cloned();
        // describe the installed release when there is one, else the
        // first one seen
        let shown = installed_version
            .as_ref()
            .and_then(|v| versions.iter().find(|nv| nv.version == *v))
            .or_else(|| versions.first())
            .expect("every listed name has at least one version");
        let spec = PackageSpec::read(&snapshot.spec_path(shown))?;
        out.push(ListRow {
            name,
            version: installed_version,
            synopsis: spec.synopsis().to_string(),
        });
    }
    Ok(out)
}

fn format_rows(rows: &[ListRow]) -> String {
    let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    let version_width = rows
        .iter()
        .filter_map(|r| r.version.as_ref().map(|v| v.to_string().len()))
        .max()
        .unwrap_or(0)
        .max(NOT_INSTALLED.len());

    let mut out = String::new();
    for row in rows {
        let version = row
            .version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| NOT_INSTALLED.to_string());
        out.push_str(&format!(
            "{:>name_width$}  {:<version_width$}  {}\n",
            row.name, version, row.synopsis,
        ));
    }
    out
}

/// The `list` projection: every known name, its installed version (or a
/// marker), and the first description line
pub fn list(snapshot: &Snapshot) -> Result<String> {
    Ok(format_rows(&rows(snapshot)?))
}

/// The `search` projection: list rows whose name or synopsis contains
/// the pattern, case-insensitively
pub fn search(snapshot: &Snapshot, pattern: &str) -> Result<String> {
    let needle = pattern.to_lowercase();
    let matching: Vec<ListRow> = rows(snapshot)?
        .into_iter()
        .filter(|r| {
            r.name.to_lowercase().contains(&needle)
                || r.synopsis.to_lowercase().contains(&needle)
        })
        .collect();
    Ok(format_rows(&matching))
}

/// The `info` projection for one package
pub fn info(snapshot: &Snapshot, name: &str) -> Result<String> {
    let versions: Vec<NV> = state::index_list(snapshot)?
        .into_iter()
        .filter(|nv| nv.name == name)
        .collect();
    if versions.is_empty() {
        return Err(Error::UnknownPackage(name.to_string()));
    }
    let installed = state::installed_version(snapshot, name)?;

    let others: Vec<String> = versions
        .iter()
        .filter(|nv| installed.as_ref() != Some(&nv.version))
        .map(|nv| nv.version.to_string())
        .collect();

    // description of the installed release, else of the highest known
    let described = installed
        .as_ref()
        .and_then(|v| versions.iter().find(|nv| nv.version == *v))
        .or_else(|| versions.last())
        .expect("versions is non-empty");
    let spec = PackageSpec::read(&snapshot.spec_path(described))?;

    let mut out = String::new();
    out.push_str(&format!("package:            {name}\n"));
    out.push_str(&format!(
        "installed-version:  {}\n",
        installed.map(|v| v.to_string()).unwrap_or_else(|| NOT_INSTALLED.to_string())
    ));
    out.push_str(&format!("other-versions:     {}\n", others.join(" ")));
    out.push_str(&format!("description:        {}\n", spec.package.description.trim_end()));
    Ok(out)
}

/// What `quarry config` emits per package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// `-I <lib dir>`
    Include,
    /// `-I <lib dir> <link options> <lib>.cma ...`
    Bytelink,
    /// `-I <lib dir> <link options> <lib>.cmxa ...`
    Asmlink,
}

/// Space-separated flag line over the requested packages.
///
/// In recursive mode the target set grows to everything the requested
/// packages depend on, dependencies first, so the emitted link line is
/// usable as-is.
pub fn config(
    snapshot: &Snapshot,
    recursive: bool,
    mode: ConfigMode,
    names: &[String],
) -> Result<String> {
    let installed = state::read_installed(snapshot)?;
    for name in names {
        if !installed.contains_key(name) {
            return Err(Error::UnknownPackage(name.clone()));
        }
    }

    let targets: Vec<String> = if recursive {
        let universe = resolver::universe(snapshot)?;
        solver::dependency_closure(&universe, names)
    } else {
        names.to_vec()
    };

    let mut tokens: Vec<String> = Vec::new();
    for name in &targets {
        let version = installed
            .get(name)
            .ok_or_else(|| Error::UnknownPackage(name.clone()))?;
        let nv = NV::new(name, version.clone());
        let spec = PackageSpec::read(&snapshot.spec_path(&nv))?;
        let lib_dir = snapshot.lib_dir(name);

        tokens.push("-I".to_string());
        tokens.push(lib_dir.display().to_string());
        if mode == ConfigMode::Include {
            continue;
        }
        // bytecode and native linking share the spec's link options
        if !spec.config.link_options.is_empty() {
            tokens.push(spec.config.link_options.clone());
        }
        let extension = match mode {
            ConfigMode::Bytelink => "cma",
            ConfigMode::Asmlink => "cmxa",
            ConfigMode::Include => unreachable!(),
        };
        for library in &spec.config.libraries {
            tokens.push(format!("{library}.{extension}"));
        }
    }
    Ok(tokens.join(" "))
}
