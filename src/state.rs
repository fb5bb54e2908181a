// src/state.rs

//! The persistent client root and its in-memory snapshot.
//!
//! Everything quarry knows lives under one root directory:
//!
//! - `config` - API version, compiler, ordered remote list
//! - `installed` - name -> version map, at most one version per name
//! - `index/` - one spec file per known release (and the clone of a
//!   git remote, when one is configured)
//! - `build/<name>-<version>/` - transient build trees
//! - `lib/<name>/`, `bin/` - installed artifacts
//! - `to_install/<name>-<version>` - install manifests
//! - `keys/<name>` - re-publication credentials
//!
//! The snapshot holds only the remote list and the root path; package
//! data is re-read from disk on demand. `installed` and `config` are
//! always rewritten through a temp-file-then-rename so a crash leaves
//! either the old or the new content, never a torn file.

use crate::error::{Error, Result};
use crate::remotes::RemoteUrl;
use crate::version::{Version, NV};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable selecting the client root
pub const ROOT_ENV: &str = "QUARRY_ROOT";

/// Root used when `QUARRY_ROOT` is unset
pub const DEFAULT_ROOT: &str = "/var/lib/quarry";

/// Config format version written by this client
pub const API_VERSION: u32 = 1;

const DEFAULT_COMPILER: &str = "system";

/// Process environment relevant to quarry: the root directory
#[derive(Debug, Clone)]
pub struct Environment {
    root: PathBuf,
}

impl Environment {
    /// Resolve the root from `QUARRY_ROOT`, falling back to the default
    pub fn from_env() -> Self {
        let root = env::var(ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROOT));
        Self { root }
    }

    /// An environment rooted at an explicit path
    pub fn at(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// On-disk shape of the config file
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    api_version: u32,
    compiler: String,
    remotes: Vec<String>,
}

/// In-memory state snapshot: remotes in configured order plus the root
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub remotes: Vec<RemoteUrl>,
    pub root: PathBuf,
    pub api_version: u32,
    pub compiler: String,
}

impl Snapshot {
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn installed_path(&self) -> PathBuf {
        self.root.join("installed")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn spec_path(&self, nv: &NV) -> PathBuf {
        self.index_dir().join(format!("{}.spec", nv.stem()))
    }

    pub fn build_dir(&self, nv: &NV) -> PathBuf {
        self.root.join("build").join(nv.stem())
    }

    pub fn lib_dir(&self, name: &str) -> PathBuf {
        self.root.join("lib").join(name)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn to_install_path(&self, nv: &NV) -> PathBuf {
        self.root.join("to_install").join(nv.stem())
    }

    pub fn key_path(&self, name: &str) -> PathBuf {
        self.root.join("keys").join(name)
    }

    /// Archive store of the in-process local mirror
    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }
}

/// Load the snapshot from an initialized root.
///
/// Performs no network I/O. Fails with `ConfigMissing` when the root was
/// never initialized.
pub fn load(env: &Environment) -> Result<Snapshot> {
    let config_path = env.root().join("config");
    let text = match fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ConfigMissing)
        }
        Err(e) => return Err(e.into()),
    };
    let config: ConfigFile = toml::from_str(&text)?;
    let remotes = config
        .remotes
        .iter()
        .map(|s| RemoteUrl::parse(s))
        .collect::<Result<Vec<_>>>()?;
    debug!("Loaded snapshot: {} remote(s)", remotes.len());
    Ok(Snapshot {
        remotes,
        root: env.root().to_path_buf(),
        api_version: config.api_version,
        compiler: config.compiler,
    })
}

/// Create and populate a fresh client root.
///
/// Fails with `AlreadyInitialized` when a config file exists. The caller
/// follows up with a repository update so the index is usable at once.
pub fn init(env: &Environment, urls: Vec<RemoteUrl>) -> Result<Snapshot> {
    let root = env.root();
    if root.join("config").exists() {
        return Err(Error::AlreadyInitialized);
    }
    for dir in ["index", "build", "lib", "bin", "to_install", "keys", "archives"] {
        fs::create_dir_all(root.join(dir))?;
    }
    let snapshot = Snapshot {
        remotes: urls,
        root: root.to_path_buf(),
        api_version: API_VERSION,
        compiler: DEFAULT_COMPILER.to_string(),
    };
    write_config(&snapshot)?;
    write_installed(&snapshot, &BTreeMap::new())?;
    info!("Initialized client root at {}", root.display());
    Ok(snapshot)
}

/// Rewrite the config file atomically from the snapshot
pub fn write_config(snapshot: &Snapshot) -> Result<()> {
    let config = ConfigFile {
        api_version: snapshot.api_version,
        compiler: snapshot.compiler.clone(),
        remotes: snapshot.remotes.iter().map(|r| r.to_string()).collect(),
    };
    let text = toml::to_string(&config)?;
    write_atomic(&snapshot.config_path(), text.as_bytes())
}

/// Read the installed map. A missing file is an empty map.
pub fn read_installed(snapshot: &Snapshot) -> Result<BTreeMap<String, Version>> {
    let text = match fs::read_to_string(snapshot.installed_path()) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    let raw: BTreeMap<String, String> =
        toml::from_str(&text).map_err(|e| Error::Parse(e.to_string()))?;
    raw.into_iter()
        .map(|(name, v)| Ok((name, Version::parse(&v)?)))
        .collect()
}

/// Rewrite the installed map atomically
pub fn write_installed(
    snapshot: &Snapshot,
    installed: &BTreeMap<String, Version>,
) -> Result<()> {
    let raw: BTreeMap<String, String> = installed
        .iter()
        .map(|(name, v)| (name.clone(), v.to_string()))
        .collect();
    let text = toml::to_string(&raw)?;
    write_atomic(&snapshot.installed_path(), text.as_bytes())
}

/// The version of `name` currently installed, if any
pub fn installed_version(snapshot: &Snapshot, name: &str) -> Result<Option<Version>> {
    Ok(read_installed(snapshot)?.get(name).cloned())
}

/// Every `(name, version)` with a spec under `index/`, sorted by name
/// then version
pub fn index_list(snapshot: &Snapshot) -> Result<Vec<NV>> {
    let mut out = Vec::new();
    let entries = match fs::read_dir(snapshot.index_dir()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".spec")) else {
            continue;
        };
        // index/ may also hold a git checkout; anything that does not
        // parse as name-version is not ours
        if let Ok(nv) = NV::parse(stem) {
            out.push(nv);
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    Ok(out)
}

/// Read the stored re-publication key for `name`
pub fn read_key(snapshot: &Snapshot, name: &str) -> Result<Option<String>> {
    match fs::read_to_string(snapshot.key_path(name)) {
        Ok(text) => Ok(Some(text.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Store a re-publication key; only called when none exists yet
pub fn write_key(snapshot: &Snapshot, name: &str, key: &str) -> Result<()> {
    fs::create_dir_all(snapshot.key_path(name).parent().unwrap())?;
    write_atomic(&snapshot.key_path(name), format!("{key}\n").as_bytes())
}

/// Write-temp-then-rename so readers see old or new content, never a mix
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = parent.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("quarry")
    ));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
