// src/spec.rs

//! Package spec and install-manifest files.
//!
//! A spec is the declarative description of one package release. Specs
//! live under `index/` as `<name>-<version>.spec` and are TOML:
//!
//! ```toml
//! [package]
//! name = "corelib"
//! version = "1.2"
//! description = "Core support library"
//! depends = ["base", "tools >= 0.9"]
//!
//! [source]
//! urls = ["https://downloads.example.org/corelib-1.2.tar.gz"]
//! patches = ["fix-linking.patch"]
//!
//! [build]
//! script = ["./configure", "make"]
//!
//! [install]
//! lib = ["lib/*"]
//! bin = [["src/corelib-tool", "corelib-tool"]]
//! misc = [["docs", "/usr/share/doc/corelib"]]
//!
//! [config]
//! libraries = ["corelib"]
//! link_options = "-lm"
//! ```
//!
//! The `[install]` section doubles as the `to_install` manifest written
//! next to a successful build and consumed by the installer and remover.

use crate::error::{Error, Result};
use crate::version::{Dependency, Version, NV};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A parsed package spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    pub package: PackageSection,

    #[serde(default)]
    pub source: SourceSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub install: InstallManifest,

    #[serde(default)]
    pub config: ConfigSection,
}

/// Identity, description and dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub depends: Vec<String>,
}

/// Where the sources come from when no remote serves an archive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub patches: Vec<String>,
}

/// Shell commands run in the build tree, in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub script: Vec<String>,
}

/// File movements applied on install, reversed on removal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallManifest {
    /// Paths (relative to the build tree, `*` globs allowed) copied
    /// under `lib/<name>/`
    #[serde(default)]
    pub lib: Vec<String>,

    /// `(source, program name)` pairs copied into `bin/`
    #[serde(default)]
    pub bin: Vec<(String, String)>,

    /// `(source, absolute destination)` pairs, each confirmed interactively
    #[serde(default)]
    pub misc: Vec<(String, String)>,
}

/// Compiler and linker projections for the `config` query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub libraries: Vec<String>,

    #[serde(default)]
    pub link_options: String,
}

impl PackageSpec {
    pub fn parse(text: &str) -> Result<Self> {
        let spec: PackageSpec = toml::from_str(text)?;
        if spec.package.name.is_empty() {
            return Err(Error::Parse("spec has an empty package name".to_string()));
        }
        if spec.package.name.contains('-') {
            return Err(Error::Parse(format!(
                "package name '{}' contains a version separator",
                spec.package.name
            )));
        }
        Ok(spec)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// The `(name, version)` identity declared by this spec
    pub fn nv(&self) -> Result<NV> {
        Ok(NV {
            name: self.package.name.clone(),
            version: Version::parse(&self.package.version)?,
        })
    }

    /// Parsed dependency list
    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        self.package.depends.iter().map(|d| Dependency::parse(d)).collect()
    }

    /// First line of the description, for list output
    pub fn synopsis(&self) -> &str {
        self.package.description.lines().next().unwrap_or("")
    }
}

impl InstallManifest {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{HeadState, ReleaseVersion};

    const SAMPLE: &str = r#"
[package]
name = "corelib"
version = "1.2"
description = """
Core support library
with a longer second line
"""
depends = ["base", "tools >= 0.9"]

[source]
urls = ["https://downloads.example.org/corelib-1.2.tar.gz"]

[build]
script = ["make"]

[install]
lib = ["lib/*"]
bin = [["src/corelib-tool", "corelib-tool"]]

[config]
libraries = ["corelib"]
link_options = "-lm"
"#;

    #[test]
    fn test_parse_full_spec() {
        let spec = PackageSpec::parse(SAMPLE).unwrap();
        assert_eq!(spec.package.name, "corelib");
        assert_eq!(
            spec.nv().unwrap(),
            NV::new("corelib", Version::Release(ReleaseVersion::new("1.2")))
        );
        assert_eq!(spec.synopsis(), "Core support library");
        assert_eq!(spec.source.urls.len(), 1);
        assert_eq!(spec.install.bin[0].1, "corelib-tool");

        let deps = spec.dependencies().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "base");
        assert!(deps[1].constraint.is_some());
    }

    #[test]
    fn test_minimal_spec() {
        let spec = PackageSpec::parse(
            "[package]\nname = \"tiny\"\nversion = \"0.1\"\n",
        )
        .unwrap();
        assert!(spec.source.urls.is_empty());
        assert!(spec.build.script.is_empty());
        assert_eq!(spec.synopsis(), "");
    }

    #[test]
    fn test_head_version_spec() {
        let spec = PackageSpec::parse(
            "[package]\nname = \"tracker\"\nversion = \"head\"\n",
        )
        .unwrap();
        assert_eq!(spec.nv().unwrap().version.head_state(), Some(HeadState::UpToDate));
    }

    #[test]
    fn test_rejects_dashed_name() {
        let err = PackageSpec::parse("[package]\nname = \"a-b\"\nversion = \"1\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_spec_round_trip() {
        let spec = PackageSpec::parse(SAMPLE).unwrap();
        let rendered = spec.to_toml().unwrap();
        let reparsed = PackageSpec::parse(&rendered).unwrap();
        assert_eq!(reparsed.package.name, spec.package.name);
        assert_eq!(reparsed.install.lib, spec.install.lib);
        assert_eq!(reparsed.config.link_options, spec.config.link_options);
    }

    #[test]
    fn test_manifest_round_trip() {
        let manifest = InstallManifest {
            lib: vec!["lib/*".to_string()],
            bin: vec![("src/t".to_string(), "t".to_string())],
            misc: vec![("docs".to_string(), "/usr/share/doc/t".to_string())],
        };
        let rendered = manifest.to_toml().unwrap();
        let reparsed: InstallManifest = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.bin, manifest.bin);
        assert_eq!(reparsed.misc, manifest.misc);
    }
}
