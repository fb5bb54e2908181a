// src/version.rs

//! Package identity and version ordering.
//!
//! A package release is identified by an `NV` pair. Ordinary release
//! versions are compared segment-wise (numeric segments numerically,
//! alphabetic segments lexically), so `1.10` sorts after `1.9`. Packages
//! tracked from a git remote carry the sentinel `Head` version instead of
//! a release tag; its sub-state records whether the local checkout is
//! known to be current.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// Sub-state of a git-tracked `Head` version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadState {
    UpToDate,
    Behind,
    Unknown,
}

/// A package version: a release tag or the git `Head` sentinel
#[derive(Debug, Clone)]
pub enum Version {
    Release(ReleaseVersion),
    Head(HeadState),
}

impl Version {
    /// Parse a rendered version string.
    ///
    /// `head`, `head~behind` and `head~unknown` produce the `Head`
    /// sentinel; anything else is an ordinary release version.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Parse("empty version string".to_string()));
        }
        Ok(match s {
            "head" => Version::Head(HeadState::UpToDate),
            "head~behind" => Version::Head(HeadState::Behind),
            "head~unknown" => Version::Head(HeadState::Unknown),
            other => Version::Release(ReleaseVersion::new(other)),
        })
    }

    pub fn is_head(&self) -> bool {
        matches!(self, Version::Head(_))
    }

    pub fn head_state(&self) -> Option<HeadState> {
        match self {
            Version::Head(state) => Some(*state),
            Version::Release(_) => None,
        }
    }

    /// Same version with the given head sub-state; release versions are
    /// returned unchanged.
    pub fn with_head_state(&self, state: HeadState) -> Version {
        match self {
            Version::Head(_) => Version::Head(state),
            release => release.clone(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Release(v) => write!(f, "{v}"),
            Version::Head(HeadState::UpToDate) => write!(f, "head"),
            Version::Head(HeadState::Behind) => write!(f, "head~behind"),
            Version::Head(HeadState::Unknown) => write!(f, "head~unknown"),
        }
    }
}

// Head compares equal to Head regardless of sub-state: the sub-state is
// bookkeeping about freshness, not part of the package identity.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Version::Release(a), Version::Release(b)) => a == b,
            (Version::Head(_), Version::Head(_)) => true,
            _ => false,
        }
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Release(a), Version::Release(b)) => a.cmp(b),
            // Head tracks the newest sources, so it sorts above any tag
            (Version::Head(_), Version::Head(_)) => Ordering::Equal,
            (Version::Head(_), Version::Release(_)) => Ordering::Greater,
            (Version::Release(_), Version::Head(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Version::Release(v) => v.raw.hash(state),
            Version::Head(_) => "head".hash(state),
        }
    }
}

/// An ordinary release version string with segment-wise ordering
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    raw: String,
}

impl ReleaseVersion {
    pub fn new(s: &str) -> Self {
        Self { raw: s.to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Split into runs of digits and runs of letters; every other
    /// character only separates segments
    fn segments(&self) -> Vec<Segment<'_>> {
        let mut out = Vec::new();
        let mut rest = self.raw.as_str();
        loop {
            let Some(start) = rest.find(|c: char| c.is_ascii_alphanumeric()) else {
                break;
            };
            rest = &rest[start..];
            let numeric = rest.starts_with(|c: char| c.is_ascii_digit());
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric() || c.is_ascii_digit() != numeric)
                .unwrap_or(rest.len());
            let (seg, tail) = rest.split_at(end);
            out.push(if numeric {
                // Digit runs longer than u64 fall back to string ordering
                match seg.parse::<u64>() {
                    Ok(n) => Segment::Number(n),
                    Err(_) => Segment::Text(seg),
                }
            } else {
                Segment::Text(seg)
            });
            rest = tail;
        }
        out
    }
}

#[derive(PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.segments(), other.segments());
        for pair in a.iter().zip(b.iter()) {
            let ord = match pair {
                (Segment::Number(x), Segment::Number(y)) => x.cmp(y),
                (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
                // A numeric segment sorts after a textual one
                (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
                (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        // A trailing textual segment marks a pre-release ("1.0-rc1"),
        // a trailing numeric one a deeper release ("1.0.1")
        match a.len().cmp(&b.len()) {
            Ordering::Equal => Ordering::Equal,
            Ordering::Less => match b.get(a.len()) {
                Some(Segment::Text(_)) => Ordering::Greater,
                _ => Ordering::Less,
            },
            Ordering::Greater => match a.get(b.len()) {
                Some(Segment::Text(_)) => Ordering::Less,
                _ => Ordering::Greater,
            },
        }
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A `(name, version)` pair identifying one package release
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NV {
    pub name: String,
    pub version: Version,
}

impl NV {
    pub fn new(name: &str, version: Version) -> Self {
        Self { name: name.to_string(), version }
    }

    /// Parse a `name-version` string. Names never contain `-`, so the
    /// first dash separates the two halves.
    pub fn parse(s: &str) -> Result<Self> {
        let (name, version) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidNVString(s.to_string()))?;
        if name.is_empty() || version.is_empty() {
            return Err(Error::InvalidNVString(s.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            version: Version::parse(version)?,
        })
    }

    /// The `name-version` file stem used for spec files, build trees and
    /// install manifests. Head sub-state never leaks into file names.
    pub fn stem(&self) -> String {
        match &self.version {
            Version::Head(_) => format!("{}-head", self.name),
            Version::Release(v) => format!("{}-{}", self.name, v),
        }
    }
}

impl fmt::Display for NV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Comparison operators allowed in dependency constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    Ge,
}

/// A version constraint attached to a dependency or an install wish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub version: ReleaseVersion,
}

impl Constraint {
    pub fn eq(version: ReleaseVersion) -> Self {
        Self { op: ConstraintOp::Eq, version }
    }

    pub fn satisfied_by(&self, candidate: &Version) -> bool {
        match candidate {
            // Head satisfies any constraint: it is the newest source state
            Version::Head(_) => true,
            Version::Release(v) => match self.op {
                ConstraintOp::Eq => *v == self.version,
                ConstraintOp::Ge => *v >= self.version,
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            ConstraintOp::Eq => "=",
            ConstraintOp::Ge => ">=",
        };
        write!(f, "{} {}", op, self.version)
    }
}

/// A dependency on another package, optionally version-constrained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<Constraint>,
}

impl Dependency {
    /// Parse a `depends` entry: `"name"`, `"name = 1.2"`, `"name >= 1.2"`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| Error::Parse(format!("empty dependency in '{s}'")))?;
        let constraint = match (parts.next(), parts.next()) {
            (None, _) => None,
            (Some(op), Some(version)) => {
                let op = match op {
                    "=" => ConstraintOp::Eq,
                    ">=" => ConstraintOp::Ge,
                    other => {
                        return Err(Error::Parse(format!(
                            "unknown constraint operator '{other}' in '{s}'"
                        )))
                    }
                };
                Some(Constraint { op, version: ReleaseVersion::new(version) })
            }
            (Some(_), None) => {
                return Err(Error::Parse(format!("truncated constraint in '{s}'")))
            }
        };
        if parts.next().is_some() {
            return Err(Error::Parse(format!("trailing tokens in dependency '{s}'")));
        }
        Ok(Self { name: name.to_string(), constraint })
    }
}
