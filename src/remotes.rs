// src/remotes.rs

//! Remote registry: the ordered list of package index servers.
//!
//! A remote is either a plain quarry index server (spoken to over HTTP)
//! or a git repository holding spec files. Git remotes added over an
//! HTTP transport are stored with a `git+` scheme prefix so the kind
//! survives a config round-trip.

use crate::error::{Error, Result};
use crate::state::{self, Snapshot};
use std::fmt;
use tracing::info;

/// The protocol a remote speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Quarry,
    Git,
}

/// A configured remote: scheme, hostname, optional port, optional path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub scheme: Scheme,
    transport: String,
    pub host: String,
    pub port: Option<u16>,
    path: String,
}

impl RemoteUrl {
    /// Parse a remote URL string. `scheme://` is optional and defaults
    /// to `quarry`; `git://` and `git+<transport>://` mark git remotes.
    pub fn parse(s: &str) -> Result<Self> {
        let (transport, rest) = match s.split_once("://") {
            Some((t, rest)) => (t.to_string(), rest),
            None => ("quarry".to_string(), s),
        };
        let scheme = if transport == "git" || transport.starts_with("git+") {
            Scheme::Git
        } else {
            Scheme::Quarry
        };
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], rest[i..].to_string()),
            None => (rest, String::new()),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port = p.parse::<u16>().map_err(|_| {
                    Error::Parse(format!("invalid port in remote URL '{s}'"))
                })?;
                (h.to_string(), Some(port))
            }
            None => (authority.to_string(), None),
        };
        // file-style URLs carry no authority, only a path
        if host.is_empty() && path.is_empty() {
            return Err(Error::Parse(format!("no hostname in remote URL '{s}'")));
        }
        Ok(Self { scheme, transport, host, port, path })
    }

    /// Parse a URL and force the git scheme (the `remote add-git` path)
    pub fn parse_git(s: &str) -> Result<Self> {
        let mut url = Self::parse(s)?;
        if url.scheme != Scheme::Git {
            url.transport = format!("git+{}", url.transport.replace("quarry", "http"));
            url.scheme = Scheme::Git;
        }
        Ok(url)
    }

    /// The address handed to `git clone`, with any `git+` marker removed
    pub fn git_address(&self) -> String {
        let transport = self.transport.strip_prefix("git+").unwrap_or(&self.transport);
        let mut out = format!("{}://{}", transport, self.host);
        if let Some(port) = self.port {
            out.push_str(&format!(":{port}"));
        }
        out.push_str(&self.path);
        out
    }

    /// The HTTP base URL of a plain remote
    pub fn http_base(&self) -> String {
        let transport = if self.transport == "quarry" { "http" } else { &self.transport };
        let mut out = format!("{}://{}", transport, self.host);
        if let Some(port) = self.port {
            out.push_str(&format!(":{port}"));
        }
        out.push_str(&self.path);
        out
    }

    /// Removal matching: the rendered form equals `s`, or the hostname does
    pub fn matches(&self, s: &str) -> bool {
        self.to_string() == s || self.host == s
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)
    }
}

/// Render the configured remotes, one per line, git remotes first-class
pub fn render_list(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for remote in &snapshot.remotes {
        let prefix = match remote.scheme {
            Scheme::Git => "git    ",
            Scheme::Quarry => "QUARRY ",
        };
        out.push_str(prefix);
        out.push_str(&remote.to_string());
        out.push('\n');
    }
    out
}

/// Prepend a remote to the configured list and rewrite the config.
///
/// A remote equal in rendered form or hostname to an existing one is
/// rejected as a duplicate.
pub fn add(snapshot: &mut Snapshot, url: RemoteUrl) -> Result<()> {
    if snapshot.remotes.iter().any(|r| r.matches(&url.to_string()) || r.host == url.host) {
        return Err(Error::DuplicateRemote(url.to_string()));
    }
    info!("Adding remote {}", url);
    snapshot.remotes.insert(0, url);
    state::write_config(snapshot)
}

/// Remove every remote whose rendered URL or hostname equals `s`.
///
/// Matching nothing is not an error.
pub fn remove(snapshot: &mut Snapshot, s: &str) -> Result<()> {
    let before = snapshot.remotes.len();
    snapshot.remotes.retain(|r| !r.matches(s));
    if snapshot.remotes.len() != before {
        info!("Removed {} remote(s) matching {}", before - snapshot.remotes.len(), s);
    }
    state::write_config(snapshot)
}
