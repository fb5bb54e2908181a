// src/error.rs

//! Error types for the quarry client.
//!
//! Library code returns `quarry::Result`; command handlers wrap these in
//! `anyhow` and print a one-line message before exiting non-zero.

use thiserror::Error;

/// Errors produced by the quarry library
#[derive(Debug, Error)]
pub enum Error {
    /// The client root has no config file; `quarry init` was never run
    #[error("no config file found, run 'quarry init <url>...' first")]
    ConfigMissing,

    /// `init` was invoked on an already initialized root
    #[error("client root is already initialized")]
    AlreadyInitialized,

    /// A git remote could not be cloned
    #[error("cannot clone git repository {0}")]
    UnknownGitRepo(String),

    /// A remote did not answer
    #[error("remote {0} is unreachable: {1}")]
    RemoteUnreachable(String, String),

    /// A package name could not be located in the index or installed set
    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    /// A user-supplied `name-version` string did not parse
    #[error("'{0}' is not a valid name-version string")]
    InvalidNVString(String),

    /// A build script exited non-zero
    #[error("build script failed with exit code {0}")]
    BuildFailed(i32),

    /// A `bin` source pattern resolved to zero or several files
    #[error("bin pattern '{0}' does not resolve to exactly one file")]
    InvalidBinPattern(String),

    /// A `bin` destination was not a simple program name
    #[error("'{0}' is not a valid program name")]
    InvalidProgramName(String),

    /// A spec mixes local and external patches; the publisher cannot
    /// synthesize an archive from that
    #[error("mixing local and external patches is not supported")]
    MixedPatchesUnsupported,

    /// No archive file, no source URLs: nothing to publish
    #[error("no location specified for {0}")]
    NoArchiveLocation(String),

    /// Remotes disagree on a package's key, or a server refused ours
    #[error("key mismatch for '{0}'")]
    KeyMismatch(String),

    /// The remote is already configured
    #[error("remote {0} is already configured")]
    DuplicateRemote(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed: {0}")]
    Download(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
