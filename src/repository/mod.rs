// src/repository/mod.rs

//! Remote package servers.
//!
//! Every remote, whatever its transport, answers the same narrow
//! contract: list releases, hand out specs and archives, accept
//! (re-)publications. Plain remotes speak it over HTTP, git remotes
//! derive it from a local checkout, and the local mirror answers it
//! in-process straight from the client root.

mod git;
mod http;
mod local;
pub mod sync;

pub use git::GitRemote;
pub use http::HttpRemote;
pub use local::LocalMirror;
pub use sync::{update, UpdateReport};

use crate::error::Result;
use crate::remotes::{RemoteUrl, Scheme};
use crate::state::Snapshot;
use crate::version::NV;

/// The server contract every remote backend implements
pub trait RemoteServer {
    /// Human-readable address for messages
    fn address(&self) -> String;

    /// All releases this remote knows about
    fn list(&self) -> Result<Vec<NV>>;

    /// The spec for one release
    fn get_spec(&self, nv: &NV) -> Result<Vec<u8>>;

    /// The source archive for one release, when the remote has one
    fn get_archive(&self, nv: &NV) -> Result<Option<Vec<u8>>>;

    /// First publication; returns the key granting future updates
    fn new_archive(
        &self,
        nv: &NV,
        spec: &[u8],
        archive: Option<&[u8]>,
    ) -> Result<Option<String>>;

    /// Re-publication under an existing key
    fn update_archive(
        &self,
        nv: &NV,
        spec: &[u8],
        archive: Option<&[u8]>,
        key: &str,
    ) -> Result<()>;
}

/// Pick the backend matching the remote's scheme
pub fn connect(snapshot: &Snapshot, url: &RemoteUrl) -> Box<dyn RemoteServer> {
    match url.scheme {
        Scheme::Quarry => Box::new(HttpRemote::new(url.clone())),
        Scheme::Git => Box::new(GitRemote::new(url.clone(), snapshot.index_dir())),
    }
}
