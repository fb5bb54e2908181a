// src/repository/local.rs

//! The in-process local mirror.
//!
//! Every publication also lands in the publishing client's own root, so
//! a freshly uploaded package is immediately installable without a
//! round-trip through a remote. The mirror answers the same contract as
//! a network server: specs live in `index/`, archives under `archives/`,
//! and keys under `keys/`.

use super::RemoteServer;
use crate::error::{Error, Result};
use crate::state::{self, Snapshot};
use crate::version::NV;
use sha2::{Digest, Sha256};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub struct LocalMirror {
    snapshot: Snapshot,
}

impl LocalMirror {
    pub fn new(snapshot: &Snapshot) -> Self {
        Self { snapshot: snapshot.clone() }
    }

    fn archive_path(&self, nv: &NV) -> std::path::PathBuf {
        self.snapshot.archives_dir().join(format!("{}.tar.gz", nv.stem()))
    }

    fn store(&self, nv: &NV, spec: &[u8], archive: Option<&[u8]>) -> Result<()> {
        state::write_atomic(&self.snapshot.spec_path(nv), spec)?;
        if let Some(archive) = archive {
            state::write_atomic(&self.archive_path(nv), archive)?;
        }
        Ok(())
    }

    fn mint_key(&self, nv: &NV) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let mut hasher = Sha256::new();
        hasher.update(nv.name.as_bytes());
        hasher.update(nv.version.to_string().as_bytes());
        hasher.update(nanos.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

impl RemoteServer for LocalMirror {
    fn address(&self) -> String {
        format!("local mirror at {}", self.snapshot.root.display())
    }

    fn list(&self) -> Result<Vec<NV>> {
        state::index_list(&self.snapshot)
    }

    fn get_spec(&self, nv: &NV) -> Result<Vec<u8>> {
        Ok(fs::read(self.snapshot.spec_path(nv))?)
    }

    fn get_archive(&self, nv: &NV) -> Result<Option<Vec<u8>>> {
        match fs::read(self.archive_path(nv)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn new_archive(
        &self,
        nv: &NV,
        spec: &[u8],
        archive: Option<&[u8]>,
    ) -> Result<Option<String>> {
        self.store(nv, spec, archive)?;
        let key = self.mint_key(nv);
        state::write_key(&self.snapshot, &nv.name, &key)?;
        debug!("Local mirror accepted {} with a fresh key", nv);
        Ok(Some(key))
    }

    fn update_archive(
        &self,
        nv: &NV,
        spec: &[u8],
        archive: Option<&[u8]>,
        key: &str,
    ) -> Result<()> {
        match state::read_key(&self.snapshot, &nv.name)? {
            Some(stored) if stored == key => {
                self.store(nv, spec, archive)?;
                debug!("Local mirror updated {}", nv);
                Ok(())
            }
            _ => Err(Error::KeyMismatch(nv.name.clone())),
        }
    }
}
