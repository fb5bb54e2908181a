// src/repository/http.rs

//! HTTP backend for plain quarry remotes.
//!
//! The wire protocol is small: a JSON package listing, GET endpoints
//! for specs and archives, and POST/PUT publication endpoints carrying
//! base64 payloads.

use super::RemoteServer;
use crate::error::{Error, Result};
use crate::remotes::RemoteUrl;
use crate::version::{Version, NV};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Timeout for metadata requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ListedPackage {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    spec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<&'a str>,
}

#[derive(Deserialize)]
struct PublishResponse {
    key: Option<String>,
}

/// A plain remote spoken to over HTTP
pub struct HttpRemote {
    url: RemoteUrl,
    base: String,
    client: Client,
}

impl HttpRemote {
    pub fn new(url: RemoteUrl) -> Self {
        let base = url.http_base();
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { url, base, client }
    }

    fn unreachable(&self, e: impl std::fmt::Display) -> Error {
        Error::RemoteUnreachable(self.url.to_string(), e.to_string())
    }
}

impl RemoteServer for HttpRemote {
    fn address(&self) -> String {
        self.url.to_string()
    }

    fn list(&self) -> Result<Vec<NV>> {
        let url = format!("{}/packages", self.base);
        debug!("GET {}", url);
        let listed: Vec<ListedPackage> = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.unreachable(e))?
            .error_for_status()
            .map_err(|e| self.unreachable(e))?
            .json()
            .map_err(|e| Error::Parse(format!("bad package listing from {}: {e}", self.url)))?;
        listed
            .into_iter()
            .map(|p| {
                Ok(NV {
                    name: p.name,
                    version: Version::parse(&p.version)?,
                })
            })
            .collect()
    }

    fn get_spec(&self, nv: &NV) -> Result<Vec<u8>> {
        let url = format!("{}/specs/{}.spec", self.base, nv.stem());
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.unreachable(e))?
            .error_for_status()
            .map_err(|e| Error::Download(format!("failed to fetch spec for {nv}: {e}")))?;
        let bytes = response
            .bytes()
            .map_err(|e| Error::Download(format!("failed to read spec for {nv}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn get_archive(&self, nv: &NV) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/archives/{}.tar.gz", self.base, nv.stem());
        debug!("GET {}", url);
        let response = self.client.get(&url).send().map_err(|e| self.unreachable(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| Error::Download(format!("failed to fetch archive for {nv}: {e}")))?;
        let bytes = response
            .bytes()
            .map_err(|e| Error::Download(format!("failed to read archive for {nv}: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }

    fn new_archive(
        &self,
        nv: &NV,
        spec: &[u8],
        archive: Option<&[u8]>,
    ) -> Result<Option<String>> {
        let url = format!("{}/packages/{}", self.base, nv.stem());
        let body = PublishRequest {
            spec: BASE64.encode(spec),
            archive: archive.map(|a| BASE64.encode(a)),
            key: None,
        };
        let response: PublishResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.unreachable(e))?
            .error_for_status()
            .map_err(|e| Error::Download(format!("{} refused {nv}: {e}", self.url)))?
            .json()
            .map_err(|e| Error::Parse(format!("bad publish response from {}: {e}", self.url)))?;
        Ok(response.key)
    }

    fn update_archive(
        &self,
        nv: &NV,
        spec: &[u8],
        archive: Option<&[u8]>,
        key: &str,
    ) -> Result<()> {
        let url = format!("{}/packages/{}", self.base, nv.stem());
        let body = PublishRequest {
            spec: BASE64.encode(spec),
            archive: archive.map(|a| BASE64.encode(a)),
            key: Some(key),
        };
        self.client
            .put(&url)
            .json(&body)
            .send()
            .map_err(|e| self.unreachable(e))?
            .error_for_status()
            .map_err(|e| Error::Download(format!("{} refused update of {nv}: {e}", self.url)))?;
        Ok(())
    }
}
