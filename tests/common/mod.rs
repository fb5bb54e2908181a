// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Provides a fresh client root, spec/tarball builders, and a tiny
//! in-process HTTP server answering the remote contract so the real
//! network code paths run against real sockets.

#![allow(dead_code)]

use quarry::{archive, state, Environment, RemoteUrl, Snapshot, NV};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tempfile::TempDir;

/// Create an initialized client root with the given remotes.
///
/// Returns (TempDir, snapshot) - keep the TempDir alive to prevent cleanup.
pub fn setup_root(remotes: Vec<RemoteUrl>) -> (TempDir, Snapshot) {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = state::init(&Environment::at(dir.path()), remotes).unwrap();
    (dir, snapshot)
}

/// Render a spec for a package whose build writes `out/<name>.lib` and a
/// `<name>-tool` program, both named by the install manifest
pub fn buildable_spec(name: &str, version: &str, depends: &[&str]) -> String {
    let depends = depends
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"[package]
name = "{name}"
version = "{version}"
description = "Test package {name}"
depends = [{depends}]

[build]
script = [
    "mkdir -p out",
    "printf lib > out/{name}.lib",
    "printf '#!/bin/sh\n' > {name}-tool",
]

[install]
lib = ["out/*"]
bin = [["{name}-tool", "{name}-tool"]]

[config]
libraries = ["{name}"]
"#
    )
}

/// Build a source tarball holding the given files, rooted at `stem/`
pub fn make_tarball(stem: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let staging = tempfile::tempdir().unwrap();
    let tree = staging.path().join("tree");
    for (path, contents) in files {
        let full = tree.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, contents).unwrap();
    }
    let tarball = staging.path().join("pkg.tar.gz");
    archive::pack_tgz(&tree, stem, &tarball).unwrap();
    std::fs::read(tarball).unwrap()
}

/// Drop a spec straight into the root's index, as an update would
pub fn seed_index(snapshot: &Snapshot, spec_text: &str) -> NV {
    let spec = quarry::PackageSpec::parse(spec_text).unwrap();
    let nv = spec.nv().unwrap();
    state::write_atomic(&snapshot.spec_path(&nv), spec_text.as_bytes()).unwrap();
    nv
}

/// Snapshot of a directory tree as (relative path, contents) pairs
pub fn tree_contents(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    if !root.exists() {
        return out;
    }
    for entry in walkdir(root) {
        let rel = entry.strip_prefix(root).unwrap().to_str().unwrap().to_string();
        out.push((rel, std::fs::read(&entry).unwrap()));
    }
    out.sort();
    out
}

fn walkdir(root: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                stack.push(entry.path());
            } else {
                files.push(entry.path());
            }
        }
    }
    files
}

// =============================================================================
// In-process remote server
// =============================================================================

#[derive(Default)]
pub struct RemoteStore {
    pub specs: HashMap<String, Vec<u8>>,
    pub archives: HashMap<String, Vec<u8>>,
    pub keys: HashMap<String, String>,
}

/// A quarry remote served over a real socket on 127.0.0.1
pub struct TestRemote {
    pub store: Arc<Mutex<RemoteStore>>,
    port: u16,
    /// Key this server hands out on first publication
    issued_key: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TestRemote {
    pub fn start(issued_key: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let store = Arc::new(Mutex::new(RemoteStore::default()));
        let running = Arc::new(AtomicBool::new(true));

        let thread_store = store.clone();
        let thread_running = running.clone();
        let thread_key = issued_key.to_string();
        let handle = std::thread::spawn(move || {
            for stream in listener.incoming() {
                if !thread_running.load(Ordering::SeqCst) {
                    break;
                }
                if let Ok(stream) = stream {
                    let _ = serve_one(stream, &thread_store, &thread_key);
                }
            }
        });

        Self {
            store,
            port,
            issued_key: issued_key.to_string(),
            running,
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> RemoteUrl {
        RemoteUrl::parse(&format!("quarry://127.0.0.1:{}", self.port)).unwrap()
    }

    /// Make a release available: spec always, archive optionally
    pub fn publish(&self, stem: &str, spec_text: &str, archive: Option<Vec<u8>>) {
        let mut store = self.store.lock().unwrap();
        store.specs.insert(stem.to_string(), spec_text.as_bytes().to_vec());
        if let Some(archive) = archive {
            store.archives.insert(stem.to_string(), archive);
        }
    }

    pub fn stored_key(&self, name: &str) -> Option<String> {
        self.store.lock().unwrap().keys.get(name).cloned()
    }
}

impl Drop for TestRemote {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // unblock the accept loop
        let _ = TcpStream::connect(("127.0.0.1", self.port));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_one(
    stream: TcpStream,
    store: &Arc<Mutex<RemoteStore>>,
    issued_key: &str,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    let (status, payload) = respond(&method, &path, &body, store, issued_key);
    let mut stream = reader.into_inner();
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    )?;
    stream.write_all(&payload)?;
    Ok(())
}

fn respond(
    method: &str,
    path: &str,
    body: &[u8],
    store: &Arc<Mutex<RemoteStore>>,
    issued_key: &str,
) -> (&'static str, Vec<u8>) {
    let mut store = store.lock().unwrap();
    match (method, path) {
        ("GET", "/packages") => {
            let mut listing: Vec<serde_json::Value> = store
                .specs
                .keys()
                .filter_map(|stem| {
                    let (name, version) = stem.split_once('-')?;
                    Some(serde_json::json!({ "name": name, "version": version }))
                })
                .collect();
            listing.sort_by_key(|v| v["name"].as_str().unwrap_or("").to_string());
            ("200 OK", serde_json::to_vec(&listing).unwrap())
        }
        ("GET", _) if path.starts_with("/specs/") => {
            let stem = path.trim_start_matches("/specs/").trim_end_matches(".spec");
            match store.specs.get(stem) {
                Some(spec) => ("200 OK", spec.clone()),
                None => ("404 Not Found", Vec::new()),
            }
        }
        ("GET", _) if path.starts_with("/archives/") => {
            let stem = path.trim_start_matches("/archives/").trim_end_matches(".tar.gz");
            match store.archives.get(stem) {
                Some(archive) => ("200 OK", archive.clone()),
                None => ("404 Not Found", Vec::new()),
            }
        }
        ("POST", _) | ("PUT", _) if path.starts_with("/packages/") => {
            let stem = path.trim_start_matches("/packages/").to_string();
            let Some((name, _)) = stem.split_once('-') else {
                return ("400 Bad Request", Vec::new());
            };
            let Ok(request) = serde_json::from_slice::<serde_json::Value>(body) else {
                return ("400 Bad Request", Vec::new());
            };

            if method == "PUT" {
                let provided = request["key"].as_str().unwrap_or("");
                match store.keys.get(name) {
                    Some(expected) if expected == provided => {}
                    _ => return ("403 Forbidden", Vec::new()),
                }
            } else {
                store.keys.insert(name.to_string(), issued_key.to_string());
            }

            if let Some(spec) = decode_field(&request, "spec") {
                store.specs.insert(stem.clone(), spec);
            }
            if let Some(archive) = decode_field(&request, "archive") {
                store.archives.insert(stem.clone(), archive);
            }
            let reply = if method == "POST" {
                serde_json::json!({ "key": issued_key })
            } else {
                serde_json::json!({})
            };
            ("200 OK", serde_json::to_vec(&reply).unwrap())
        }
        _ => ("404 Not Found", Vec::new()),
    }
}

fn decode_field(request: &serde_json::Value, field: &str) -> Option<Vec<u8>> {
    use base64::Engine;
    let encoded = request[field].as_str()?;
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}
