// src/lib.rs

//! quarry - client coordinator of a source-based package manager
//!
//! quarry mediates between the command line, a dependency solver, a set
//! of remote package indexes (plain and git) and a local installation
//! tree. A user intent becomes a solver request; accepted solutions are
//! applied as ordered install / remove / recompile actions; every
//! mutation is reflected atomically in the on-disk client state.
//!
//! # Architecture
//!
//! - File-first: all persistent state is plain files under one root,
//!   rewritten atomically
//! - One installed version per name, always backed by a spec and an
//!   install manifest
//! - Remotes answer one narrow server contract, whatever their transport
//! - Builds are untrusted subprocesses; a failing build changes nothing

pub mod archive;
mod error;
pub mod executor;
pub mod install;
pub mod prompt;
pub mod publish;
pub mod query;
pub mod remotes;
pub mod repository;
pub mod resolver;
pub mod solver;
pub mod spec;
pub mod state;
pub mod version;

pub use error::{Error, Result};
pub use prompt::{AssumeYes, Prompter, ScriptedPrompter, StdinPrompter};
pub use remotes::{RemoteUrl, Scheme};
pub use solver::{Action, CandidatePackage, Previous, Request, Solution};
pub use spec::{InstallManifest, PackageSpec};
pub use state::{Environment, Snapshot};
pub use version::{Constraint, Dependency, HeadState, ReleaseVersion, Version, NV};
