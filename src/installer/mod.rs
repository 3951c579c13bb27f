//! Installer module - applying component manifests in dependency order.
//!
//! Components form a tree rooted at the base component. Every component is
//! applied by its own task, which waits for its parent to finish before it
//! starts. A component that fails, or whose parent did not finish, never
//! releases its dependents.

mod applier;
mod disk;
mod session;
#[cfg(test)]
mod session_test;
mod tree;

pub use applier::*;
pub use disk::*;
pub use session::*;
pub use tree::*;

use crate::manifest::ManifestError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// ApplyError is returned when a component could not be applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} failed with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("CRDs not established after {timeout:?}: {pending}")]
    CrdTimeout { timeout: Duration, pending: String },
    #[error("cannot read status of CRD {name}: {message}")]
    CrdStatus { name: String, message: String },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// InstallError is returned by installation sessions and manifest storage.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid dependency tree: {0}")]
    Tree(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("installation failed: failed [{}], skipped [{}]", .failed.join(", "), .skipped.join(", "))]
    ComponentsFailed {
        failed: Vec<String>,
        skipped: Vec<String>,
    },
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InstallError::Io {
            path: path.into(),
            source,
        }
    }
}
