//! Overlay module - path-addressed overrides of rendered objects.
//!
//! An overlay names an object by kind, namespace and name and lists
//! `(path, value)` patches. A patch with a value updates or sets the node
//! at the path, a patch without one deletes it.

mod patch;

#[cfg(test)]
mod patch_test;

pub use patch::*;

use crate::manifest::ManifestError;
use crate::path::ParseError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// K8sObjectOverlay is the set of patches for one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sObjectOverlay {
    pub kind: String,
    pub name: String,
    /// Empty selects the namespace the manifest is installed into.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default)]
    pub patches: Vec<PathValue>,
}

/// PathValue is a single patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathValue {
    pub path: String,
    /// Absent or null deletes the node.
    #[serde(default)]
    pub value: Option<Value>,
}

impl PathValue {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        PathValue {
            path: path.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        PathValue {
            path: path.into(),
            value: None,
        }
    }
}

/// PatchError reports why a patch could not be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("path element {element} not found")]
    NotFound { element: String },

    #[error("{path}: cannot apply {element} to a {found} node")]
    Type {
        path: String,
        element: String,
        found: String,
    },

    #[error(transparent)]
    Path(#[from] ParseError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to serialize patched object {hash}: {message}")]
    Serialize { hash: String, message: String },
}
