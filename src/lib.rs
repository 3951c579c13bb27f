//! # Mesh Installer
//!
//! Installs a service-mesh control plane from a typed description.
//!
//! A [`ControlPlaneSpec`](api::ControlPlaneSpec) is translated into the
//! generic values tree charts are rendered from. Rendered manifests are
//! parsed into objects, patched with per-component overlays and applied
//! to the cluster component by component, following a dependency tree.
//!
//! ## Modules
//!
//! - [`path`] - Bracketed path language addressing map keys and list entries
//! - [`value`] - In-memory representation of YAML/JSON documents
//! - [`translate`] - Longest-prefix translation of typed config into a values tree
//! - [`manifest`] - Kubernetes objects parsed from multi-document YAML
//! - [`overlay`] - Update and delete patches addressed by paths
//! - [`api`] - The control-plane spec and its translation rules
//! - [`render`] - Rendering and overlaying component manifests
//! - [`installer`] - Dependency-ordered application to a cluster
//! - [`config`] - Installer configuration file

pub mod api;
pub mod config;
pub mod installer;
pub mod manifest;
pub mod overlay;
pub mod path;
pub mod render;
pub mod translate;
pub mod value;

pub use api::ControlPlaneSpec;
pub use installer::{Applier, DependencyTree, InstallSession};
pub use manifest::{Object, ObjectSet};
pub use overlay::K8sObjectOverlay;
pub use path::{Path, PathElement};
pub use translate::{Mappings, Translator};
pub use value::{Map, Value};
