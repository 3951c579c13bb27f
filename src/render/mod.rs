//! Render module - turning a control-plane spec into component manifests.
//!
//! The spec is translated into a values tree once, every enabled component
//! is rendered from it, and the component's overlays are applied to the
//! result.

use crate::api::{ControlPlaneSpec, EnvVar, COMPONENTS};
use crate::installer::manifest_path;
use crate::manifest::{parse_objects, ManifestError};
use crate::overlay::{patch, PatchError};
use crate::translate::{to_tree, Mappings, TranslateErrors};
use crate::value::{Map, Value};
use indexmap::IndexMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("translation failed:\n{0}")]
    Translate(TranslateErrors),
    #[error("cannot read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{component}: {message}")]
    Render { component: String, message: String },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Renderer produces the manifest of one component from chart values.
pub trait Renderer {
    fn render(&self, component: &str, values: &Map) -> Result<String, RenderError>;
}

/// DirectoryRenderer reads pre-rendered manifests from
/// `{root}/{component}/{component}.yaml`, ignoring the values.
#[derive(Debug, Clone)]
pub struct DirectoryRenderer {
    root: PathBuf,
}

impl DirectoryRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryRenderer { root: root.into() }
    }
}

impl Renderer for DirectoryRenderer {
    fn render(&self, component: &str, _values: &Map) -> Result<String, RenderError> {
        let path = manifest_path(&self.root, component);
        if !path.is_file() {
            debug!(component, path = %path.display(), "no template");
            return Ok(String::new());
        }
        std::fs::read_to_string(&path).map_err(|source| RenderError::Io { path, source })
    }
}

/// Renders every enabled component of `spec` and applies its overlays.
///
/// Components are returned in catalog order, keyed by name.
pub fn generate_manifests(
    spec: &ControlPlaneSpec,
    mappings: &Mappings,
    renderer: &dyn Renderer,
) -> Result<IndexMap<String, String>, RenderError> {
    let (values, errors) = to_tree(mappings, spec);
    errors.into_result().map_err(RenderError::Translate)?;

    let mut out = IndexMap::new();
    for component in COMPONENTS.iter().filter(|c| spec.is_enabled(c.name)) {
        let mut manifest = renderer.render(component.name, &values)?;
        let env = spec.env(component.name);
        let overlays = spec.overlays(component.name);
        if !manifest.trim().is_empty() && (!env.is_empty() || !overlays.is_empty()) {
            let mut objects = parse_objects(&manifest)?;
            if !env.is_empty() {
                for object in objects.iter_mut() {
                    object.mutate_containers(|container| set_env(container, env))?;
                }
            }
            manifest = if overlays.is_empty() {
                objects.yaml()?
            } else {
                patch(&objects, spec.namespace_for(component.name), overlays)?
            };
        }
        info!(component = component.name, bytes = manifest.len(), "rendered");
        out.insert(component.name.to_string(), manifest);
    }
    Ok(out)
}

/// Sets `env` on a container, replacing variables of the same name.
fn set_env(container: &mut Map, env: &[EnvVar]) {
    let list = container.entry("env");
    if !list.is_list() {
        *list = Value::List(Vec::new());
    }
    let Some(list) = list.as_list_mut() else {
        return;
    };
    for var in env {
        let entry: Map = [
            ("name".to_string(), Value::from(var.name.as_str())),
            ("value".to_string(), Value::from(var.value.as_str())),
        ]
        .into_iter()
        .collect();
        let existing = list
            .iter_mut()
            .find(|e| e.lookup(&["name"]).and_then(Value::as_str) == Some(var.name.as_str()));
        match existing {
            Some(existing) => *existing = Value::Map(entry),
            None => list.push(Value::Map(entry)),
        }
    }
}
