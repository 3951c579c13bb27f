//! On-disk manifest layout: `{dir}/{component}/{component}.yaml`.

use super::InstallError;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Returns the file holding the manifest of `component` below `dir`.
pub fn manifest_path(dir: &Path, component: &str) -> PathBuf {
    dir.join(component).join(format!("{component}.yaml"))
}

/// Writes every manifest to its component file and returns the paths written.
pub fn write_manifests(
    dir: &Path,
    manifests: &IndexMap<String, String>,
) -> Result<Vec<PathBuf>, InstallError> {
    let mut written = Vec::with_capacity(manifests.len());
    for (component, manifest) in manifests {
        let path = manifest_path(dir, component);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
        }
        fs::write(&path, manifest).map_err(|e| InstallError::io(&path, e))?;
        info!(component = %component, path = %path.display(), "wrote manifest");
        written.push(path);
    }
    Ok(written)
}

/// Reads the manifests of every component directory below `dir`.
///
/// Directories without a component file are skipped. Components are
/// returned in name order.
pub fn read_manifests(dir: &Path) -> Result<IndexMap<String, String>, InstallError> {
    let mut components = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| InstallError::io(dir, e))? {
        let entry = entry.map_err(|e| InstallError::io(dir, e))?;
        if entry.path().is_dir() {
            components.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    components.sort();

    let mut manifests = IndexMap::new();
    for component in components {
        let path = manifest_path(dir, &component);
        if !path.is_file() {
            debug!(component = %component, "no manifest file, skipping");
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|e| InstallError::io(&path, e))?;
        manifests.insert(component, text);
    }
    Ok(manifests)
}
