//! Installer configuration file.

use crate::api::BASE;
use crate::installer::{default_dependencies, DependencyTree, InstallError, InstallOptions};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// InstallerConfig holds the settings of an installation run. Every field
/// is optional in the file.
///
/// ```yaml
/// namespace: istio-system
/// kubectl: /usr/local/bin/kubectl
/// crdTimeoutSecs: 120
/// dependencies:
///   Base: [Pilot, Galley]
///   Pilot: [IngressGateway]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallerConfig {
    pub namespace: String,
    pub kubectl: PathBuf,
    pub component_label: String,
    pub crd_poll_interval_ms: u64,
    pub crd_timeout_secs: u64,
    pub root_component: String,
    /// Maps a component to the components that depend on it.
    pub dependencies: IndexMap<String, Vec<String>>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let options = InstallOptions::default();
        InstallerConfig {
            namespace: options.namespace,
            kubectl: PathBuf::from("kubectl"),
            component_label: options.component_label,
            crd_poll_interval_ms: options.crd_poll_interval.as_millis() as u64,
            crd_timeout_secs: options.crd_timeout.as_secs(),
            root_component: BASE.to_string(),
            dependencies: default_dependencies(),
        }
    }
}

impl InstallerConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        InstallerConfig::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            namespace: self.namespace.clone(),
            component_label: self.component_label.clone(),
            crd_poll_interval: Duration::from_millis(self.crd_poll_interval_ms),
            crd_timeout: Duration::from_secs(self.crd_timeout_secs),
        }
    }

    pub fn dependency_tree(&self) -> Result<DependencyTree, InstallError> {
        DependencyTree::build(&self.root_component, &self.dependencies)
    }
}
