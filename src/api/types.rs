//! Typed installation description.

use super::components::{
    BASE, CERT_MANAGER, CITADEL, EGRESS_GATEWAY, GALLEY, INGRESS_GATEWAY, NODE_AGENT, PILOT, POLICY,
    SIDECAR_INJECTOR, TELEMETRY,
};
use crate::overlay::K8sObjectOverlay;
use crate::value::{Map, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Namespace used when neither a component nor the spec names one.
pub const DEFAULT_NAMESPACE: &str = "istio-system";

/// ControlPlaneSpec describes a control-plane installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    /// Image registry for all components.
    #[serde(default)]
    pub hub: Option<String>,
    /// Image tag; numeric tags such as `1.4` are accepted.
    #[serde(default)]
    pub tag: Option<Value>,
    #[serde(default)]
    pub default_namespace: Option<String>,
    #[serde(default)]
    pub components: Components,
    /// Raw chart values, copied to the root of the values tree.
    #[serde(default)]
    pub values: Option<Map>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub base: Option<ComponentSpec>,
    #[serde(default)]
    pub pilot: Option<ComponentSpec>,
    #[serde(default)]
    pub policy: Option<ComponentSpec>,
    #[serde(default)]
    pub telemetry: Option<ComponentSpec>,
    #[serde(default)]
    pub galley: Option<ComponentSpec>,
    #[serde(default)]
    pub citadel: Option<ComponentSpec>,
    #[serde(default)]
    pub node_agent: Option<ComponentSpec>,
    #[serde(default)]
    pub cert_manager: Option<ComponentSpec>,
    #[serde(default)]
    pub sidecar_injector: Option<ComponentSpec>,
    #[serde(default)]
    pub ingress_gateway: Option<ComponentSpec>,
    #[serde(default)]
    pub egress_gateway: Option<ComponentSpec>,
}

/// Settings shared by every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub hub: Option<String>,
    #[serde(default)]
    pub tag: Option<Value>,
    #[serde(default)]
    pub k8s: Option<K8sSpec>,
}

/// Kubernetes resource settings of a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sSpec {
    #[serde(default)]
    pub replica_count: Option<u32>,
    #[serde(default)]
    pub image_pull_policy: Option<String>,
    #[serde(default)]
    pub resources: Option<Map>,
    #[serde(default)]
    pub node_selector: Option<IndexMap<String, String>>,
    #[serde(default)]
    pub hpa_spec: Option<HpaSpec>,
    /// Set on every container of the component's workloads.
    #[serde(default, skip_serializing)]
    pub env: Vec<EnvVar>,
    /// Applied to the rendered manifest rather than translated to values.
    #[serde(default, skip_serializing)]
    pub overlays: Vec<K8sObjectOverlay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HpaSpec {
    #[serde(default)]
    pub min_replicas: Option<u32>,
    #[serde(default)]
    pub max_replicas: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl ControlPlaneSpec {
    /// Parses a spec from YAML or JSON.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Returns the settings of the named component.
    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        let c = &self.components;
        let spec = match name {
            BASE => &c.base,
            PILOT => &c.pilot,
            POLICY => &c.policy,
            TELEMETRY => &c.telemetry,
            GALLEY => &c.galley,
            CITADEL => &c.citadel,
            NODE_AGENT => &c.node_agent,
            CERT_MANAGER => &c.cert_manager,
            SIDECAR_INJECTOR => &c.sidecar_injector,
            INGRESS_GATEWAY => &c.ingress_gateway,
            EGRESS_GATEWAY => &c.egress_gateway,
            _ => return None,
        };
        spec.as_ref()
    }

    /// A listed component is enabled unless it says otherwise. The base
    /// component is enabled even when it is not listed.
    pub fn is_enabled(&self, name: &str) -> bool {
        match self.component(name) {
            Some(spec) => spec.enabled.unwrap_or(true),
            None => name == BASE,
        }
    }

    /// Namespace the component is installed into.
    pub fn namespace_for(&self, name: &str) -> &str {
        self.component(name)
            .and_then(|c| c.namespace.as_deref())
            .or(self.default_namespace.as_deref())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Overlays declared for the component.
    pub fn overlays(&self, name: &str) -> &[K8sObjectOverlay] {
        self.component(name)
            .and_then(|c| c.k8s.as_ref())
            .map(|k| k.overlays.as_slice())
            .unwrap_or_default()
    }

    /// Container environment declared for the component.
    pub fn env(&self, name: &str) -> &[EnvVar] {
        self.component(name)
            .and_then(|c| c.k8s.as_ref())
            .map(|k| k.env.as_slice())
            .unwrap_or_default()
    }
}
