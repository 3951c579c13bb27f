//! The control-plane component catalog.

/// Name of the root component every other component depends on.
pub const BASE: &str = "Base";
pub const PILOT: &str = "Pilot";
pub const POLICY: &str = "Policy";
pub const TELEMETRY: &str = "Telemetry";
pub const GALLEY: &str = "Galley";
pub const CITADEL: &str = "Citadel";
pub const NODE_AGENT: &str = "NodeAgent";
pub const CERT_MANAGER: &str = "CertManager";
pub const SIDECAR_INJECTOR: &str = "SidecarInjector";
pub const INGRESS_GATEWAY: &str = "IngressGateway";
pub const EGRESS_GATEWAY: &str = "EgressGateway";

/// ComponentInfo ties a component name to its configuration field and the
/// chart values subtree it is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    pub name: &'static str,
    /// Field under `components` in a [`ControlPlaneSpec`](super::ControlPlaneSpec).
    pub field: &'static str,
    pub values_prefix: &'static str,
}

/// All components, in render order.
pub const COMPONENTS: &[ComponentInfo] = &[
    ComponentInfo {
        name: BASE,
        field: "base",
        values_prefix: "base",
    },
    ComponentInfo {
        name: PILOT,
        field: "pilot",
        values_prefix: "pilot",
    },
    ComponentInfo {
        name: POLICY,
        field: "policy",
        values_prefix: "mixer.policy",
    },
    ComponentInfo {
        name: TELEMETRY,
        field: "telemetry",
        values_prefix: "mixer.telemetry",
    },
    ComponentInfo {
        name: GALLEY,
        field: "galley",
        values_prefix: "galley",
    },
    ComponentInfo {
        name: CITADEL,
        field: "citadel",
        values_prefix: "security",
    },
    ComponentInfo {
        name: NODE_AGENT,
        field: "nodeAgent",
        values_prefix: "nodeagent",
    },
    ComponentInfo {
        name: CERT_MANAGER,
        field: "certManager",
        values_prefix: "certmanager",
    },
    ComponentInfo {
        name: SIDECAR_INJECTOR,
        field: "sidecarInjector",
        values_prefix: "sidecarInjectorWebhook",
    },
    ComponentInfo {
        name: INGRESS_GATEWAY,
        field: "ingressGateway",
        values_prefix: "gateways.istio-ingressgateway",
    },
    ComponentInfo {
        name: EGRESS_GATEWAY,
        field: "egressGateway",
        values_prefix: "gateways.istio-egressgateway",
    },
];

/// Looks up a component by name.
pub fn component_info(name: &str) -> Option<&'static ComponentInfo> {
    COMPONENTS.iter().find(|c| c.name == name)
}
