//! The component dependency tree.

use super::InstallError;
use crate::api::{
    BASE, CERT_MANAGER, CITADEL, EGRESS_GATEWAY, GALLEY, INGRESS_GATEWAY, NODE_AGENT, PILOT,
    POLICY, SIDECAR_INJECTOR, TELEMETRY,
};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Returns the default dependencies: every component depends on the base.
pub fn default_dependencies() -> IndexMap<String, Vec<String>> {
    let dependents = [
        PILOT,
        POLICY,
        TELEMETRY,
        GALLEY,
        CITADEL,
        NODE_AGENT,
        CERT_MANAGER,
        SIDECAR_INJECTOR,
        INGRESS_GATEWAY,
        EGRESS_GATEWAY,
    ];
    let mut deps = IndexMap::new();
    deps.insert(
        BASE.to_string(),
        dependents.iter().map(|c| c.to_string()).collect(),
    );
    deps
}

/// ComponentNode is a component with the components that depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNode {
    pub name: String,
    pub dependents: Vec<ComponentNode>,
}

/// DependencyTree is the tree of components, every child depending on its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTree {
    root: ComponentNode,
}

impl DependencyTree {
    /// Builds the tree reachable from `root`.
    ///
    /// `dependencies` maps a component to its direct dependents. A component
    /// reachable twice, whether through two parents or a cycle, is an error.
    /// Entries not reachable from `root` are ignored.
    pub fn build(
        root: &str,
        dependencies: &IndexMap<String, Vec<String>>,
    ) -> Result<Self, InstallError> {
        let mut seen = IndexSet::new();
        let root = build_node(root, None, dependencies, &mut seen)?;
        for name in dependencies.keys().filter(|k| !seen.contains(k.as_str())) {
            debug!(component = %name, "component is not reachable from the root, ignoring");
        }
        Ok(DependencyTree { root })
    }

    pub fn root(&self) -> &ComponentNode {
        &self.root
    }

    /// Component names, parents before their dependents.
    pub fn components(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::from([&self.root]);
        while let Some(node) = queue.pop_front() {
            out.push(node.name.as_str());
            queue.extend(node.dependents.iter());
        }
        out
    }

    /// Every (parent, child) edge of the tree.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            for child in &node.dependents {
                out.push((node.name.as_str(), child.name.as_str()));
                stack.push(child);
            }
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components().contains(&name)
    }

    /// Returns the component `name` depends on.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.edges()
            .into_iter()
            .find(|(_, child)| *child == name)
            .map(|(parent, _)| parent)
    }
}

fn build_node(
    name: &str,
    parent: Option<&str>,
    dependencies: &IndexMap<String, Vec<String>>,
    seen: &mut IndexSet<String>,
) -> Result<ComponentNode, InstallError> {
    if !seen.insert(name.to_string()) {
        return Err(InstallError::Tree(match parent {
            Some(parent) => format!(
                "component {name} is reached again from {parent}; each component must have exactly one parent"
            ),
            None => format!("component {name} is reached twice"),
        }));
    }
    let dependents = dependencies
        .get(name)
        .map(|children| {
            children
                .iter()
                .map(|child| build_node(child, Some(name), dependencies, seen))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
    Ok(ComponentNode {
        name: name.to_string(),
        dependents,
    })
}
