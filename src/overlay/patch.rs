//! Applying overlays to an object set.

use super::{K8sObjectOverlay, PatchError, PathValue};
use crate::manifest::{Object, ObjectSet};
use crate::path::{Path, PathElement};
use crate::translate::field_matches;
use crate::value::{to_yaml, Value};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Step is one move from a node to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// NodeContext locates a node as the chain of steps from the document root.
///
/// The last step is the key or index used in the parent to reach the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContext {
    pub steps: Vec<Step>,
    /// False when the last step is a map key that is not present.
    pub exists: bool,
}

impl NodeContext {
    /// Returns the step the parent uses to reach this node.
    pub fn key_in_parent(&self) -> Option<&Step> {
        self.steps.last()
    }
}

/// Patches `base` and returns the resulting multi-document YAML.
///
/// Patched objects come first, in overlay order, followed by every object
/// without an overlay. Missing targets and failing patches are logged and
/// skipped.
pub fn patch(
    base: &ObjectSet,
    namespace: &str,
    overlays: &[K8sObjectOverlay],
) -> Result<String, PatchError> {
    let mut patched: IndexMap<String, Value> = IndexMap::new();

    for overlay in overlays {
        let target_ns = if overlay.namespace.is_empty() {
            namespace
        } else {
            overlay.namespace.as_str()
        };
        let Some(object) = base
            .iter()
            .find(|o| is_target(o, overlay, target_ns, namespace))
        else {
            warn!(
                kind = %overlay.kind,
                namespace = %target_ns,
                name = %overlay.name,
                "overlay target not found, skipping"
            );
            continue;
        };

        let hash = object.hash();
        debug!(object = %hash, patches = overlay.patches.len(), "applying overlay");
        let document = patched
            .entry(hash.clone())
            .or_insert_with(|| Value::Map(object.body().clone()));
        for pv in &overlay.patches {
            if let Err(e) = apply_patch(document, pv) {
                warn!(object = %hash, path = %pv.path, error = %e, "skipping patch");
            }
        }
    }

    let mut out = Vec::with_capacity(base.len());
    for (hash, document) in &patched {
        out.push(to_yaml(document).map_err(|e| PatchError::Serialize {
            hash: hash.clone(),
            message: e.to_string(),
        })?);
    }
    for object in base.iter().filter(|o| !patched.contains_key(&o.hash())) {
        out.push(object.yaml()?.to_string());
    }
    Ok(out.join("---\n"))
}

fn is_target(object: &Object, overlay: &K8sObjectOverlay, target_ns: &str, default_ns: &str) -> bool {
    let object_ns = if object.namespace().is_empty() {
        default_ns
    } else {
        object.namespace()
    };
    object.kind() == overlay.kind && object.name() == overlay.name && object_ns == target_ns
}

/// Applies a single patch to a document.
pub fn apply_patch(document: &mut Value, pv: &PathValue) -> Result<(), PatchError> {
    let path = Path::parse(&pv.path)?;
    let ctx = get_node(document, &path)?;
    let value = pv.value.clone().filter(|v| !v.is_null());
    write_node(document, &ctx, value)
}

/// Locates the node at `path` below `root`.
///
/// Descending into a missing map key is allowed for the last element only;
/// the write decides what to do with the absent node.
pub fn get_node(root: &Value, path: &Path) -> Result<NodeContext, PatchError> {
    let mut steps = Vec::with_capacity(path.len());
    let mut node = Some(root);

    for (depth, element) in path.iter().enumerate() {
        let Some(current) = node else {
            return Err(PatchError::NotFound {
                element: element.to_string(),
            });
        };
        match (current, element) {
            (Value::List(list), PathElement::KeyValue { key, value }) => {
                let idx = list
                    .iter()
                    .position(|entry| match entry {
                        Value::Map(_) => field_matches(entry, key, value),
                        leaf => leaf.is_scalar() && leaf.to_plain_string() == *value,
                    })
                    .ok_or_else(|| PatchError::NotFound {
                        element: element.to_string(),
                    })?;
                steps.push(Step::Index(idx));
                node = list.get(idx);
            }
            (Value::List(list), PathElement::Value(value)) => {
                let idx = list
                    .iter()
                    .position(|entry| entry.is_scalar() && entry.to_plain_string() == *value)
                    .ok_or_else(|| PatchError::NotFound {
                        element: element.to_string(),
                    })?;
                steps.push(Step::Index(idx));
                node = list.get(idx);
            }
            (Value::Map(map), PathElement::Plain(key)) => {
                steps.push(Step::Key(key.clone()));
                node = map.get(key);
            }
            (current, element) => {
                return Err(PatchError::Type {
                    path: Path::from_elements(path.as_slice()[..depth].to_vec()).to_string(),
                    element: element.to_string(),
                    found: current.kind_name().to_string(),
                })
            }
        }
    }

    Ok(NodeContext {
        steps,
        exists: node.is_some(),
    })
}

/// Writes `value` at the node located by `ctx`; `None` deletes it.
///
/// List entries are updated or removed in place; inserting a new list
/// entry is not supported.
pub fn write_node(root: &mut Value, ctx: &NodeContext, value: Option<Value>) -> Result<(), PatchError> {
    let Some((last, parents)) = ctx.steps.split_last() else {
        return Err(PatchError::Type {
            path: String::new(),
            element: String::new(),
            found: "document root".to_string(),
        });
    };
    let parent = resolve_mut(root, parents).ok_or_else(|| PatchError::NotFound {
        element: describe(parents),
    })?;

    match (parent, last, value) {
        (Value::List(list), Step::Index(idx), None) => {
            if *idx < list.len() {
                list.remove(*idx);
            }
        }
        (Value::List(list), Step::Index(idx), Some(value)) => match list.get_mut(*idx) {
            Some(entry) => *entry = value,
            None => {
                return Err(PatchError::NotFound {
                    element: describe(&ctx.steps),
                })
            }
        },
        (Value::Map(map), Step::Key(key), None) => {
            map.delete(key);
        }
        (Value::Map(map), Step::Key(key), Some(value)) => map.set(key.clone(), value),
        (parent, _, _) => {
            return Err(PatchError::Type {
                path: describe(parents),
                element: describe(std::slice::from_ref(last)),
                found: parent.kind_name().to_string(),
            })
        }
    }
    Ok(())
}

fn resolve_mut<'a>(root: &'a mut Value, steps: &[Step]) -> Option<&'a mut Value> {
    steps.iter().try_fold(root, |node, step| match step {
        Step::Key(key) => node.as_map_mut()?.get_mut(key),
        Step::Index(idx) => node.as_list_mut()?.get_mut(*idx),
    })
}

fn describe(steps: &[Step]) -> String {
    steps
        .iter()
        .map(|step| match step {
            Step::Key(key) => key.clone(),
            Step::Index(idx) => format!("[{}]", idx),
        })
        .collect::<Vec<_>>()
        .join(".")
}
