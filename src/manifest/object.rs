//! A single Kubernetes object.

use super::ManifestError;
use crate::value::{Map, Value};
use once_cell::sync::OnceCell;

/// Object is an unstructured Kubernetes resource.
///
/// Serialized forms are computed on first use and cached. Every method that
/// takes `&mut self` drops the caches before it returns.
#[derive(Debug, Clone)]
pub struct Object {
    body: Map,
    json: OnceCell<String>,
    yaml: OnceCell<String>,
}

impl Object {
    /// Creates an object from its decoded body.
    pub fn new(body: Map) -> Self {
        Object {
            body,
            json: OnceCell::new(),
            yaml: OnceCell::new(),
        }
    }

    /// Decodes a single YAML or JSON document.
    pub fn from_yaml(document: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_yaml::from_str(document).map_err(|e| ManifestError::Decode {
                document: document.to_string(),
                message: e.to_string(),
            })?;
        match value {
            Value::Map(body) => Ok(Object::new(body)),
            _ => Err(ManifestError::NotAnObject {
                document: document.to_string(),
            }),
        }
    }

    pub fn body(&self) -> &Map {
        &self.body
    }

    pub fn into_body(self) -> Map {
        self.body
    }

    pub fn api_version(&self) -> &str {
        self.str_field(&["apiVersion"])
    }

    /// API group, the part of `apiVersion` before the `/`; empty for the
    /// core group.
    pub fn group(&self) -> &str {
        match self.api_version().split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn kind(&self) -> &str {
        self.str_field(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_field(&["metadata", "name"])
    }

    pub fn namespace(&self) -> &str {
        self.str_field(&["metadata", "namespace"])
    }

    /// Identity of the object, `group/kind/name`.
    pub fn hash(&self) -> String {
        object_hash(self.group(), self.kind(), self.name())
    }

    fn str_field(&self, keys: &[&str]) -> &str {
        self.nested_field(keys)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns the value at a sequence of map keys.
    pub fn nested_field(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        self.body.get(first)?.lookup(rest)
    }

    pub fn labels(&self) -> Option<&Map> {
        self.nested_field(&["metadata", "labels"])
            .and_then(Value::as_map)
    }

    /// Merges `labels` into `metadata.labels`, overwriting existing keys.
    pub fn add_labels<'a, I>(&mut self, labels: I) -> Result<(), ManifestError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.invalidate();
        let node = self.nested_map_mut(&["metadata", "labels"])?;
        for (key, value) in labels {
            node.set(key, Value::from(value));
        }
        Ok(())
    }

    /// Returns `metadata.ownerReferences`, empty when absent.
    pub fn owner_references(&self) -> &[Value] {
        self.nested_field(&["metadata", "ownerReferences"])
            .and_then(Value::as_list)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn add_owner_reference(&mut self, reference: Map) -> Result<(), ManifestError> {
        self.invalidate();
        let hash = self.hash();
        let metadata = self.nested_map_mut(&["metadata"])?;
        let refs = metadata.entry("ownerReferences");
        if refs.is_null() {
            *refs = Value::List(Vec::new());
        }
        match refs {
            Value::List(list) => list.push(Value::Map(reference)),
            other => {
                return Err(ManifestError::invalid_field(
                    hash,
                    "metadata.ownerReferences",
                    format!("expected a list, found {}", other.kind_name()),
                ))
            }
        }
        Ok(())
    }

    /// Sets the value at a sequence of map keys, creating missing maps.
    pub fn set_nested_field(&mut self, keys: &[&str], value: Value) -> Result<(), ManifestError> {
        self.invalidate();
        let Some((last, parents)) = keys.split_last() else {
            return Err(ManifestError::invalid_field(
                self.hash(),
                "",
                "empty field path",
            ));
        };
        self.nested_map_mut(parents)?.set(*last, value);
        Ok(())
    }

    /// Runs `f` on the pod spec of a workload object.
    ///
    /// Returns false when the kind has no pod template.
    pub fn mutate_pod_spec<F>(&mut self, f: F) -> Result<bool, ManifestError>
    where
        F: FnOnce(&mut Map),
    {
        self.invalidate();
        let Some(keys) = pod_spec_path(self.kind()) else {
            return Ok(false);
        };
        f(self.nested_map_mut(keys)?);
        Ok(true)
    }

    /// Runs `f` on every entry of the pod spec's `containers` list.
    ///
    /// Returns false when the kind has no pod template.
    pub fn mutate_containers<F>(&mut self, mut f: F) -> Result<bool, ManifestError>
    where
        F: FnMut(&mut Map),
    {
        self.mutate_pod_spec(|spec| {
            if let Some(Value::List(containers)) = spec.get_mut("containers") {
                containers
                    .iter_mut()
                    .filter_map(Value::as_map_mut)
                    .for_each(&mut f);
            }
        })
    }

    /// Returns the map at `keys`, creating missing maps on the way.
    fn nested_map_mut(&mut self, keys: &[&str]) -> Result<&mut Map, ManifestError> {
        let hash = self.hash();
        let mut current = &mut self.body;
        for (depth, key) in keys.iter().enumerate() {
            let node = current.entry(*key);
            if node.is_null() {
                *node = Value::Map(Map::new());
            }
            current = match node {
                Value::Map(map) => map,
                other => {
                    return Err(ManifestError::invalid_field(
                        hash,
                        keys[..=depth].join("."),
                        format!("expected a map, found {}", other.kind_name()),
                    ))
                }
            };
        }
        Ok(current)
    }

    fn invalidate(&mut self) {
        self.json = OnceCell::new();
        self.yaml = OnceCell::new();
    }

    /// Returns the YAML form of the object.
    pub fn yaml(&self) -> Result<&str, ManifestError> {
        self.yaml
            .get_or_try_init(|| {
                serde_yaml::to_string(&self.body).map_err(|e| ManifestError::Serialize {
                    hash: self.hash(),
                    message: e.to_string(),
                })
            })
            .map(String::as_str)
    }

    /// Returns the JSON form of the object.
    pub fn json(&self) -> Result<&str, ManifestError> {
        self.json
            .get_or_try_init(|| {
                serde_json::to_string(&self.body).map_err(|e| ManifestError::Serialize {
                    hash: self.hash(),
                    message: e.to_string(),
                })
            })
            .map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self) -> bool {
        self.yaml.get().is_some() || self.json.get().is_some()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

/// Builds the identity hash of an object.
pub fn object_hash(group: &str, kind: &str, name: &str) -> String {
    format!("{}/{}/{}", group, kind, name)
}

fn pod_spec_path(kind: &str) -> Option<&'static [&'static str]> {
    match kind {
        "Pod" => Some(&["spec"]),
        "Deployment" | "DaemonSet" | "StatefulSet" | "ReplicaSet" | "Job" => {
            Some(&["spec", "template", "spec"])
        }
        "CronJob" => Some(&["spec", "jobTemplate", "spec", "template", "spec"]),
        _ => None,
    }
}
