//! Path-addressed writes into a values tree.

use super::error::TranslateError;
use crate::path::{Path, PathElement};
use crate::value::{Map, Value};

/// Sets `value` at `path` in `tree`, creating intermediate nodes.
///
/// A `[key:value]` element addressing a list selects the first entry whose
/// `key` field stringifies to `value`; when none matches a new entry
/// `{key: value}` is appended and the rest of the path is written into it.
/// A path ending in `[key:value]` merges a map value into the selected
/// entry, keeping its `key` field. A path ending in `[x]` replaces the
/// scalar `x` with the value, or appends the value when neither is listed.
/// Repeating the same call leaves the tree unchanged.
pub fn set_tree(tree: &mut Map, path: &Path, value: Value) -> Result<(), TranslateError> {
    let Some((head, rest)) = path.as_slice().split_first() else {
        return Err(TranslateError::invalid_value("", "cannot set a value at the empty path"));
    };
    if matches!(path.last(), Some(PathElement::KeyValue { .. })) && !value.is_map() {
        return Err(TranslateError::invalid_value(
            path.to_string(),
            "a [key:value] selector at the end of a path takes a map value",
        ));
    }
    match head {
        PathElement::Plain(key) => set_node(tree.entry(key.clone()), path, 1, rest, value),
        other => Err(TranslateError::type_mismatch(
            path.to_string(),
            other.to_string(),
            "map",
        )),
    }
}

fn set_node(
    node: &mut Value,
    full: &Path,
    depth: usize,
    path: &[PathElement],
    value: Value,
) -> Result<(), TranslateError> {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return Ok(());
    };

    if node.is_null() {
        *node = if head.is_plain() {
            Value::Map(Map::new())
        } else {
            Value::List(Vec::new())
        };
    }

    match (head, node) {
        (PathElement::Plain(key), Value::Map(map)) => {
            set_node(map.entry(key.clone()), full, depth + 1, rest, value)
        }
        (PathElement::KeyValue { key, value: wanted }, Value::List(list)) => {
            let idx = match list.iter().position(|entry| field_matches(entry, key, wanted)) {
                Some(idx) => idx,
                None => {
                    let mut entry = Map::new();
                    entry.set(key.clone(), Value::String(wanted.clone()));
                    list.push(Value::Map(entry));
                    list.len() - 1
                }
            };
            if rest.is_empty() {
                merge_entry(&mut list[idx], key, wanted, value);
                return Ok(());
            }
            set_node(&mut list[idx], full, depth + 1, rest, value)
        }
        (PathElement::Value(wanted), Value::List(list)) => {
            match list
                .iter()
                .position(|entry| entry.is_scalar() && entry.to_plain_string() == *wanted)
            {
                Some(idx) => set_node(&mut list[idx], full, depth + 1, rest, value),
                None if rest.is_empty() => {
                    if !list.contains(&value) {
                        list.push(value);
                    }
                    Ok(())
                }
                None => Err(TranslateError::invalid_value(
                    full.to_string(),
                    format!("list has no entry {}", head),
                )),
            }
        }
        (head, node) => Err(TranslateError::type_mismatch(
            prefix(full, depth),
            head.to_string(),
            node.kind_name(),
        )),
    }
}

/// Copies the fields of `value` into the selected list entry. The selector
/// field is written last so the entry stays selectable.
fn merge_entry(entry: &mut Value, key: &str, wanted: &str, value: Value) {
    let (Some(entry), Value::Map(fields)) = (entry.as_map_mut(), value) else {
        return;
    };
    for (k, v) in fields.fields {
        entry.set(k, v);
    }
    entry.set(key, Value::String(wanted.to_string()));
}

/// Returns true if `entry` is a map whose `key` field stringifies to `wanted`.
pub(crate) fn field_matches(entry: &Value, key: &str, wanted: &str) -> bool {
    entry
        .as_map()
        .and_then(|m| m.get(key))
        .is_some_and(|v| v.to_plain_string() == wanted)
}

fn prefix(full: &Path, depth: usize) -> String {
    Path::from_elements(full.as_slice()[..depth].to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    fn tree(yaml: &str) -> Map {
        from_yaml(yaml).unwrap().as_map().cloned().unwrap()
    }

    fn path(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_set_single_element() {
        let mut t = Map::new();
        set_tree(&mut t, &path("hub"), "docker.io/istio".into()).unwrap();
        assert_eq!(t, tree("hub: docker.io/istio\n"));
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut t = tree("global:\n  tag: 1.4.0\n");
        set_tree(&mut t, &path("global.proxy.image"), "proxyv2".into()).unwrap();
        assert_eq!(
            t,
            tree("global:\n  tag: 1.4.0\n  proxy:\n    image: proxyv2\n")
        );
    }

    #[test]
    fn test_set_kv_selects_existing_entry() {
        let mut t = tree("gateways:\n- name: ingress\n  enabled: false\n- name: egress\n");
        set_tree(&mut t, &path("gateways.[name:ingress].enabled"), true.into()).unwrap();
        assert_eq!(
            t,
            tree("gateways:\n- name: ingress\n  enabled: true\n- name: egress\n")
        );
    }

    #[test]
    fn test_set_kv_appends_missing_entry() {
        let mut t = tree("gateways:\n- name: ingress\n");
        set_tree(&mut t, &path("gateways.[name:egress].replicas"), Value::Int(2)).unwrap();
        assert_eq!(
            t,
            tree("gateways:\n- name: ingress\n- name: egress\n  replicas: 2\n")
        );
    }

    #[test]
    fn test_set_kv_on_absent_node_creates_list() {
        let mut t = Map::new();
        set_tree(&mut t, &path("ports.[name:http].port"), Value::Int(80)).unwrap();
        assert_eq!(t, tree("ports:\n- name: http\n  port: 80\n"));
    }

    #[test]
    fn test_set_value_selector() {
        let mut t = tree("args: [a, b]\n");
        set_tree(&mut t, &path("args.[b]"), "c".into()).unwrap();
        set_tree(&mut t, &path("args.[d]"), "d".into()).unwrap();
        assert_eq!(t, tree("args: [a, c, d]\n"));
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut once = tree("a:\n  b:\n  - name: n1\n");
        set_tree(&mut once, &path("a.b.[name:n2].value"), "v".into()).unwrap();
        let mut twice = once.clone();
        set_tree(&mut twice, &path("a.b.[name:n2].value"), "v".into()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_set_terminal_value_selector_is_idempotent() {
        let mut once = tree("args: [a, b]\n");
        set_tree(&mut once, &path("args.[x]"), "y".into()).unwrap();
        assert_eq!(once, tree("args: [a, b, y]\n"));
        let mut twice = once.clone();
        set_tree(&mut twice, &path("args.[x]"), "y".into()).unwrap();
        assert_eq!(once, twice);

        let mut replaced = tree("args: [a, b]\n");
        set_tree(&mut replaced, &path("args.[b]"), "c".into()).unwrap();
        set_tree(&mut replaced, &path("args.[b]"), "c".into()).unwrap();
        assert_eq!(replaced, tree("args: [a, c]\n"));
    }

    #[test]
    fn test_set_terminal_kv_selector_merges_map() {
        let mut once = tree("gateways:\n- name: ingress\n  enabled: false\n");
        let value = from_yaml("enabled: true\nname: other\n").unwrap();
        set_tree(&mut once, &path("gateways.[name:ingress]"), value.clone()).unwrap();
        assert_eq!(once, tree("gateways:\n- name: ingress\n  enabled: true\n"));

        let mut twice = once.clone();
        set_tree(&mut twice, &path("gateways.[name:ingress]"), value.clone()).unwrap();
        assert_eq!(once, twice);

        let mut appended = Map::new();
        set_tree(&mut appended, &path("gateways.[name:x]"), value.clone()).unwrap();
        set_tree(&mut appended, &path("gateways.[name:x]"), value).unwrap();
        assert_eq!(appended, tree("gateways:\n- name: x\n  enabled: true\n"));
    }

    #[test]
    fn test_set_terminal_kv_selector_rejects_scalar() {
        let mut t = tree("gateways:\n- name: ingress\n");
        let err = set_tree(&mut t, &path("gateways.[name:x]"), "scalar".into()).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidValue { .. }));
        assert_eq!(t, tree("gateways:\n- name: ingress\n"));
    }

    #[test]
    fn test_set_type_mismatch() {
        let mut t = tree("a: scalar\n");
        let err = set_tree(&mut t, &path("a.[name:x]"), Value::Int(1)).unwrap_err();
        assert_eq!(err, TranslateError::type_mismatch("a", "[name:x]", "string"));

        let err = set_tree(&mut t, &path("[name:x]"), Value::Int(1)).unwrap_err();
        assert!(matches!(err, TranslateError::TypeMismatch { .. }));
    }
}
