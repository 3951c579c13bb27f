//! Tests for overlay patching of object sets.

#[cfg(test)]
mod tests {
    use crate::manifest::parse_objects;
    use crate::overlay::{patch, K8sObjectOverlay, PathValue};
    use crate::value::{from_yaml, Value};
    use pretty_assertions::assert_eq;

    const BASE: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: test
  namespace: istio-system
a:
  b:
  - name: n1
    value: v1
  - name: n2
    list:
    - v1
    - v2
    - v3_regex
---
apiVersion: v1
kind: Service
metadata:
  name: test
"#;

    fn overlay(patches: Vec<PathValue>) -> K8sObjectOverlay {
        K8sObjectOverlay {
            kind: "Pod".into(),
            name: "test".into(),
            namespace: "istio-system".into(),
            patches,
        }
    }

    /// Runs the patch and returns the decoded documents of the output.
    fn run(overlays: &[K8sObjectOverlay]) -> Vec<Value> {
        let base = parse_objects(BASE).unwrap();
        let out = patch(&base, "istio-system", overlays).unwrap();
        parse_objects(&out)
            .unwrap()
            .into_iter()
            .map(|o| Value::Map(o.into_body()))
            .collect()
    }

    fn a_b(doc: &Value) -> &Value {
        doc.lookup(&["a", "b"]).unwrap()
    }

    #[test]
    fn test_list_value_update() {
        let docs = run(&[overlay(vec![PathValue::set("a.b.[name:n1].value", "v2")])]);
        assert_eq!(
            a_b(&docs[0]).as_list().unwrap()[0].lookup(&["value"]),
            Some(&Value::from("v2"))
        );
    }

    #[test]
    fn test_leaf_list_delete() {
        let docs = run(&[overlay(vec![PathValue::delete("a.b.[name:n2].list.[v2]")])]);
        assert_eq!(
            a_b(&docs[0]).as_list().unwrap()[1].lookup(&["list"]),
            Some(&from_yaml("[v1, v3_regex]").unwrap())
        );
    }

    #[test]
    fn test_list_entry_delete() {
        let docs = run(&[overlay(vec![PathValue::delete("a.b.[name:n1]")])]);
        assert_eq!(
            a_b(&docs[0]),
            &from_yaml("- name: n2\n  list: [v1, v2, v3_regex]\n").unwrap()
        );
    }

    #[test]
    fn test_delete_twice_is_same_as_once() {
        let once = run(&[overlay(vec![PathValue::delete("a.b.[name:n1]")])]);
        let twice = run(&[overlay(vec![
            PathValue::delete("a.b.[name:n1]"),
            PathValue::delete("a.b.[name:n1]"),
        ])]);
        assert_eq!(once, twice);

        let base = parse_objects(BASE).unwrap();
        let ov = [overlay(vec![PathValue::delete("a.b.[name:n1]")])];
        let first = patch(&base, "istio-system", &ov).unwrap();
        let second = patch(&parse_objects(&first).unwrap(), "istio-system", &ov).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_null_value_deletes_map_key() {
        let pv = PathValue {
            path: "metadata.namespace".into(),
            value: Some(Value::Null),
        };
        let docs = run(&[overlay(vec![
            PathValue::delete("a.b"),
            PathValue::set("a.c", Value::Int(1)),
        ])]);
        assert_eq!(docs[0].lookup(&["a"]), Some(&from_yaml("c: 1").unwrap()));

        let docs = run(&[overlay(vec![pv])]);
        assert_eq!(docs[0].lookup(&["metadata", "namespace"]), None);
    }

    #[test]
    fn test_failing_patch_is_skipped() {
        let docs = run(&[overlay(vec![
            PathValue::set("a.b.[name:missing].value", "x"),
            PathValue::set("metadata.name.[k:v]", "x"),
            PathValue::set("a.[", "x"),
            PathValue::set("a.b.[name:n2].list.[v1]", "v0"),
        ])]);
        assert_eq!(
            a_b(&docs[0]).as_list().unwrap()[1].lookup(&["list"]),
            Some(&from_yaml("[v0, v2, v3_regex]").unwrap())
        );
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let mut missing = overlay(vec![PathValue::delete("a")]);
        missing.name = "other".into();
        let base = parse_objects(BASE).unwrap();
        let out = patch(&base, "istio-system", &[missing]).unwrap();
        assert_eq!(out, base.yaml().unwrap());
    }

    #[test]
    fn test_untouched_objects_follow_patched_ones() {
        let mut svc = overlay(vec![PathValue::set("spec", from_yaml("type: NodePort").unwrap())]);
        svc.kind = "Service".into();
        svc.namespace = String::new();

        let docs = run(&[svc]);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].lookup(&["kind"]), Some(&Value::from("Service")));
        assert_eq!(
            docs[0].lookup(&["spec", "type"]),
            Some(&Value::from("NodePort"))
        );
        assert_eq!(docs[1].lookup(&["kind"]), Some(&Value::from("Pod")));
    }

    #[test]
    fn test_overlays_for_same_object_accumulate() {
        let docs = run(&[
            overlay(vec![PathValue::set("a.b.[name:n1].value", "v2")]),
            overlay(vec![PathValue::delete("a.b.[name:n2]")]),
        ]);
        assert_eq!(docs.len(), 2);
        assert_eq!(a_b(&docs[0]), &from_yaml("- name: n1\n  value: v2\n").unwrap());
    }

    #[test]
    fn test_namespace_must_match() {
        let mut wrong_ns = overlay(vec![PathValue::delete("a")]);
        wrong_ns.namespace = "default".into();
        let docs = run(&[wrong_ns]);
        assert!(docs[0].lookup(&["a"]).is_some());
    }

    #[test]
    fn test_dotted_annotation_key() {
        let base = parse_objects(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: test\n  namespace: istio-system\n  annotations:\n    sidecar.istio.io/inject: \"true\"\n",
        )
        .unwrap();
        let ov = [overlay(vec![PathValue::set(
            r"metadata.annotations.sidecar\.istio\.io/inject",
            "false",
        )])];
        let out = parse_objects(&patch(&base, "istio-system", &ov).unwrap()).unwrap();
        let pod = out.iter().next().unwrap();
        assert_eq!(
            pod.nested_field(&["metadata", "annotations", "sidecar.istio.io/inject"]),
            Some(&Value::from("false"))
        );
    }

    #[test]
    fn test_overlay_yaml_format() {
        let overlays: Vec<K8sObjectOverlay> = serde_yaml::from_str(
            r#"
- kind: Deployment
  name: istio-pilot
  patches:
  - path: spec.replicas
    value: 3
  - path: spec.template.metadata.annotations
"#,
        )
        .unwrap();
        assert_eq!(overlays[0].namespace, "");
        assert_eq!(overlays[0].patches[0], PathValue::set("spec.replicas", Value::Int(3)));
        assert_eq!(overlays[0].patches[1], PathValue::delete("spec.template.metadata.annotations"));
    }
}
