//! Translation rules from a [`ControlPlaneSpec`](super::ControlPlaneSpec) to chart values.

use super::components::COMPONENTS;
use crate::path::Path;
use crate::translate::{set_tree, Mappings, TranslateError};
use crate::value::{Map, Value};

/// Returns the rules translating a control-plane spec into chart values.
pub fn default_mappings() -> Mappings {
    let mut m = Mappings::new();
    // Built-in: every rule path is a literal covered by the tests below.
    add_rules(&mut m).expect("built-in mappings should parse");
    m
}

fn add_rules(m: &mut Mappings) -> Result<(), crate::path::ParseError> {
    m.add("hub", "global.hub")?
        .add_with("tag", "global.tag", translate_tag)?
        .add("defaultNamespace", "global.istioNamespace")?
        .add("values", "")?;

    for c in COMPONENTS {
        let src = format!("components.{}", c.field);
        let dst = c.values_prefix;
        m.add(&format!("{src}.enabled"), &format!("{dst}.enabled"))?
            .add(&format!("{src}.namespace"), &format!("{dst}.namespace"))?
            .add(&format!("{src}.hub"), &format!("{dst}.hub"))?
            .add_with(&format!("{src}.tag"), &format!("{dst}.tag"), translate_tag)?
            .add(&format!("{src}.k8s"), dst)?
            .add(
                &format!("{src}.k8s.hpaSpec.minReplicas"),
                &format!("{dst}.autoscaleMin"),
            )?
            .add(
                &format!("{src}.k8s.hpaSpec.maxReplicas"),
                &format!("{dst}.autoscaleMax"),
            )?;
    }
    Ok(())
}

/// Writes image tags as strings; YAML reads `1.4` as a number.
fn translate_tag(tree: &mut Map, dest: &Path, value: &Value) -> Result<(), TranslateError> {
    let tag = match value {
        Value::String(s) if s.is_empty() => return Ok(()),
        Value::String(s) => s.clone(),
        Value::Int(_) | Value::Float(_) => value.to_plain_string(),
        other => {
            return Err(TranslateError::invalid_value(
                dest.to_string(),
                format!("tag must be a string or a number, found {}", other.kind_name()),
            ))
        }
    };
    set_tree(tree, dest, Value::String(tag))
}
