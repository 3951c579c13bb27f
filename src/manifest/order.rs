//! Apply order of object kinds.

use super::object::Object;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::warn;

/// Score of kinds missing from the table.
pub const DEFAULT_SCORE: i32 = 1000;

/// Lower scores are applied first.
static APPLY_ORDER: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    HashMap::from([
        ("CustomResourceDefinition", -1000),
        ("ServiceAccount", 1),
        ("ClusterRole", 1),
        ("ClusterRoleBinding", 2),
        ("ConfigMap", 100),
        ("Secret", 100),
        ("Deployment", 1000),
        ("HorizontalPodAutoscaler", 1001),
        ("Service", 10000),
    ])
});

/// Returns the apply-order score of `kind`.
pub fn kind_score(kind: &str) -> i32 {
    match APPLY_ORDER.get(kind) {
        Some(score) => *score,
        None => {
            warn!(kind, "no apply order for kind, using default");
            DEFAULT_SCORE
        }
    }
}

/// Score function for [`ObjectSet::sort`](super::ObjectSet::sort).
pub fn default_score(object: &Object) -> i32 {
    kind_score(object.kind())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_scores() {
        assert!(kind_score("CustomResourceDefinition") < kind_score("ServiceAccount"));
        assert!(kind_score("ClusterRole") < kind_score("ClusterRoleBinding"));
        assert!(kind_score("Deployment") < kind_score("HorizontalPodAutoscaler"));
        assert!(kind_score("HorizontalPodAutoscaler") < kind_score("Service"));
        assert_eq!(kind_score("PodDisruptionBudget"), DEFAULT_SCORE);
    }
}
