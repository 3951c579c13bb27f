//! Tests for dependency-ordered installation.

#[cfg(test)]
mod tests {
    use crate::installer::{
        prune_args, Applier, ApplyError, ComponentOutcome, DependencyTree, InstallError,
        InstallOptions, InstallSession,
    };
    use crate::manifest::parse_objects;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct Call {
        component: String,
        namespace: String,
        kinds: Vec<String>,
        args: Vec<String>,
    }

    /// Records every apply; fails full applies of the listed components.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail: Vec<String>,
        crd_ready_after: Option<usize>,
        polls: AtomicUsize,
        delay: Duration,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn position(&self, component: &str) -> usize {
            self.calls()
                .iter()
                .position(|c| c.component == component)
                .unwrap()
        }
    }

    #[async_trait]
    impl Applier for Recorder {
        async fn apply(
            &self,
            namespace: &str,
            manifest: &str,
            extra_args: &[String],
        ) -> Result<(), ApplyError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let objects = parse_objects(manifest).unwrap();
            let component = objects
                .iter()
                .next()
                .and_then(|o| o.labels())
                .and_then(|l| l.get("component"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            self.calls.lock().unwrap().push(Call {
                component: component.clone(),
                namespace: namespace.to_string(),
                kinds: objects.iter().map(|o| o.kind().to_string()).collect(),
                args: extra_args.to_vec(),
            });
            if !extra_args.is_empty() && self.fail.contains(&component) {
                return Err(ApplyError::Command {
                    command: "kubectl apply".into(),
                    status: "exit status: 1".into(),
                    stderr: format!("{component} rejected"),
                });
            }
            Ok(())
        }

        async fn crd_established(&self, _name: &str) -> Result<bool, ApplyError> {
            let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(self.crd_ready_after.map_or(false, |after| polls >= after))
        }
    }

    fn deployment(name: &str) -> String {
        format!("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {name}\n")
    }

    const CRD: &str = "apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: gateways.networking.istio.io
";

    fn tree(entries: &[(&str, &[&str])]) -> DependencyTree {
        let deps: IndexMap<String, Vec<String>> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        DependencyTree::build(entries[0].0, &deps).unwrap()
    }

    fn manifests(entries: &[(&str, String)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn session(tree: DependencyTree, recorder: &Arc<Recorder>) -> InstallSession {
        let applier: Arc<dyn Applier> = recorder.clone();
        InstallSession::new(
            tree,
            applier,
            InstallOptions {
                namespace: "istio-system".into(),
                ..InstallOptions::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependents_wait_for_parent() {
        let recorder = Arc::new(Recorder {
            delay: Duration::from_millis(50),
            ..Recorder::default()
        });
        let s = session(tree(&[("Base", &["Pilot", "Galley"])]), &recorder);
        let report = s
            .apply(manifests(&[
                ("Pilot", deployment("istio-pilot")),
                ("Galley", deployment("istio-galley")),
                ("Base", "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: istio\n".into()),
            ]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(recorder.position("Base"), 0);
        assert_eq!(recorder.calls().len(), 3);
        assert!(matches!(
            report.outcome("Pilot"),
            Some(ComponentOutcome::Applied { objects: 1 })
        ));
    }

    #[tokio::test]
    async fn test_failure_skips_dependents() {
        let recorder = Arc::new(Recorder {
            fail: vec!["B".into()],
            ..Recorder::default()
        });
        let s = session(tree(&[("A", &["B", "D"]), ("B", &["C"])]), &recorder);
        let input = manifests(&[
            ("A", deployment("a")),
            ("B", deployment("b")),
            ("C", deployment("c")),
            ("D", deployment("d")),
        ]);

        let report = s.run(input.clone()).await;
        assert!(matches!(report.outcome("A"), Some(ComponentOutcome::Applied { .. })));
        assert!(matches!(report.outcome("B"), Some(ComponentOutcome::Failed(_))));
        assert!(matches!(report.outcome("C"), Some(ComponentOutcome::Skipped)));
        assert!(matches!(report.outcome("D"), Some(ComponentOutcome::Applied { .. })));
        assert!(recorder.calls().iter().all(|c| c.component != "C"));

        match s.apply(input).await.unwrap_err() {
            InstallError::ComponentsFailed { failed, skipped } => {
                assert_eq!(failed, vec!["B".to_string()]);
                assert_eq!(skipped, vec!["C".to_string()]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_manifest_releases_dependents() {
        let recorder = Arc::new(Recorder::default());
        let s = session(tree(&[("Base", &["Pilot"])]), &recorder);
        let report = s
            .apply(manifests(&[("Pilot", deployment("istio-pilot"))]))
            .await
            .unwrap();
        assert!(matches!(report.outcome("Base"), Some(ComponentOutcome::NoManifest)));
        assert!(matches!(report.outcome("Pilot"), Some(ComponentOutcome::Applied { .. })));
        assert_eq!(report.len(), 2);
    }

    #[tokio::test]
    async fn test_objects_are_labelled_and_pruned() {
        let recorder = Arc::new(Recorder::default());
        let s = session(tree(&[("Base", &[])]), &recorder);
        s.apply(manifests(&[("Base", deployment("istio"))]))
            .await
            .unwrap();

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].component, "Base");
        assert_eq!(calls[0].namespace, "istio-system");
        assert_eq!(calls[0].args, prune_args("component", "Base"));
        assert_eq!(
            calls[0].args,
            vec!["--force", "--prune", "--selector", "component=Base"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_crds_are_applied_and_established_first() {
        let recorder = Arc::new(Recorder {
            crd_ready_after: Some(3),
            ..Recorder::default()
        });
        let s = session(tree(&[("Base", &[])]), &recorder);
        let manifest = format!("{}---\n{}", deployment("istio"), CRD);
        s.apply(manifests(&[("Base", manifest)])).await.unwrap();

        let calls = recorder.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kinds, vec!["CustomResourceDefinition"]);
        assert!(calls[0].args.is_empty());
        assert_eq!(calls[1].kinds, vec!["CustomResourceDefinition", "Deployment"]);
        assert_eq!(recorder.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crd_timeout_fails_component() {
        let recorder = Arc::new(Recorder::default());
        let s = session(tree(&[("Base", &["Pilot"])]), &recorder);
        let report = s
            .run(manifests(&[
                ("Base", CRD.to_string()),
                ("Pilot", deployment("istio-pilot")),
            ]))
            .await;

        match report.outcome("Base") {
            Some(ComponentOutcome::Failed(ApplyError::CrdTimeout { timeout, pending })) => {
                assert_eq!(*timeout, Duration::from_secs(60));
                assert_eq!(pending, "gateways.networking.istio.io");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(report.outcome("Pilot"), Some(ComponentOutcome::Skipped)));
        // One poll per interval until the deadline.
        let polls = recorder.polls.load(Ordering::SeqCst);
        assert!((119..=122).contains(&polls), "{polls} polls");
    }

    #[tokio::test]
    async fn test_component_outside_tree_is_applied() {
        let recorder = Arc::new(Recorder::default());
        let s = session(tree(&[("Base", &[])]), &recorder);
        let report = s
            .apply(manifests(&[("Extra", deployment("extra"))]))
            .await
            .unwrap();
        assert!(matches!(report.outcome("Extra"), Some(ComponentOutcome::Applied { .. })));
    }

    #[tokio::test]
    async fn test_session_can_run_twice() {
        let recorder = Arc::new(Recorder::default());
        let s = session(tree(&[("Base", &["Pilot"])]), &recorder);
        let input = manifests(&[
            ("Base", deployment("base")),
            ("Pilot", deployment("pilot")),
        ]);
        s.apply(input.clone()).await.unwrap();
        s.apply(input).await.unwrap();
        assert_eq!(recorder.calls().len(), 4);
    }
}
