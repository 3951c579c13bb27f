//! Installation sessions.

use super::{Applier, ApplyError, DependencyTree, InstallError};
use crate::manifest::{default_score, parse_objects, ObjectSet, CRD_KIND};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// InstallOptions control how components are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Default namespace passed to the applier; empty leaves it unset.
    pub namespace: String,
    /// Label key carrying the component name, used as the prune selector.
    pub component_label: String,
    pub crd_poll_interval: Duration,
    pub crd_timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            namespace: String::new(),
            component_label: "component".to_string(),
            crd_poll_interval: Duration::from_millis(500),
            crd_timeout: Duration::from_secs(60),
        }
    }
}

/// ComponentOutcome is the result of installing one component.
#[derive(Debug)]
pub enum ComponentOutcome {
    Applied { objects: usize },
    /// The component had no manifest; its dependents were released.
    NoManifest,
    /// The parent did not finish, so the component was not attempted.
    Skipped,
    Failed(ApplyError),
}

impl ComponentOutcome {
    /// Reports whether dependents may proceed.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ComponentOutcome::Applied { .. } | ComponentOutcome::NoManifest
        )
    }
}

/// InstallReport holds the outcome of every component of a session.
#[derive(Debug, Default)]
pub struct InstallReport {
    outcomes: IndexMap<String, ComponentOutcome>,
}

impl InstallReport {
    pub fn outcome(&self, component: &str) -> Option<&ComponentOutcome> {
        self.outcomes.get(component)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ComponentOutcome)> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failed(&self) -> Vec<String> {
        self.names(|o| matches!(o, ComponentOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> Vec<String> {
        self.names(|o| matches!(o, ComponentOutcome::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(ComponentOutcome::is_success)
    }

    fn names(&self, f: impl Fn(&ComponentOutcome) -> bool) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, o)| f(o))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// InstallSession applies a set of component manifests along a dependency tree.
///
/// Every call to [`apply`](InstallSession::apply) creates its own
/// completion signals, so a session can be reused.
pub struct InstallSession {
    tree: DependencyTree,
    applier: Arc<dyn Applier>,
    options: InstallOptions,
}

impl InstallSession {
    pub fn new(tree: DependencyTree, applier: Arc<dyn Applier>, options: InstallOptions) -> Self {
        InstallSession {
            tree,
            applier,
            options,
        }
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Applies `manifests`, keyed by component name, and fails if any
    /// component failed or was skipped.
    pub async fn apply(
        &self,
        manifests: IndexMap<String, String>,
    ) -> Result<InstallReport, InstallError> {
        let report = self.run(manifests).await;
        if report.is_success() {
            Ok(report)
        } else {
            Err(InstallError::ComponentsFailed {
                failed: report.failed(),
                skipped: report.skipped(),
            })
        }
    }

    /// Applies `manifests` and reports the outcome of every component.
    ///
    /// Components of the tree without a manifest complete at once. Manifests
    /// of components outside the tree are applied without waiting.
    pub async fn run(&self, mut manifests: IndexMap<String, String>) -> InstallReport {
        let mut waits: HashMap<String, oneshot::Receiver<()>> = HashMap::new();
        let mut signals: HashMap<String, Vec<oneshot::Sender<()>>> = HashMap::new();
        for (parent, child) in self.tree.edges() {
            let (tx, rx) = oneshot::channel();
            signals.entry(parent.to_string()).or_default().push(tx);
            waits.insert(child.to_string(), rx);
        }

        let mut names: IndexSet<String> =
            self.tree.components().into_iter().map(String::from).collect();
        for name in manifests.keys() {
            if names.insert(name.clone()) {
                warn!(component = %name, "component is not in the dependency tree, applying without waiting");
            }
        }

        let mut tasks = JoinSet::new();
        for name in &names {
            let worker = Worker {
                name: name.clone(),
                manifest: manifests.shift_remove(name),
                wait: waits.remove(name),
                signals: signals.remove(name).unwrap_or_default(),
                applier: Arc::clone(&self.applier),
                options: self.options.clone(),
            };
            let span = info_span!("component", name = %name);
            tasks.spawn(worker.run().instrument(span));
        }

        let mut finished = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    finished.insert(name, outcome);
                }
                Err(e) => error!(error = %e, "component task panicked"),
            }
        }

        // Report in tree order; a panicked task shows up as failed.
        let outcomes = names
            .into_iter()
            .map(|name| {
                let outcome = finished.remove(&name).unwrap_or_else(|| {
                    ComponentOutcome::Failed(ApplyError::Command {
                        command: format!("install {name}"),
                        status: "panicked".to_string(),
                        stderr: String::new(),
                    })
                });
                (name, outcome)
            })
            .collect();
        InstallReport { outcomes }
    }
}

struct Worker {
    name: String,
    manifest: Option<String>,
    wait: Option<oneshot::Receiver<()>>,
    signals: Vec<oneshot::Sender<()>>,
    applier: Arc<dyn Applier>,
    options: InstallOptions,
}

impl Worker {
    async fn run(self) -> (String, ComponentOutcome) {
        let Worker {
            name,
            manifest,
            wait,
            signals,
            applier,
            options,
        } = self;

        if let Some(wait) = wait {
            debug!("waiting for parent");
            if wait.await.is_err() {
                warn!("parent did not complete, skipping");
                return (name, ComponentOutcome::Skipped);
            }
        }

        let outcome = match manifest.filter(|m| !m.trim().is_empty()) {
            None => {
                debug!("no manifest");
                ComponentOutcome::NoManifest
            }
            Some(manifest) => {
                match apply_component(&name, &manifest, applier.as_ref(), &options).await {
                    Ok(objects) => {
                        info!(objects, "component applied");
                        ComponentOutcome::Applied { objects }
                    }
                    Err(e) => {
                        error!(error = %e, "component failed");
                        ComponentOutcome::Failed(e)
                    }
                }
            }
        };

        // Dropped senders tell dependents to skip.
        if outcome.is_success() {
            for signal in signals {
                let _ = signal.send(());
            }
        }
        (name, outcome)
    }
}

/// Labels, orders and applies the objects of one component.
///
/// CRDs are applied first and waited for; the full set is then applied
/// with pruning of labelled objects that are no longer present.
pub async fn apply_component(
    name: &str,
    manifest: &str,
    applier: &dyn Applier,
    options: &InstallOptions,
) -> Result<usize, ApplyError> {
    let mut objects = parse_objects(manifest)?;
    for object in objects.iter_mut() {
        object.add_labels([(options.component_label.as_str(), name)])?;
    }
    objects.sort(default_score);

    let crds = objects.filter_kind(CRD_KIND);
    if !crds.is_empty() {
        info!(count = crds.len(), "applying CRDs");
        applier.apply(&options.namespace, &crds.yaml()?, &[]).await?;
        wait_for_crds(applier, &crds, options.crd_poll_interval, options.crd_timeout).await?;
    }

    let args = prune_args(&options.component_label, name);
    applier.apply(&options.namespace, &objects.yaml()?, &args).await?;
    Ok(objects.len())
}

/// Arguments pruning objects of `component` missing from the applied set.
pub fn prune_args(label: &str, component: &str) -> Vec<String> {
    vec![
        "--force".to_string(),
        "--prune".to_string(),
        "--selector".to_string(),
        format!("{label}={component}"),
    ]
}

/// Polls until every CRD in `crds` is established or `timeout` passes.
pub async fn wait_for_crds(
    applier: &dyn Applier,
    crds: &ObjectSet,
    interval: Duration,
    timeout: Duration,
) -> Result<(), ApplyError> {
    let deadline = Instant::now() + timeout;
    let mut pending: Vec<String> = crds.iter().map(|c| c.name().to_string()).collect();

    loop {
        let mut waiting = Vec::new();
        for name in pending {
            if !applier.crd_established(&name).await? {
                waiting.push(name);
            }
        }
        if waiting.is_empty() {
            debug!("CRDs established");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ApplyError::CrdTimeout {
                timeout,
                pending: waiting.join(", "),
            });
        }
        debug!(pending = waiting.len(), "waiting for CRDs");
        pending = waiting;
        tokio::time::sleep(interval).await;
    }
}
