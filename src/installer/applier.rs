//! Appliers push manifests to a cluster.

use super::ApplyError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Applier applies manifests and reports CRD readiness.
#[async_trait]
pub trait Applier: Send + Sync {
    /// Applies a multi-document manifest. `namespace` is the default for
    /// objects that do not name one; an empty string leaves it unset.
    async fn apply(
        &self,
        namespace: &str,
        manifest: &str,
        extra_args: &[String],
    ) -> Result<(), ApplyError>;

    /// Reports whether the named CRD has the Established condition.
    async fn crd_established(&self, name: &str) -> Result<bool, ApplyError>;
}

/// KubectlApplier shells out to `kubectl`, streaming manifests on stdin.
#[derive(Debug, Clone)]
pub struct KubectlApplier {
    program: PathBuf,
}

impl Default for KubectlApplier {
    fn default() -> Self {
        KubectlApplier::new("kubectl")
    }
}

impl KubectlApplier {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        KubectlApplier {
            program: program.into(),
        }
    }

    /// Builds the arguments of an apply invocation.
    pub fn apply_args(namespace: &str, extra_args: &[String]) -> Vec<String> {
        let mut args = vec!["apply".to_string()];
        if !namespace.is_empty() {
            args.push("--namespace".to_string());
            args.push(namespace.to_string());
        }
        args.extend(extra_args.iter().cloned());
        args.push("-f".to_string());
        args.push("-".to_string());
        args
    }

    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<Vec<u8>, ApplyError> {
        let program = self.program.display().to_string();
        let command = format!("{} {}", program, args.join(" "));
        debug!(command = %command, "running");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ApplyError::Spawn {
                program: program.clone(),
                source,
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|source| ApplyError::Spawn {
                    program: program.clone(),
                    source,
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ApplyError::Spawn { program, source })?;
        if !output.status.success() {
            return Err(ApplyError::Command {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl Applier for KubectlApplier {
    async fn apply(
        &self,
        namespace: &str,
        manifest: &str,
        extra_args: &[String],
    ) -> Result<(), ApplyError> {
        let args = KubectlApplier::apply_args(namespace, extra_args);
        let stdout = self.run(&args, Some(manifest)).await?;
        for line in String::from_utf8_lossy(&stdout).lines() {
            info!("{}", line);
        }
        Ok(())
    }

    async fn crd_established(&self, name: &str) -> Result<bool, ApplyError> {
        let args = ["get", "crd", name, "-o", "json"].map(String::from);
        let stdout = match self.run(&args, None).await {
            Ok(stdout) => stdout,
            // Not visible to the API server yet.
            Err(ApplyError::Command { stderr, .. }) if is_not_found(&stderr) => {
                debug!(crd = %name, stderr = %stderr, "CRD not found yet");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let crd: serde_json::Value =
            serde_json::from_slice(&stdout).map_err(|e| ApplyError::CrdStatus {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(is_established(&crd))
    }
}

/// Reports whether kubectl's error output says the resource does not exist.
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("NotFound") || stderr.contains("not found")
}

/// Reports whether a CRD status carries `Established=True`.
pub fn is_established(crd: &serde_json::Value) -> bool {
    crd.pointer("/status/conditions")
        .and_then(|c| c.as_array())
        .map(|conditions| {
            conditions.iter().any(|c| {
                c.get("type").and_then(|t| t.as_str()) == Some("Established")
                    && c.get("status").and_then(|s| s.as_str()) == Some("True")
            })
        })
        .unwrap_or(false)
}

/// DryRunApplier logs what would be applied and changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunApplier;

#[async_trait]
impl Applier for DryRunApplier {
    async fn apply(
        &self,
        namespace: &str,
        manifest: &str,
        extra_args: &[String],
    ) -> Result<(), ApplyError> {
        info!(
            namespace = %namespace,
            args = %extra_args.join(" "),
            bytes = manifest.len(),
            "dry run: skipping apply"
        );
        Ok(())
    }

    async fn crd_established(&self, _name: &str) -> Result<bool, ApplyError> {
        Ok(true)
    }
}
