//! kubectl backend

use super::ClusterClient;
use super::exec;
use crate::core::error::{DeployError, DeployResult};
use crate::release::rollout::DeploymentStatus;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Cluster client using the system `kubectl` binary and its current context
pub struct SystemKubectl {
  program: String,
}

impl SystemKubectl {
  pub fn new() -> Self {
    Self {
      program: "kubectl".to_string(),
    }
  }

  fn kubectl_cmd(&self, namespace: &str) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd.args(["--namespace", namespace]);
    cmd
  }
}

impl Default for SystemKubectl {
  fn default() -> Self {
    Self::new()
  }
}

impl ClusterClient for SystemKubectl {
  fn apply(&self, manifest: &Path, namespace: &str) -> DeployResult<()> {
    let mut cmd = self.kubectl_cmd(namespace);
    cmd.arg("apply").arg("--filename").arg(manifest);

    let captured = exec::capture(&mut cmd)?;
    if !captured.success() {
      return Err(DeployError::Apply {
        namespace: namespace.to_string(),
        reason: captured.reason(),
      });
    }
    for line in captured.stdout.lines().filter(|l| !l.trim().is_empty()) {
      tracing::info!(namespace, "{}", line.trim());
    }
    Ok(())
  }

  fn deployment_status(&self, name: &str, namespace: &str, limit: Duration) -> DeployResult<DeploymentStatus> {
    let mut cmd = self.kubectl_cmd(namespace);
    cmd.args(["get", "deployment", name, "--output", "json"]);
    cmd.arg(format!("--request-timeout={}", request_timeout(limit)));

    let captured = exec::capture_within(&mut cmd, limit)?;
    if !captured.success() {
      return Err(DeployError::message(format!(
        "kubectl get deployment/{} failed: {}",
        name,
        captured.reason()
      )));
    }
    DeploymentStatus::from_json(&captured.stdout)
  }
}

/// kubectl duration for a request limit; `0` would mean no timeout, so round up to whole seconds
fn request_timeout(limit: Duration) -> String {
  let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
  format!("{}s", secs.max(1))
}
