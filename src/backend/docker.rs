//! Docker CLI backend
//!
//! Every call maps a failure to the error class of its phase: an unreachable
//! daemon is a precondition failure, a rejected login a credential failure,
//! and so on. Build and push stream their output; the rest is captured.

use super::ContainerEngine;
use super::exec::{self, describe_status};
use crate::core::error::{DeployError, DeployResult, PreconditionError};
use std::path::Path;
use std::process::Command;

/// Container engine using the system `docker` binary
pub struct SystemDocker {
  program: String,
}

impl SystemDocker {
  pub fn new() -> Self {
    Self {
      program: "docker".to_string(),
    }
  }

  fn docker_cmd(&self) -> Command {
    Command::new(&self.program)
  }
}

impl Default for SystemDocker {
  fn default() -> Self {
    Self::new()
  }
}

impl ContainerEngine for SystemDocker {
  fn ping(&self) -> DeployResult<()> {
    let captured = exec::capture(self.docker_cmd().args(["info", "--format", "{{.ServerVersion}}"]))?;
    if !captured.success() {
      return Err(PreconditionError::DaemonUnreachable {
        reason: captured.reason(),
      }
      .into());
    }
    tracing::debug!(server = captured.stdout.trim(), "docker daemon reachable");
    Ok(())
  }

  fn login(&self, registry: &str, username: &str, password: Option<&str>) -> DeployResult<()> {
    let mut cmd = self.docker_cmd();
    cmd.arg("login");
    if registry != "docker.io" {
      cmd.arg(registry);
    }

    let status = match password {
      Some(password) => {
        cmd.args(["--username", username, "--password-stdin"]);
        let captured = exec::capture_with_input(&mut cmd, Some(password))?;
        if !captured.success() {
          return Err(DeployError::Credential {
            registry: registry.to_string(),
            reason: captured.reason(),
          });
        }
        captured.status
      }
      // Stored credentials, or an interactive prompt on the operator's terminal
      None => exec::stream(&mut cmd)?,
    };

    if !status.success() {
      return Err(DeployError::Credential {
        registry: registry.to_string(),
        reason: describe_status(status),
      });
    }
    tracing::info!(registry, username, "registry login succeeded");
    Ok(())
  }

  fn build(&self, context: &Path, dockerfile: Option<&Path>, image: &str) -> DeployResult<()> {
    let mut cmd = self.docker_cmd();
    cmd.args(["build", "--tag", image]);
    if let Some(dockerfile) = dockerfile {
      cmd.arg("--file").arg(dockerfile);
    }
    cmd.arg(context);

    let status = exec::stream(&mut cmd)?;
    if !status.success() {
      return Err(DeployError::Build {
        image: image.to_string(),
        reason: describe_status(status),
      });
    }
    Ok(())
  }

  fn tag(&self, source: &str, target: &str) -> DeployResult<()> {
    let captured = exec::capture(self.docker_cmd().args(["tag", source, target]))?;
    if !captured.success() {
      return Err(DeployError::Publish {
        image: target.to_string(),
        reason: captured.reason(),
      });
    }
    Ok(())
  }

  fn push(&self, image: &str) -> DeployResult<()> {
    let status = exec::stream(self.docker_cmd().args(["push", image]))?;
    if !status.success() {
      return Err(DeployError::Publish {
        image: image.to_string(),
        reason: describe_status(status),
      });
    }
    Ok(())
  }

  fn is_published(&self, image: &str) -> DeployResult<bool> {
    let captured = exec::capture(self.docker_cmd().args(["manifest", "inspect", image]))?;
    if captured.success() {
      return Ok(true);
    }
    tracing::debug!(image, reason = %captured.reason(), "manifest inspect failed");
    let output = format!("{}\n{}", captured.stderr, captured.stdout);
    inspect_failure(image, &output, captured.reason())
  }
}

const MISSING_MARKERS: [&str; 3] = ["no such manifest", "manifest unknown", "not found"];
const AUTH_MARKERS: [&str; 3] = ["unauthorized", "authentication required", "access to the resource is denied"];

/// Only a registry answer that the manifest does not exist means "not published"
fn inspect_failure(image: &str, output: &str, reason: String) -> DeployResult<bool> {
  let output = output.to_lowercase();
  if MISSING_MARKERS.iter().any(|m| output.contains(m)) {
    return Ok(false);
  }
  if AUTH_MARKERS.iter().any(|m| output.contains(m)) {
    return Err(DeployError::Credential {
      registry: registry_of(image).to_string(),
      reason,
    });
  }
  Err(DeployError::Publish {
    image: image.to_string(),
    reason: format!("could not inspect the registry: {}", reason),
  })
}

/// Registry host of an image reference; Docker Hub when the first component is not a host
fn registry_of(image: &str) -> &str {
  match image.split_once('/') {
    Some((host, _)) if host.contains('.') || host.contains(':') || host == "localhost" => host,
    _ => "docker.io",
  }
}
