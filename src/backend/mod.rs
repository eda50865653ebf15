//! External tool backends
//!
//! The release pipeline talks to the container engine and the cluster only
//! through these traits. `SystemDocker` and `SystemKubectl` drive the real
//! CLIs; tests substitute recording fakes.

mod docker;
mod envsubst;
mod exec;
mod kubectl;

pub use docker::SystemDocker;
pub use envsubst::Envsubst;
pub use kubectl::SystemKubectl;

use crate::core::error::DeployResult;
use crate::release::rollout::DeploymentStatus;
use std::path::Path;
use std::time::Duration;

/// Container build backend and registry client
pub trait ContainerEngine {
  /// Fail unless the daemon answers
  fn ping(&self) -> DeployResult<()>;

  /// Authenticate; `None` falls back to stored or interactive credentials
  fn login(&self, registry: &str, username: &str, password: Option<&str>) -> DeployResult<()>;

  /// Build `image` from `context`
  fn build(&self, context: &Path, dockerfile: Option<&Path>, image: &str) -> DeployResult<()>;

  /// Add `target` as another name for `source`
  fn tag(&self, source: &str, target: &str) -> DeployResult<()>;

  /// Publish `image` to its registry
  fn push(&self, image: &str) -> DeployResult<()>;

  /// Whether the registry already holds `image`
  fn is_published(&self, image: &str) -> DeployResult<bool>;
}

/// Cluster control plane client
pub trait ClusterClient {
  /// Idempotent apply of a manifest file
  fn apply(&self, manifest: &Path, namespace: &str) -> DeployResult<()>;

  /// Read-only status of a deployment; gives up once `limit` has passed
  fn deployment_status(&self, name: &str, namespace: &str, limit: Duration) -> DeployResult<DeploymentStatus>;
}
