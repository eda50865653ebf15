//! Cluster apply and convergence wait
//!
//! The manifest is applied exactly once. Afterwards only the read-only
//! deployment status is polled until it converges or the deadline passes.
//! Each iteration checks the elapsed time before querying, and each query is
//! cut off at the next poll or the deadline, whichever comes first. A cluster
//! that never converges or never answers fails no later than
//! `timeout + interval` after the start.

use crate::backend::ClusterClient;
use crate::core::error::{DeployError, DeployResult};
use crate::core::interrupt;
use crate::release::publish::PublishedImage;
use crate::release::render::RenderedManifest;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Granularity of interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Shortest time a single status query is given
const MIN_QUERY_LIMIT: Duration = Duration::from_millis(500);

/// Deployment rollout counters, as reported by the control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentStatus {
  pub generation: i64,
  pub observed_generation: i64,
  pub desired: i64,
  pub replicas: i64,
  pub updated: i64,
  pub available: i64,
}

#[derive(Deserialize)]
struct DeploymentObject {
  #[serde(default)]
  metadata: ObjectMeta,
  #[serde(default)]
  spec: DeploymentSpec,
  #[serde(default)]
  status: DeploymentStatusFields,
}

#[derive(Default, Deserialize)]
struct ObjectMeta {
  #[serde(default)]
  generation: i64,
}

#[derive(Default, Deserialize)]
struct DeploymentSpec {
  replicas: Option<i64>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentStatusFields {
  #[serde(default)]
  observed_generation: i64,
  #[serde(default)]
  replicas: i64,
  #[serde(default)]
  updated_replicas: i64,
  #[serde(default)]
  available_replicas: i64,
}

impl DeploymentStatus {
  /// Parse `kubectl get deployment -o json` output
  pub fn from_json(text: &str) -> DeployResult<Self> {
    let object: DeploymentObject = serde_json::from_str(text)?;
    Ok(Self {
      generation: object.metadata.generation,
      observed_generation: object.status.observed_generation,
      // Kubernetes defaults an omitted replica count to 1
      desired: object.spec.replicas.unwrap_or(1),
      replicas: object.status.replicas,
      updated: object.status.updated_replicas,
      available: object.status.available_replicas,
    })
  }

  /// Desired and current states agree and no stale replicas remain
  pub fn is_converged(&self) -> bool {
    self.observed_generation >= self.generation
      && self.updated == self.desired
      && self.replicas == self.updated
      && self.available == self.updated
  }

  pub fn summary(&self) -> String {
    let mut text = format!(
      "{}/{} updated, {} available, {} total",
      self.updated, self.desired, self.available, self.replicas
    );
    if self.observed_generation < self.generation {
      text.push_str(", spec change not yet observed");
    }
    text
  }
}

/// Deadline and cadence for the wait phase
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
  pub timeout: Duration,
  pub interval: Duration,
}

/// Time source for the wait loop
pub trait Clock {
  fn now(&self) -> Instant;

  /// Sleep, returning early with an error if the run is interrupted
  fn sleep(&self, duration: Duration) -> DeployResult<()>;
}

/// Wall clock; sleeps in short slices so an interrupt is noticed promptly
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn sleep(&self, duration: Duration) -> DeployResult<()> {
    let deadline = Instant::now() + duration;
    loop {
      interrupt::check()?;
      let now = Instant::now();
      if now >= deadline {
        return Ok(());
      }
      std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
  }
}

/// One iteration of the wait loop, for progress reporting
#[derive(Debug)]
pub struct Poll<'a> {
  pub attempt: u32,
  pub elapsed: Duration,
  pub status: Option<&'a DeploymentStatus>,
}

/// Submit the rendered manifest. Requires proof the image is published and a
/// manifest rendered for that same release.
pub fn apply_manifest(
  cluster: &dyn ClusterClient,
  published: &PublishedImage,
  manifest: &RenderedManifest,
) -> DeployResult<()> {
  if manifest.descriptor() != published.descriptor() {
    return Err(DeployError::message(format!(
      "Rendered manifest is for {} but the published image is {}",
      manifest.descriptor().image(),
      published.image()
    )));
  }

  let namespace = &published.descriptor().namespace;
  tracing::info!(namespace = %namespace, image = %published.image(), "applying manifest");
  cluster.apply(manifest.path(), namespace)
}

/// Poll deployment status until converged or `policy.timeout` has elapsed
pub fn wait_for_rollout(
  cluster: &dyn ClusterClient,
  clock: &dyn Clock,
  deployment: &str,
  namespace: &str,
  policy: WaitPolicy,
  observer: &mut dyn FnMut(&Poll<'_>),
) -> DeployResult<DeploymentStatus> {
  let start = clock.now();
  let mut attempt = 0u32;
  let mut last_status: Option<String> = None;

  loop {
    let elapsed = clock.now().saturating_duration_since(start);
    if elapsed > policy.timeout {
      return Err(DeployError::ConvergenceTimeout {
        deployment: deployment.to_string(),
        namespace: namespace.to_string(),
        timeout: policy.timeout,
        last_status,
      });
    }

    attempt += 1;
    let limit = policy.interval.min(policy.timeout.saturating_sub(elapsed)).max(MIN_QUERY_LIMIT);
    match cluster.deployment_status(deployment, namespace, limit) {
      Ok(status) => {
        observer(&Poll {
          attempt,
          elapsed,
          status: Some(&status),
        });
        if status.is_converged() {
          tracing::info!(deployment, namespace, attempt, "rollout converged");
          return Ok(status);
        }
        tracing::debug!(deployment, attempt, status = %status.summary(), "rollout in progress");
        last_status = Some(status.summary());
      }
      Err(DeployError::Interrupted) => return Err(DeployError::Interrupted),
      Err(err) => {
        // A failed query is not fatal; only the deadline ends the wait.
        tracing::warn!(deployment, attempt, error = %err, "status query failed");
        observer(&Poll {
          attempt,
          elapsed,
          status: None,
        });
        last_status = Some(err.to_string());
      }
    }

    // A slow query may have used up the rest of the budget
    if clock.now().saturating_duration_since(start) > policy.timeout {
      continue;
    }
    clock.sleep(policy.interval)?;
  }
}
