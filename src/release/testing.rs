//! Recording fakes for the release pipeline tests

use crate::backend::{ClusterClient, ContainerEngine};
use crate::core::context::ReleaseDescriptor;
use crate::core::error::{DeployError, DeployResult, PreconditionError};
use crate::release::rollout::{Clock, DeploymentStatus};
use crate::release::version::ReleaseVersion;
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::time::{Duration, Instant};

pub fn descriptor(version: &str) -> ReleaseDescriptor {
  ReleaseDescriptor {
    version: ReleaseVersion::parse(version).unwrap(),
    repository: "acme/telegram-bot".to_string(),
    namespace: "bots".to_string(),
  }
}

/// Container engine that records calls and fails on one operation
#[derive(Default)]
pub struct FakeEngine {
  fail_on: Option<&'static str>,
  calls: RefCell<Vec<String>>,
}

impl FakeEngine {
  pub fn failing(op: &'static str) -> Self {
    Self {
      fail_on: Some(op),
      ..Default::default()
    }
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.borrow().clone()
  }

  pub fn pushes(&self) -> Vec<String> {
    self
      .calls()
      .into_iter()
      .filter_map(|c| c.strip_prefix("push ").map(String::from))
      .collect()
  }

  fn record(&self, op: &'static str, call: String) -> bool {
    self.calls.borrow_mut().push(call);
    self.fail_on == Some(op)
  }
}

impl ContainerEngine for FakeEngine {
  fn ping(&self) -> DeployResult<()> {
    if self.record("ping", "ping".to_string()) {
      return Err(
        PreconditionError::DaemonUnreachable {
          reason: "Cannot connect to the Docker daemon".to_string(),
        }
        .into(),
      );
    }
    Ok(())
  }

  fn login(&self, registry: &str, username: &str, _password: Option<&str>) -> DeployResult<()> {
    if self.record("login", format!("login {} {}", registry, username)) {
      return Err(DeployError::Credential {
        registry: registry.to_string(),
        reason: "unauthorized: incorrect username or password".to_string(),
      });
    }
    Ok(())
  }

  fn build(&self, _context: &Path, _dockerfile: Option<&Path>, image: &str) -> DeployResult<()> {
    if self.record("build", format!("build {}", image)) {
      return Err(DeployError::Build {
        image: image.to_string(),
        reason: "exited with status 1".to_string(),
      });
    }
    Ok(())
  }

  fn tag(&self, source: &str, target: &str) -> DeployResult<()> {
    if self.record("tag", format!("tag {} {}", source, target)) {
      return Err(DeployError::Publish {
        image: target.to_string(),
        reason: "no such image".to_string(),
      });
    }
    Ok(())
  }

  fn push(&self, image: &str) -> DeployResult<()> {
    if self.record("push", format!("push {}", image)) {
      return Err(DeployError::Publish {
        image: image.to_string(),
        reason: "denied".to_string(),
      });
    }
    Ok(())
  }

  fn is_published(&self, image: &str) -> DeployResult<bool> {
    Ok(!self.record("is_published", format!("is_published {}", image)))
  }
}

enum ClusterBehaviour {
  ConvergeAfter(u32),
  Never,
  QueryErrors,
  QueryInterrupted,
  RejectApply,
}

/// Cluster client with scripted rollout progress
pub struct FakeCluster {
  behaviour: ClusterBehaviour,
  queries: Cell<u32>,
  limits: RefCell<Vec<Duration>>,
  applied: RefCell<Vec<String>>,
}

impl FakeCluster {
  fn with(behaviour: ClusterBehaviour) -> Self {
    Self {
      behaviour,
      queries: Cell::new(0),
      limits: RefCell::new(Vec::new()),
      applied: RefCell::new(Vec::new()),
    }
  }

  /// Reports convergence on the `n`th status query
  pub fn converging_after(n: u32) -> Self {
    Self::with(ClusterBehaviour::ConvergeAfter(n))
  }

  pub fn never_converging() -> Self {
    Self::with(ClusterBehaviour::Never)
  }

  pub fn failing_queries() -> Self {
    Self::with(ClusterBehaviour::QueryErrors)
  }

  /// Status queries see the interrupt, as a killed `kubectl get` would
  pub fn interrupted_queries() -> Self {
    Self::with(ClusterBehaviour::QueryInterrupted)
  }

  pub fn rejecting() -> Self {
    Self::with(ClusterBehaviour::RejectApply)
  }

  pub fn status_queries(&self) -> u32 {
    self.queries.get()
  }

  /// Time limit passed to each status query, in order
  pub fn query_limits(&self) -> Vec<Duration> {
    self.limits.borrow().clone()
  }

  pub fn applies(&self) -> usize {
    self.applied.borrow().len()
  }

  pub fn applied_content(&self) -> Vec<String> {
    self.applied.borrow().clone()
  }
}

fn pending() -> DeploymentStatus {
  DeploymentStatus {
    generation: 1,
    observed_generation: 1,
    desired: 1,
    replicas: 0,
    updated: 0,
    available: 0,
  }
}

fn converged() -> DeploymentStatus {
  DeploymentStatus {
    generation: 1,
    observed_generation: 1,
    desired: 1,
    replicas: 1,
    updated: 1,
    available: 1,
  }
}

impl ClusterClient for FakeCluster {
  fn apply(&self, manifest: &Path, namespace: &str) -> DeployResult<()> {
    if let ClusterBehaviour::RejectApply = self.behaviour {
      return Err(DeployError::Apply {
        namespace: namespace.to_string(),
        reason: "error validating data".to_string(),
      });
    }
    let content = std::fs::read_to_string(manifest)?;
    self.applied.borrow_mut().push(content);
    Ok(())
  }

  fn deployment_status(&self, _name: &str, _namespace: &str, limit: Duration) -> DeployResult<DeploymentStatus> {
    let n = self.queries.get() + 1;
    self.queries.set(n);
    self.limits.borrow_mut().push(limit);
    match self.behaviour {
      ClusterBehaviour::ConvergeAfter(target) if n >= target => Ok(converged()),
      ClusterBehaviour::QueryErrors => Err(DeployError::message("connection refused")),
      ClusterBehaviour::QueryInterrupted => Err(DeployError::Interrupted),
      _ => Ok(pending()),
    }
  }
}

/// Manual clock: `sleep` advances time instantly
pub struct FakeClock {
  start: Instant,
  offset: Cell<Duration>,
  sleeps: Cell<u32>,
  interrupt_after: Option<u32>,
}

impl FakeClock {
  pub fn new() -> Self {
    Self {
      start: Instant::now(),
      offset: Cell::new(Duration::ZERO),
      sleeps: Cell::new(0),
      interrupt_after: None,
    }
  }

  /// Interrupts on the sleep after `n` completed sleeps
  pub fn interrupted_after(n: u32) -> Self {
    Self {
      interrupt_after: Some(n),
      ..Self::new()
    }
  }

  pub fn elapsed(&self) -> Duration {
    self.offset.get()
  }
}

impl Clock for FakeClock {
  fn now(&self) -> Instant {
    self.start + self.offset.get()
  }

  fn sleep(&self, duration: Duration) -> DeployResult<()> {
    if self.interrupt_after == Some(self.sleeps.get()) {
      return Err(DeployError::Interrupted);
    }
    self.sleeps.set(self.sleeps.get() + 1);
    self.offset.set(self.offset.get() + duration);
    Ok(())
  }
}
