//! Release pipeline: a fixed sequence of fallible phases
//!
//! ```text
//! validate template ─▶ publish | verify published ─▶ render ─▶ apply ─▶ wait
//! ```
//!
//! Each phase returns a typed result and the first failure ends the run. Phase
//! announcements go to stderr; stdout is left for the caller's result. The
//! template is checked against the env file before anything is built, so an
//! incomplete env file costs neither build time nor a cluster submission.

use crate::backend::{ClusterClient, ContainerEngine};
use crate::core::context::ReleaseDescriptor;
use crate::core::env::EnvConfig;
use crate::core::error::DeployResult;
use crate::core::interrupt;
use crate::release::publish::{self, PublishRequest, PublishedImage};
use crate::release::render::{self, IMAGE_PLACEHOLDER, Substituter};
use crate::release::rollout::{self, Clock, DeploymentStatus, Poll, WaitPolicy};

/// Inputs for the render, apply, and wait phases
#[derive(Debug, Clone)]
pub struct RolloutPlan {
  pub template: String,
  pub env: EnvConfig,
  pub deployment: String,
  pub wait: WaitPolicy,
}

/// What one run does
#[derive(Debug, Clone)]
pub struct ReleasePlan {
  pub descriptor: ReleaseDescriptor,
  /// Build and publish; `None` means the image must already be published
  pub publish: Option<PublishRequest>,
  /// Render, apply, and wait; `None` stops after publishing
  pub rollout: Option<RolloutPlan>,
}

/// External collaborators for one run
pub struct Backends<'a> {
  pub engine: &'a dyn ContainerEngine,
  pub cluster: &'a dyn ClusterClient,
  pub clock: &'a dyn Clock,
  pub substituter: &'a dyn Substituter,
}

/// Result of a successful run
#[derive(Debug)]
pub struct ReleaseOutcome {
  pub published: PublishedImage,
  pub rollout: Option<DeploymentStatus>,
}

/// Run the plan to completion
pub fn execute(
  plan: &ReleasePlan,
  backends: &Backends<'_>,
  observer: &mut dyn FnMut(&Poll<'_>),
) -> DeployResult<ReleaseOutcome> {
  if let Some(rollout) = &plan.rollout {
    let with_image = rollout.template.replace(IMAGE_PLACEHOLDER, &plan.descriptor.image());
    render::validate_template(&with_image, &rollout.env)?;
  }

  let published = match &plan.publish {
    Some(request) => publish::publish(backends.engine, &plan.descriptor, request)?,
    None => publish::verify_published(backends.engine, &plan.descriptor)?,
  };
  interrupt::check()?;

  let Some(rollout) = &plan.rollout else {
    return Ok(ReleaseOutcome {
      published,
      rollout: None,
    });
  };

  // Dropping `manifest` at the end of this scope deletes the temp file on every path.
  let manifest = render::render_manifest(&rollout.template, &plan.descriptor, &rollout.env, backends.substituter)?;

  eprintln!("🚀 Applying manifest to namespace {}", plan.descriptor.namespace);
  rollout::apply_manifest(backends.cluster, &published, &manifest)?;

  eprintln!(
    "⏳ Waiting for deployment/{} (timeout {}s)",
    rollout.deployment,
    rollout.wait.timeout.as_secs()
  );
  let status = rollout::wait_for_rollout(
    backends.cluster,
    backends.clock,
    &rollout.deployment,
    &plan.descriptor.namespace,
    rollout.wait,
    observer,
  )?;

  Ok(ReleaseOutcome {
    published,
    rollout: Some(status),
  })
}
