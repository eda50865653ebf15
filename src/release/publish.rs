//! Build & publish: daemon → login → build → push version → tag latest → push latest
//!
//! Login happens before the build so a bad credential never costs build time.
//! Nothing is retried and a half-published release (version pushed, latest
//! not) is reported, not rolled back.

use crate::backend::ContainerEngine;
use crate::core::context::ReleaseDescriptor;
use crate::core::error::{DeployError, DeployResult};
use std::path::PathBuf;

/// Proof that a release's image is present in the registry.
///
/// Only `publish` and `verify_published` construct it, and the rollout phase
/// requires it, so a manifest is never applied for an unpublished version.
#[derive(Debug, Clone)]
pub struct PublishedImage {
  descriptor: ReleaseDescriptor,
}

impl PublishedImage {
  pub fn descriptor(&self) -> &ReleaseDescriptor {
    &self.descriptor
  }

  pub fn image(&self) -> String {
    self.descriptor.image()
  }
}

/// Registry and build inputs for one publish
#[derive(Debug, Clone)]
pub struct PublishRequest {
  pub registry: String,
  pub username: String,
  pub password: Option<String>,
  pub context: PathBuf,
  pub dockerfile: Option<PathBuf>,
}

/// Build the release image and publish it under its version and `latest`
pub fn publish(
  engine: &dyn ContainerEngine,
  descriptor: &ReleaseDescriptor,
  request: &PublishRequest,
) -> DeployResult<PublishedImage> {
  let image = descriptor.image();
  let latest = descriptor.latest_image();

  engine.ping()?;

  eprintln!("🔐 Logging in to {} as {}", request.registry, request.username);
  engine.login(&request.registry, &request.username, request.password.as_deref())?;

  eprintln!("🔨 Building {}", image);
  engine.build(&request.context, request.dockerfile.as_deref(), &image)?;

  eprintln!("📤 Pushing {}", image);
  engine.push(&image)?;

  engine.tag(&image, &latest)?;
  eprintln!("📤 Pushing {}", latest);
  engine.push(&latest)?;

  tracing::info!(%image, %latest, "release published");
  Ok(PublishedImage {
    descriptor: descriptor.clone(),
  })
}

/// Confirm a previous run published this release
pub fn verify_published(engine: &dyn ContainerEngine, descriptor: &ReleaseDescriptor) -> DeployResult<PublishedImage> {
  let image = descriptor.image();
  if !engine.is_published(&image)? {
    return Err(DeployError::Publish {
      image,
      reason: "image not found in registry; run `kube-rail build` for this version first".to_string(),
    });
  }

  tracing::info!(%image, "found published image");
  Ok(PublishedImage {
    descriptor: descriptor.clone(),
  })
}
