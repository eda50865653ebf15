//! Per-run context - computed once, passed everywhere
//!
//! ```text
//! main.rs:
//!   RunContext::build() -> &RunContext
//!   |
//!   v
//! commands/deploy.rs, check.rs, render.rs:
//!   fn run(ctx: &RunContext)
//! ```
//!
//! The release descriptor is fixed here, so a single invocation can never mix
//! two version strings between build, tag, and manifest.

use crate::core::config::{DeployConfig, Overrides};
use crate::core::error::DeployResult;
use crate::release::version::{LATEST, ReleaseVersion};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Action selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Action {
  /// Build and publish the image only
  Build,
  /// Render and apply a previously published version
  Apply,
  /// Build, publish, then apply (default)
  #[default]
  All,
  /// Run precondition checks only
  Check,
  /// Print the rendered manifest without applying it
  Render,
}

impl Action {
  pub fn builds(self) -> bool {
    matches!(self, Action::Build | Action::All)
  }

  pub fn applies(self) -> bool {
    matches!(self, Action::Apply | Action::All)
  }

  /// Whether the deployment template takes part in this action
  pub fn renders(self) -> bool {
    matches!(self, Action::Apply | Action::All | Action::Render)
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Action::Build => "build",
      Action::Apply => "apply",
      Action::All => "all",
      Action::Check => "check",
      Action::Render => "render",
    };
    f.write_str(name)
  }
}

/// Version, image, and namespace identifying one deployment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDescriptor {
  pub version: ReleaseVersion,
  pub repository: String,
  pub namespace: String,
}

impl ReleaseDescriptor {
  /// `<repository>:<version>`
  pub fn image(&self) -> String {
    format!("{}:{}", self.repository, self.version)
  }

  /// `<repository>:latest`
  pub fn latest_image(&self) -> String {
    format!("{}:{}", self.repository, LATEST)
  }
}

/// Everything one invocation needs, resolved before any external command runs
#[derive(Debug, Clone)]
pub struct RunContext {
  /// Working directory all relative paths resolve against
  pub root: PathBuf,
  pub action: Action,
  pub config: DeployConfig,
  /// The caller's `--version`, before defaulting
  pub explicit_version: Option<String>,
  pub version: ReleaseVersion,
}

impl RunContext {
  /// Resolve config, overrides, and the run's version
  pub fn build(
    root: &Path,
    action: Action,
    config_path: Option<&Path>,
    explicit_version: Option<String>,
    overrides: Overrides,
  ) -> DeployResult<Self> {
    let config = DeployConfig::load(root, config_path)?.with_overrides(overrides)?;
    let version = ReleaseVersion::resolve(explicit_version.as_deref())?;

    tracing::debug!(%action, %version, semver = version.is_semver(), "run context ready");
    Ok(Self {
      root: root.to_path_buf(),
      action,
      config,
      explicit_version,
      version,
    })
  }

  /// Release descriptor; fails if the registry account is unset or a placeholder
  pub fn descriptor(&self) -> DeployResult<ReleaseDescriptor> {
    Ok(ReleaseDescriptor {
      version: self.version.clone(),
      repository: self.config.registry.repository()?,
      namespace: self.config.deploy.namespace.clone(),
    })
  }

  /// Resolve a configured path against the working directory
  pub fn path(&self, relative: &Path) -> PathBuf {
    if relative.is_absolute() {
      relative.to_path_buf()
    } else {
      self.root.join(relative)
    }
  }

  pub fn env_file(&self) -> PathBuf {
    self.path(&self.config.deploy.env_file)
  }

  pub fn template(&self) -> PathBuf {
    self.path(&self.config.deploy.template)
  }
}
