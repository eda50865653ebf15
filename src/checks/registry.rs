//! Registry account validation

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::{DeployResult, ExitCode};

/// The registry account is set and is not a sample placeholder
pub struct RegistryAccountCheck;

impl Check for RegistryAccountCheck {
  fn name(&self) -> String {
    "registry-account".to_string()
  }

  fn description(&self) -> String {
    "Registry account is configured".to_string()
  }

  fn failure_code(&self) -> ExitCode {
    ExitCode::InvalidConfig
  }

  fn run(&self, ctx: &CheckContext) -> DeployResult<CheckResult> {
    match ctx.config.registry.repository() {
      Ok(repository) => Ok(CheckResult::pass(self.name(), repository)),
      Err(err) => Ok(CheckResult::error(
        self.name(),
        err.to_string(),
        Some("Pass --username or set [registry] account in rail.toml"),
      )),
    }
  }
}
