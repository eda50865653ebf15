//! Check runner for executing preflight checks

use super::env::{EnvFileCheck, RequiredVarCheck};
use super::registry::RegistryAccountCheck;
use super::template::TemplateCheck;
use super::tools::ToolCheck;
use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::config::DeployConfig;
use crate::core::error::{DeployError, DeployResult, ExitCode, PreconditionError};
use anyhow::Result;
use std::sync::Arc;

/// Check runner that executes multiple checks
pub struct CheckRunner {
  checks: Vec<Arc<dyn Check>>,
}

impl CheckRunner {
  /// Create a new check runner
  pub fn new() -> Self {
    Self { checks: Vec::new() }
  }

  /// Add a check to the runner
  pub fn add_check(&mut self, check: Arc<dyn Check>) {
    self.checks.push(check);
  }

  /// Run all applicable checks and collect results
  pub fn run_all(&self, ctx: &CheckContext) -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    for check in &self.checks {
      if !check.applies_to(ctx) {
        tracing::debug!(check = %check.name(), "skipped");
        continue;
      }
      tracing::debug!(check = %check.name(), description = %check.description(), "running");

      let mut result = match check.run(ctx) {
        Ok(result) => result,
        Err(err) => {
          // If a check itself fails to run, create an error result
          CheckResult::error(
            check.name(),
            format!("Check failed to run: {}", err),
            Some("Re-run with --verbose for details"),
          )
        }
      };
      if !result.passed {
        result.code = Some(check.failure_code());
      }
      tracing::debug!(check = %result.check_name, passed = result.passed, "check finished");
      results.push(result);
    }

    Ok(results)
  }

  /// Run all checks; fail with every failure listed if any did not pass
  pub fn validate(&self, ctx: &CheckContext) -> DeployResult<Vec<CheckResult>> {
    let results = self.run_all(ctx)?;
    match failure(&results) {
      Some(err) => Err(err),
      None => Ok(results),
    }
  }

  /// Get all registered checks
  pub fn checks(&self) -> &[Arc<dyn Check>] {
    &self.checks
  }
}

impl Default for CheckRunner {
  fn default() -> Self {
    Self::new()
  }
}

/// Error summarizing every failed result; the first failure decides the exit code
pub fn failure(results: &[CheckResult]) -> Option<DeployError> {
  let failed: Vec<&CheckResult> = results.iter().filter(|r| !r.passed).collect();
  let first = failed.first()?;

  Some(
    PreconditionError::Failed {
      failures: failed.iter().map(|r| r.message.clone()).collect(),
      code: first.code.unwrap_or(ExitCode::InvalidConfig),
    }
    .into(),
  )
}

/// Runner for explicit tool and variable lists, plus the fixed checks
pub fn create_runner(tools: &[String], required_vars: &[String]) -> CheckRunner {
  let mut runner = CheckRunner::new();

  for tool in tools {
    runner.add_check(Arc::new(ToolCheck::new(tool.clone())));
  }
  runner.add_check(Arc::new(EnvFileCheck));
  for var in required_vars {
    runner.add_check(Arc::new(RequiredVarCheck::new(var.clone())));
  }
  runner.add_check(Arc::new(RegistryAccountCheck));
  runner.add_check(Arc::new(TemplateCheck));

  runner
}

/// Create a runner with all checks the configuration calls for
pub fn create_default_runner(config: &DeployConfig) -> CheckRunner {
  create_runner(&config.required_tools(), &config.deploy.required_vars)
}
