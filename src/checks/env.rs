//! Env file presence and required variables

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::env::EnvConfig;
use crate::core::error::{DeployResult, ExitCode, PreconditionError};

/// The env file exists and parses
pub struct EnvFileCheck;

impl Check for EnvFileCheck {
  fn name(&self) -> String {
    "env-file".to_string()
  }

  fn description(&self) -> String {
    "Env file exists and parses".to_string()
  }

  fn failure_code(&self) -> ExitCode {
    ExitCode::MissingEnvFile
  }

  fn run(&self, ctx: &CheckContext) -> DeployResult<CheckResult> {
    if !ctx.env_file.is_file() {
      let err = PreconditionError::MissingEnvFile {
        path: ctx.env_file.clone(),
      };
      return Ok(CheckResult::error(
        self.name(),
        err.to_string(),
        Some(format!(
          "Create {} with: {}",
          ctx.env_file.display(),
          ctx.config.deploy.required_vars.join(", ")
        )),
      ));
    }

    match EnvConfig::load(&ctx.env_file) {
      Ok(env) => Ok(CheckResult::pass(
        self.name(),
        format!("{} ({} variables)", ctx.env_file.display(), env.iter().count()),
      )),
      Err(err) => Ok(CheckResult::error(self.name(), err.to_string(), err.help_message())),
    }
  }
}

/// One required variable is set and non-empty
pub struct RequiredVarCheck {
  var: String,
}

impl RequiredVarCheck {
  pub fn new(var: impl Into<String>) -> Self {
    Self { var: var.into() }
  }
}

impl Check for RequiredVarCheck {
  fn name(&self) -> String {
    format!("env:{}", self.var)
  }

  fn description(&self) -> String {
    format!("{} is set in the env file", self.var)
  }

  fn failure_code(&self) -> ExitCode {
    ExitCode::MissingVariable
  }

  // Without a readable env file, EnvFileCheck already reports the problem.
  fn applies_to(&self, ctx: &CheckContext) -> bool {
    ctx.env.is_some()
  }

  fn run(&self, ctx: &CheckContext) -> DeployResult<CheckResult> {
    let set = ctx.env.as_ref().is_some_and(|env| env.contains(&self.var));
    if set {
      // Never echo the value.
      return Ok(CheckResult::pass(self.name(), "set"));
    }
    let err = PreconditionError::MissingVariable {
      name: self.var.clone(),
      path: ctx.env_file.clone(),
    };
    Ok(CheckResult::error(self.name(), err.to_string(), err.help_message()))
  }
}
