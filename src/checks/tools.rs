//! Required executables on PATH

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::{DeployResult, ExitCode, PreconditionError};

/// One required tool, e.g. `docker`
pub struct ToolCheck {
  tool: String,
}

impl ToolCheck {
  pub fn new(tool: impl Into<String>) -> Self {
    Self { tool: tool.into() }
  }
}

impl Check for ToolCheck {
  fn name(&self) -> String {
    format!("tool:{}", self.tool)
  }

  fn description(&self) -> String {
    format!("`{}` is installed and on PATH", self.tool)
  }

  fn failure_code(&self) -> ExitCode {
    ExitCode::MissingTool
  }

  fn run(&self, _ctx: &CheckContext) -> DeployResult<CheckResult> {
    match which::which(&self.tool) {
      Ok(path) => Ok(CheckResult::pass(self.name(), format!("found at {}", path.display()))),
      Err(_) => {
        let err = PreconditionError::MissingTool { tool: self.tool.clone() };
        Ok(CheckResult::error(self.name(), err.to_string(), err.help_message()))
      }
    }
  }
}
