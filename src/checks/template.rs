//! Deployment template can be rendered from the env file

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::context::Action;
use crate::core::error::{DeployResult, ExitCode};
use crate::release::render::{self, IMAGE_PLACEHOLDER};

pub struct TemplateCheck;

impl Check for TemplateCheck {
  fn name(&self) -> String {
    "template".to_string()
  }

  fn description(&self) -> String {
    "Deployment template placeholders resolve from the env file".to_string()
  }

  fn failure_code(&self) -> ExitCode {
    ExitCode::Render
  }

  fn applies_to(&self, ctx: &CheckContext) -> bool {
    ctx.env.is_some() && (ctx.action.renders() || (ctx.action == Action::Check && ctx.template.exists()))
  }

  fn run(&self, ctx: &CheckContext) -> DeployResult<CheckResult> {
    let template = match render::load_template(&ctx.template) {
      Ok(text) => text,
      Err(err) => {
        return Ok(CheckResult::error(
          self.name(),
          err.to_string(),
          Some("Set [deploy] template in rail.toml to the manifest template path"),
        ));
      }
    };
    let Some(env) = ctx.env.as_ref() else {
      return Ok(CheckResult::error(self.name(), "env file not loaded", None::<String>));
    };

    if !template.contains(IMAGE_PLACEHOLDER) {
      return Ok(CheckResult::error(
        self.name(),
        format!("{} has no {} placeholder", ctx.template.display(), IMAGE_PLACEHOLDER),
        Some(format!("Use `image: {}` in the container spec", IMAGE_PLACEHOLDER)),
      ));
    }

    match render::validate_template(&template, env) {
      Ok(()) => Ok(CheckResult::pass(
        self.name(),
        format!(
          "{} ({} variables)",
          ctx.template.display(),
          render::referenced_variables(&template).len()
        ),
      )),
      Err(err) => Ok(CheckResult::error(self.name(), err.to_string(), err.help_message())),
    }
  }
}
