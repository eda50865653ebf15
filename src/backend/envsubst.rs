//! `envsubst` substitution backend
//!
//! The child gets a cleared environment holding only the env-file values, and
//! a SHELL-FORMAT argument naming exactly those variables. Anything else in
//! the template is left untouched and caught by the renderer's leftover scan.

use super::exec;
use crate::core::env::EnvConfig;
use crate::core::error::{DeployResult, RenderError};
use crate::release::render::Substituter;
use std::process::Command;

pub struct Envsubst;

impl Envsubst {
  /// `$A $B ...` for the given names
  pub fn shell_format<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().map(|n| format!("${}", n)).collect::<Vec<_>>().join(" ")
  }
}

impl Substituter for Envsubst {
  fn name(&self) -> &'static str {
    "envsubst"
  }

  fn substitute(&self, text: &str, names: &[String], env: &EnvConfig) -> DeployResult<String> {
    let program = which::which("envsubst").map_err(|e| RenderError::SubstitutionFailed {
      reason: format!("envsubst not found: {}", e),
    })?;

    let mut cmd = Command::new(program);
    cmd.env_clear();
    for name in names {
      if let Some(value) = env.get(name) {
        cmd.env(name, value);
      }
    }
    cmd.arg(Self::shell_format(names.iter().map(String::as_str)));

    let captured = exec::capture_with_input(&mut cmd, Some(text))?;
    if !captured.success() {
      return Err(
        RenderError::SubstitutionFailed {
          reason: captured.reason(),
        }
        .into(),
      );
    }
    Ok(captured.stdout)
  }
}
