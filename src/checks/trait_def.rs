//! Check trait abstraction for preflight validation
//!
//! Every precondition (a tool on PATH, a variable in the env file, a usable
//! registry account, a renderable template) is one `Check`. The runner runs
//! all applicable checks and never stops at the first failure, so the
//! operator sees every problem in one pass.

use crate::core::config::DeployConfig;
use crate::core::context::{Action, RunContext};
use crate::core::env::EnvConfig;
use crate::core::error::{DeployResult, ExitCode};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Severity level for check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
  /// Informational message (not an issue)
  Info,
  /// Error (blocking, must be fixed)
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Info => write!(f, "INFO"),
      Severity::Error => write!(f, "ERROR"),
    }
  }
}

/// Result of running a check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
  /// Name of the check that ran
  pub check_name: String,
  /// Whether the check passed
  pub passed: bool,
  /// Severity level (if failed)
  pub severity: Severity,
  /// Human-readable message
  pub message: String,
  /// Optional suggested fix
  pub suggestion: Option<String>,
  /// Exit code the failure maps to; filled in by the runner
  #[serde(skip)]
  pub code: Option<ExitCode>,
}

impl CheckResult {
  /// Create a passing check result
  pub fn pass(check_name: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      check_name: check_name.into(),
      passed: true,
      severity: Severity::Info,
      message: message.into(),
      suggestion: None,
      code: None,
    }
  }

  /// Create a failing check result with error severity
  pub fn error(check_name: impl Into<String>, message: impl Into<String>, suggestion: Option<impl Into<String>>) -> Self {
    Self {
      check_name: check_name.into(),
      passed: false,
      severity: Severity::Error,
      message: message.into(),
      suggestion: suggestion.map(|s| s.into()),
      code: None,
    }
  }
}

/// Context passed to checks
#[derive(Debug, Clone)]
pub struct CheckContext {
  pub action: Action,
  pub config: DeployConfig,
  pub env_file: PathBuf,
  pub template: PathBuf,
  /// Parsed env file, `None` when it is missing or unreadable
  pub env: Option<EnvConfig>,
}

impl CheckContext {
  /// Build the check context for a run; an unreadable env file leaves `env` empty
  pub fn from_run(run: &RunContext) -> Self {
    let env_file = run.env_file();
    let env = match EnvConfig::load(&env_file) {
      Ok(env) => Some(env),
      Err(err) => {
        tracing::debug!(path = %env_file.display(), error = %err, "env file not loaded");
        None
      }
    };

    Self {
      action: run.action,
      config: run.config.clone(),
      env_file,
      template: run.template(),
      env,
    }
  }
}

/// Preflight check trait
///
/// # Example
///
/// ```rust,ignore
/// struct NamespaceCheck;
///
/// impl Check for NamespaceCheck {
///   fn name(&self) -> String {
///     "namespace".to_string()
///   }
///
///   fn description(&self) -> String {
///     "Namespace is a valid DNS label".to_string()
///   }
///
///   fn failure_code(&self) -> ExitCode {
///     ExitCode::InvalidConfig
///   }
///
///   fn run(&self, ctx: &CheckContext) -> DeployResult<CheckResult> {
///     Ok(CheckResult::pass(self.name(), "ok"))
///   }
/// }
/// ```
pub trait Check {
  /// Unique name for this check (kebab-case, `family:item` for per-item checks)
  fn name(&self) -> String;

  /// Human-readable description of what this check validates
  fn description(&self) -> String;

  /// Exit code used when this check is the first to fail
  fn failure_code(&self) -> ExitCode;

  /// Run the check and return a result
  fn run(&self, ctx: &CheckContext) -> DeployResult<CheckResult>;

  /// Whether this check is meaningful for the context
  /// Default: true
  fn applies_to(&self, _ctx: &CheckContext) -> bool {
    true
  }
}
