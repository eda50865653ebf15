//! Error types for kube-rail with contextual messages and exit codes
//!
//! Every failure in a run maps to exactly one phase of the release pipeline.
//! The phase decides the exit code and the headline printed before exit, so
//! operators (and CI scripts) can tell a failed push from a rollout timeout
//! without parsing the message.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Exit codes for kube-rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Generic failure (I/O, unexpected)
  General = 1,
  /// Required tool missing from PATH
  MissingTool = 10,
  /// Env file missing or unreadable
  MissingEnvFile = 11,
  /// Required variable missing from env file
  MissingVariable = 12,
  /// rail.toml invalid, account unset, daemon unreachable
  InvalidConfig = 13,
  /// Registry authentication rejected
  Credential = 20,
  /// Image build failed
  Build = 21,
  /// Push or tag failed, or image not published
  Publish = 22,
  /// Template could not be rendered
  Render = 30,
  /// Control plane rejected the manifest
  Apply = 31,
  /// Rollout did not converge in time
  Timeout = 32,
  /// SIGINT / SIGTERM
  Interrupted = 130,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for kube-rail
#[derive(Debug)]
pub enum DeployError {
  /// Missing tool, env file, variable, or invalid configuration
  Precondition(PreconditionError),

  /// Registry authentication failure
  Credential { registry: String, reason: String },

  /// `docker build` failure
  Build { image: String, reason: String },

  /// `docker push` / `docker tag` failure, or apply-only image missing
  Publish { image: String, reason: String },

  /// Template rendering failure
  Render(RenderError),

  /// `kubectl apply` failure
  Apply { namespace: String, reason: String },

  /// Rollout did not converge before the deadline
  ConvergenceTimeout {
    deployment: String,
    namespace: String,
    timeout: Duration,
    last_status: Option<String>,
  },

  /// Process received an interrupt signal
  Interrupted,

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl DeployError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    DeployError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    DeployError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      DeployError::Message { message, context, help } => DeployError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      DeployError::Io(err) => DeployError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Pipeline phase this error belongs to
  pub fn phase(&self) -> &'static str {
    match self {
      DeployError::Precondition(_) => "preflight",
      DeployError::Credential { .. } => "login",
      DeployError::Build { .. } => "build",
      DeployError::Publish { .. } => "publish",
      DeployError::Render(_) => "render",
      DeployError::Apply { .. } => "apply",
      DeployError::ConvergenceTimeout { .. } => "rollout",
      DeployError::Interrupted => "interrupt",
      DeployError::Io(_) | DeployError::Message { .. } => "error",
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      DeployError::Precondition(e) => e.exit_code(),
      DeployError::Credential { .. } => ExitCode::Credential,
      DeployError::Build { .. } => ExitCode::Build,
      DeployError::Publish { .. } => ExitCode::Publish,
      DeployError::Render(_) => ExitCode::Render,
      DeployError::Apply { .. } => ExitCode::Apply,
      DeployError::ConvergenceTimeout { .. } => ExitCode::Timeout,
      DeployError::Interrupted => ExitCode::Interrupted,
      DeployError::Io(_) | DeployError::Message { .. } => ExitCode::General,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      DeployError::Precondition(e) => e.help_message(),
      DeployError::Render(e) => e.help_message(),
      DeployError::Credential { reason, .. } => {
        if reason.contains("unauthorized") || reason.contains("incorrect username or password") {
          Some("Check the registry account and the password variable configured in rail.toml.".to_string())
        } else {
          Some("Run `docker login` manually to verify registry access.".to_string())
        }
      }
      DeployError::Publish { .. } => {
        Some("Verify the repository exists and the account may push to it. Partial tags are not rolled back.".to_string())
      }
      DeployError::ConvergenceTimeout {
        deployment, namespace, ..
      } => Some(format!(
        "Inspect the rollout with: kubectl -n {} describe deployment/{}",
        namespace, deployment
      )),
      DeployError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for DeployError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeployError::Precondition(e) => write!(f, "{}", e),
      DeployError::Credential { registry, reason } => {
        write!(f, "Registry authentication failed for {}: {}", registry, reason)
      }
      DeployError::Build { image, reason } => write!(f, "Image build failed for {}: {}", image, reason),
      DeployError::Publish { image, reason } => write!(f, "Publishing {} failed: {}", image, reason),
      DeployError::Render(e) => write!(f, "{}", e),
      DeployError::Apply { namespace, reason } => {
        write!(f, "Cluster rejected manifest in namespace '{}': {}", namespace, reason)
      }
      DeployError::ConvergenceTimeout {
        deployment,
        namespace,
        timeout,
        last_status,
      } => {
        write!(
          f,
          "Rollout of deployment/{} in '{}' did not converge within {}s",
          deployment,
          namespace,
          timeout.as_secs()
        )?;
        if let Some(status) = last_status {
          write!(f, " (last status: {})", status)?;
        }
        Ok(())
      }
      DeployError::Interrupted => write!(f, "Interrupted, temporary files cleaned up"),
      DeployError::Io(e) => write!(f, "I/O error: {}", e),
      DeployError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for DeployError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      DeployError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for DeployError {
  fn from(err: io::Error) -> Self {
    DeployError::Io(err)
  }
}

impl From<String> for DeployError {
  fn from(msg: String) -> Self {
    DeployError::message(msg)
  }
}

impl From<&str> for DeployError {
  fn from(msg: &str) -> Self {
    DeployError::message(msg)
  }
}

impl From<PreconditionError> for DeployError {
  fn from(err: PreconditionError) -> Self {
    DeployError::Precondition(err)
  }
}

impl From<RenderError> for DeployError {
  fn from(err: RenderError) -> Self {
    DeployError::Render(err)
  }
}

impl From<toml_edit::de::Error> for DeployError {
  fn from(err: toml_edit::de::Error) -> Self {
    DeployError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for DeployError {
  fn from(err: serde_json::Error) -> Self {
    DeployError::message(format!("JSON error: {}", err))
  }
}

impl From<anyhow::Error> for DeployError {
  fn from(err: anyhow::Error) -> Self {
    DeployError::message(err.to_string())
  }
}

/// Errors raised before any destructive action
#[derive(Debug)]
pub enum PreconditionError {
  /// Required executable not found on PATH
  MissingTool { tool: String },

  /// Dotenv file not found
  MissingEnvFile { path: PathBuf },

  /// Required variable absent or empty
  MissingVariable { name: String, path: PathBuf },

  /// Invalid or incomplete configuration
  InvalidConfig { reason: String },

  /// Container daemon not reachable
  DaemonUnreachable { reason: String },

  /// One or more precondition checks failed; `code` comes from the first failure
  Failed { failures: Vec<String>, code: ExitCode },
}

impl PreconditionError {
  pub fn exit_code(&self) -> ExitCode {
    match self {
      PreconditionError::MissingTool { .. } => ExitCode::MissingTool,
      PreconditionError::MissingEnvFile { .. } => ExitCode::MissingEnvFile,
      PreconditionError::MissingVariable { .. } => ExitCode::MissingVariable,
      PreconditionError::InvalidConfig { .. } | PreconditionError::DaemonUnreachable { .. } => {
        ExitCode::InvalidConfig
      }
      PreconditionError::Failed { code, .. } => *code,
    }
  }

  pub fn help_message(&self) -> Option<String> {
    match self {
      PreconditionError::MissingTool { tool } => Some(format!("Install `{}` and make sure it is on PATH.", tool)),
      PreconditionError::MissingEnvFile { path } => Some(format!(
        "Create {} with the required variables (see `kube-rail check`).",
        path.display()
      )),
      PreconditionError::MissingVariable { name, path } => {
        Some(format!("Add `{}=<value>` to {}.", name, path.display()))
      }
      PreconditionError::DaemonUnreachable { .. } => Some("Start the Docker daemon and retry.".to_string()),
      PreconditionError::Failed { .. } => Some("Run `kube-rail check` for the full report.".to_string()),
      PreconditionError::InvalidConfig { .. } => None,
    }
  }
}

impl fmt::Display for PreconditionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PreconditionError::MissingTool { tool } => write!(f, "Required tool not found: {}", tool),
      PreconditionError::MissingEnvFile { path } => write!(f, "Environment file not found: {}", path.display()),
      PreconditionError::MissingVariable { name, path } => {
        write!(f, "Required variable {} is not set in {}", name, path.display())
      }
      PreconditionError::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
      PreconditionError::DaemonUnreachable { reason } => write!(f, "Docker daemon is not reachable: {}", reason),
      PreconditionError::Failed { failures, .. } => {
        write!(f, "{} precondition check(s) failed:", failures.len())?;
        for failure in failures {
          write!(f, "\n  - {}", failure)?;
        }
        Ok(())
      }
    }
  }
}

/// Template rendering errors
#[derive(Debug)]
pub enum RenderError {
  /// Template file missing or unreadable
  TemplateUnreadable { path: PathBuf, reason: String },

  /// Template references variables absent from the environment
  UnresolvedVariables { names: Vec<String> },

  /// Placeholder tokens survived substitution
  LeftoverPlaceholders { tokens: Vec<String> },

  /// Substitution utility failed
  SubstitutionFailed { reason: String },
}

impl RenderError {
  fn help_message(&self) -> Option<String> {
    match self {
      RenderError::UnresolvedVariables { .. } => {
        Some("Add the missing variables to the env file or remove them from the template.".to_string())
      }
      RenderError::LeftoverPlaceholders { .. } => {
        Some("Check the template for malformed `${VAR}` tokens.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for RenderError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RenderError::TemplateUnreadable { path, reason } => {
        write!(f, "Cannot read deployment template {}: {}", path.display(), reason)
      }
      RenderError::UnresolvedVariables { names } => {
        write!(f, "Template references unset variables: {}", names.join(", "))
      }
      RenderError::LeftoverPlaceholders { tokens } => {
        write!(f, "Rendered manifest still contains placeholders: {}", tokens.join(", "))
      }
      RenderError::SubstitutionFailed { reason } => write!(f, "Template substitution failed: {}", reason),
    }
  }
}

/// Result type alias for kube-rail
pub type DeployResult<T> = Result<T, DeployError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> DeployResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> DeployResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<DeployError>,
{
  fn context(self, ctx: impl Into<String>) -> DeployResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> DeployResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Print an error to stderr: one headline naming the phase, then optional help
pub fn print_error(error: &DeployError) {
  eprintln!("\n❌ [{}] {}\n", error.phase(), error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
