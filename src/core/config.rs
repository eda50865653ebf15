use crate::core::error::{DeployResult, PreconditionError, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Account values shipped in sample configs that must never reach a registry
const PLACEHOLDER_ACCOUNTS: &[&str] = &["your-dockerhub-username", "changeme", "<username>", "username"];

/// Configuration for kube-rail
/// Searched in order: rail.toml, .rail.toml, .config/rail.toml
///
/// # Example
///
/// ```toml
/// [registry]
/// account = "acme"
/// image = "telegram-bot"
///
/// [deploy]
/// namespace = "telegram-bot"
/// template = "k8s/deployment.yaml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
  #[serde(default)]
  pub registry: RegistryConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub deploy: RolloutConfig,
}

/// Where images are published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
  /// Registry host (default: docker.io)
  #[serde(default = "default_server")]
  pub server: String,

  /// Registry account; required, may be supplied with `--username`
  #[serde(default)]
  pub account: Option<String>,

  /// Image name inside the account (default: telegram-bot)
  #[serde(default = "default_image")]
  pub image: String,

  /// Variable holding the registry password; read from the process
  /// environment, then the env file. Unset means stored or interactive login.
  #[serde(default = "default_password_env")]
  pub password_env: String,
}

fn default_server() -> String {
  "docker.io".to_string()
}

fn default_image() -> String {
  "telegram-bot".to_string()
}

fn default_password_env() -> String {
  "DOCKER_PASSWORD".to_string()
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      server: default_server(),
      account: None,
      image: default_image(),
      password_env: default_password_env(),
    }
  }
}

impl RegistryConfig {
  /// The validated registry account
  pub fn account(&self) -> DeployResult<&str> {
    let Some(account) = self.account.as_deref().map(str::trim) else {
      return Err(
        PreconditionError::InvalidConfig {
          reason: "registry account is not set (use --username or [registry] account in rail.toml)".to_string(),
        }
        .into(),
      );
    };

    if account.is_empty() || PLACEHOLDER_ACCOUNTS.contains(&account.to_ascii_lowercase().as_str()) {
      return Err(
        PreconditionError::InvalidConfig {
          reason: format!("registry account '{}' is a placeholder, set a real account", account),
        }
        .into(),
      );
    }

    if !account
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
      return Err(
        PreconditionError::InvalidConfig {
          reason: format!("registry account '{}' contains characters not allowed in image names", account),
        }
        .into(),
      );
    }

    Ok(account)
  }

  /// Image repository without tag, e.g. `acme/telegram-bot` or `ghcr.io/acme/telegram-bot`
  pub fn repository(&self) -> DeployResult<String> {
    let account = self.account()?;
    if self.server == "docker.io" || self.server.is_empty() {
      Ok(format!("{}/{}", account, self.image))
    } else {
      Ok(format!("{}/{}/{}", self.server.trim_end_matches('/'), account, self.image))
    }
  }
}

/// Image build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Build context directory (default: ".")
  #[serde(default = "default_context")]
  pub context: PathBuf,

  /// Dockerfile path, relative to the workspace root
  #[serde(default)]
  pub dockerfile: Option<PathBuf>,
}

fn default_context() -> PathBuf {
  PathBuf::from(".")
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      context: default_context(),
      dockerfile: None,
    }
  }
}

/// Template substitution backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
  /// External `envsubst`
  #[default]
  Envsubst,
  /// In-process substitution
  Builtin,
}

/// Cluster rollout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
  #[serde(default = "default_namespace")]
  pub namespace: String,

  /// Deployment whose rollout is awaited (default: registry image name)
  #[serde(default)]
  pub deployment: Option<String>,

  #[serde(default = "default_template")]
  pub template: PathBuf,

  #[serde(default = "default_env_file")]
  pub env_file: PathBuf,

  #[serde(default)]
  pub renderer: RendererKind,

  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,

  #[serde(default = "default_poll_interval_secs")]
  pub poll_interval_secs: u64,

  /// Variables the env file must define
  #[serde(default = "default_required_vars")]
  pub required_vars: Vec<String>,

  /// Extra executables to require on PATH
  #[serde(default)]
  pub extra_tools: Vec<String>,
}

fn default_namespace() -> String {
  "telegram-bot".to_string()
}

fn default_template() -> PathBuf {
  PathBuf::from("k8s/deployment.yaml")
}

fn default_env_file() -> PathBuf {
  PathBuf::from(".env")
}

fn default_timeout_secs() -> u64 {
  300
}

fn default_poll_interval_secs() -> u64 {
  5
}

fn default_required_vars() -> Vec<String> {
  [
    "TELEGRAM_TOKEN",
    "ANTHROPIC_API_KEY",
    "MONGODB_PASSWORD",
    "MONGODB_USERNAME",
    "SENTRY_DSN",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Default for RolloutConfig {
  fn default() -> Self {
    Self {
      namespace: default_namespace(),
      deployment: None,
      template: default_template(),
      env_file: default_env_file(),
      renderer: RendererKind::default(),
      timeout_secs: default_timeout_secs(),
      poll_interval_secs: default_poll_interval_secs(),
      required_vars: default_required_vars(),
      extra_tools: Vec::new(),
    }
  }
}

impl RolloutConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  pub fn validate(&self) -> DeployResult<()> {
    if self.namespace.trim().is_empty() {
      return Err(
        PreconditionError::InvalidConfig {
          reason: "deploy namespace must not be empty".to_string(),
        }
        .into(),
      );
    }
    if self.poll_interval_secs == 0 {
      return Err(
        PreconditionError::InvalidConfig {
          reason: "poll interval must be at least 1 second".to_string(),
        }
        .into(),
      );
    }
    if self.timeout_secs == 0 {
      return Err(
        PreconditionError::InvalidConfig {
          reason: "rollout timeout must be at least 1 second".to_string(),
        }
        .into(),
      );
    }
    Ok(())
  }
}

/// Command-line values that take precedence over rail.toml
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub username: Option<String>,
  pub namespace: Option<String>,
  pub env_file: Option<PathBuf>,
  pub timeout_secs: Option<u64>,
  pub poll_interval_secs: Option<u64>,
}

impl DeployConfig {
  /// Find config file in search order: rail.toml, .rail.toml, .config/rail.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("rail.toml"),
      path.join(".rail.toml"),
      path.join(".config").join("rail.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from an explicit file, the search path, or defaults when none exists
  pub fn load(root: &Path, explicit: Option<&Path>) -> DeployResult<Self> {
    let config_path = match explicit {
      Some(path) => {
        if !path.exists() {
          return Err(
            PreconditionError::InvalidConfig {
              reason: format!("config file {} does not exist", path.display()),
            }
            .into(),
          );
        }
        path.to_path_buf()
      }
      None => match Self::find_config_path(root) {
        Some(path) => path,
        None => {
          tracing::debug!(root = %root.display(), "no rail.toml found, using defaults");
          return Ok(Self::default());
        }
      },
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: DeployConfig = toml_edit::de::from_str(&content).map_err(|e| PreconditionError::InvalidConfig {
      reason: format!("{}: {}", config_path.display(), e),
    })?;

    tracing::debug!(path = %config_path.display(), "loaded configuration");
    Ok(config)
  }

  /// Apply CLI overrides, then validate everything that does not depend on the env file
  pub fn with_overrides(mut self, overrides: Overrides) -> DeployResult<Self> {
    if let Some(username) = overrides.username {
      self.registry.account = Some(username);
    }
    if let Some(namespace) = overrides.namespace {
      self.deploy.namespace = namespace;
    }
    if let Some(env_file) = overrides.env_file {
      self.deploy.env_file = env_file;
    }
    if let Some(timeout) = overrides.timeout_secs {
      self.deploy.timeout_secs = timeout;
    }
    if let Some(interval) = overrides.poll_interval_secs {
      self.deploy.poll_interval_secs = interval;
    }

    self.deploy.validate()?;
    Ok(self)
  }

  /// Deployment awaited during rollout
  pub fn deployment_name(&self) -> &str {
    self.deploy.deployment.as_deref().unwrap_or(&self.registry.image)
  }

  /// Executables that must be on PATH
  pub fn required_tools(&self) -> Vec<String> {
    let mut tools = vec!["docker".to_string(), "kubectl".to_string()];
    if self.deploy.renderer == RendererKind::Envsubst {
      tools.push("envsubst".to_string());
    }
    for extra in &self.deploy.extra_tools {
      if !tools.contains(extra) {
        tools.push(extra.clone());
      }
    }
    tools
  }
}
