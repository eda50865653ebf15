//! Environment Configuration: secrets loaded once from the dotenv file
//!
//! Values are read into a map and never exported into the process
//! environment, so child processes only see what the renderer hands them.

use crate::core::error::{DeployError, DeployResult, PreconditionError};
use std::collections::BTreeMap;
use std::path::Path;

/// Variables loaded from the env file
#[derive(Debug, Clone)]
pub struct EnvConfig {
  values: BTreeMap<String, String>,
}

impl EnvConfig {
  /// Load the env file. A missing file is a precondition failure.
  pub fn load(path: &Path) -> DeployResult<Self> {
    if !path.is_file() {
      return Err(PreconditionError::MissingEnvFile { path: path.to_path_buf() }.into());
    }

    let iter = dotenvy::from_path_iter(path)
      .map_err(|e| DeployError::message(format!("Failed to open env file {}: {}", path.display(), e)))?;

    let mut values = BTreeMap::new();
    for item in iter {
      let (key, value) = item.map_err(|e| {
        DeployError::with_help(
          format!("Failed to parse env file {}: {}", path.display(), e),
          "Each line must be KEY=value; quote values containing spaces or '#'.",
        )
      })?;
      values.insert(key, value);
    }

    tracing::debug!(path = %path.display(), count = values.len(), "loaded env file");
    Ok(Self { values })
  }

  /// Build from an in-memory map
  #[cfg(test)]
  pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
    Self {
      values: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
  }

  /// Value for `name`; empty values count as unset
  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str).filter(|v| !v.is_empty())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  /// Non-empty entries, for handing to the substitution backend
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .values
      .iter()
      .filter(|(_, v)| !v.is_empty())
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }
}
