//! Release version strings
//!
//! A version is either supplied by the caller (`v1.2.3`, `2024.06-hotfix`) or
//! defaulted to a local timestamp `YYYYMMDD-HHMMSS`. It is computed once per
//! run and used verbatim for the build tag, the push, and the manifest.

use crate::core::error::{DeployError, DeployResult};
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::fmt;

/// Floating alias published next to every versioned tag
pub const LATEST: &str = "latest";

/// Maximum length of an OCI tag
const MAX_TAG_LEN: usize = 128;

/// A validated image tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
  /// Validate a caller-supplied version
  pub fn parse(raw: &str) -> DeployResult<Self> {
    let raw = raw.trim();
    if raw.is_empty() {
      return Err(DeployError::message("Release version must not be empty"));
    }
    if raw == LATEST {
      return Err(DeployError::with_help(
        "Release version 'latest' is reserved for the floating alias",
        "Pass a concrete tag such as --version v1.2.3",
      ));
    }
    if raw.len() > MAX_TAG_LEN {
      return Err(DeployError::message(format!(
        "Release version is {} characters, tags are limited to {}",
        raw.len(),
        MAX_TAG_LEN
      )));
    }

    let mut chars = raw.chars();
    let first_ok = chars
      .next()
      .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
      return Err(DeployError::with_help(
        format!("Release version '{}' is not a valid image tag", raw),
        "Tags may contain letters, digits, '_', '.', and '-', and must not start with '.' or '-'",
      ));
    }

    Ok(Self(raw.to_string()))
  }

  /// Timestamp version for the given instant
  pub fn timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
  where
    Tz::Offset: fmt::Display,
  {
    Self(at.format("%Y%m%d-%H%M%S").to_string())
  }

  /// Caller-supplied version, or a timestamp taken now
  pub fn resolve(explicit: Option<&str>) -> DeployResult<Self> {
    match explicit {
      Some(raw) => Self::parse(raw),
      None => Ok(Self::timestamp(&Local::now())),
    }
  }

  /// Whether the tag is a semantic version (an optional leading `v` is allowed)
  pub fn is_semver(&self) -> bool {
    semver::Version::parse(self.0.strip_prefix('v').unwrap_or(&self.0)).is_ok()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ReleaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
