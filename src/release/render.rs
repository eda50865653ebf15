//! Manifest rendering
//!
//! Two passes, in this order:
//! 1. the literal `DOCKER_IMAGE_NAME` becomes `<repository>:<version>`
//! 2. `${VAR}` tokens become env-file values
//!
//! Every `${VAR}` the template references must be present in the env file
//! before substitution starts, and none may survive it. The result is written
//! to a scoped temporary file that is deleted when the `RenderedManifest`
//! drops, on success, error, and interrupt alike.

use crate::core::context::ReleaseDescriptor;
use crate::core::env::EnvConfig;
use crate::core::error::{DeployResult, RenderError};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::NamedTempFile;

/// Token replaced by the image reference
pub const IMAGE_PLACEHOLDER: &str = "DOCKER_IMAGE_NAME";

/// Well-formed `${NAME}` token
static BRACED_VAR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Any `${...}` opening, well-formed or not
static ANY_BRACED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{[^}\s]*\}?").expect("valid regex"));

/// `${NAME}` or `$NAME`, matching what envsubst replaces
static ANY_VAR: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))").expect("valid regex")
});

/// Replaces variable tokens with env-file values
pub trait Substituter {
  fn name(&self) -> &'static str;

  /// Substitute `names` (all known to be set in `env`) inside `text`
  fn substitute(&self, text: &str, names: &[String], env: &EnvConfig) -> DeployResult<String>;
}

/// In-process substitution with the same token rules as envsubst
pub struct BuiltinSubstituter;

impl Substituter for BuiltinSubstituter {
  fn name(&self) -> &'static str {
    "builtin"
  }

  fn substitute(&self, text: &str, names: &[String], env: &EnvConfig) -> DeployResult<String> {
    let rendered = ANY_VAR.replace_all(text, |caps: &Captures<'_>| {
      let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
      match env.get(name) {
        Some(value) if names.iter().any(|n| n == name) => value.to_string(),
        _ => caps[0].to_string(),
      }
    });
    Ok(rendered.into_owned())
  }
}

/// Variable names referenced as `${NAME}`, sorted and deduplicated
pub fn referenced_variables(template: &str) -> Vec<String> {
  BRACED_VAR
    .captures_iter(template)
    .map(|caps| caps[1].to_string())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Referenced variables the env file does not define
pub fn unresolved_variables(template: &str, env: &EnvConfig) -> Vec<String> {
  referenced_variables(template)
    .into_iter()
    .filter(|name| !env.contains(name))
    .collect()
}

/// `${...}` tokens that are not valid variable references
fn malformed_tokens(template: &str) -> Vec<String> {
  ANY_BRACED
    .find_iter(template)
    .map(|m| m.as_str())
    .filter(|token| !BRACED_VAR.is_match(token))
    .map(String::from)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Check a template can be rendered from `env` without rendering it
pub fn validate_template(template: &str, env: &EnvConfig) -> DeployResult<()> {
  let malformed = malformed_tokens(template);
  if !malformed.is_empty() {
    return Err(RenderError::LeftoverPlaceholders { tokens: malformed }.into());
  }

  let missing = unresolved_variables(template, env);
  if !missing.is_empty() {
    return Err(RenderError::UnresolvedVariables { names: missing }.into());
  }
  Ok(())
}

/// Render the template text for `descriptor`
pub fn render_text(
  template: &str,
  descriptor: &ReleaseDescriptor,
  env: &EnvConfig,
  substituter: &dyn Substituter,
) -> DeployResult<String> {
  let with_image = template.replace(IMAGE_PLACEHOLDER, &descriptor.image());
  validate_template(&with_image, env)?;

  let names = referenced_variables(&with_image);
  tracing::debug!(backend = substituter.name(), variables = names.len(), "substituting template");
  let rendered = substituter.substitute(&with_image, &names, env)?;

  // A token may only remain if a secret value itself contains it.
  let leftovers: Vec<String> = names
    .iter()
    .map(|name| format!("${{{}}}", name))
    .filter(|token| rendered.contains(token.as_str()) && !env.iter().any(|(_, v)| v.contains(token.as_str())))
    .collect();
  if !leftovers.is_empty() {
    return Err(RenderError::LeftoverPlaceholders { tokens: leftovers }.into());
  }

  Ok(rendered)
}

/// Read the deployment template
pub fn load_template(path: &Path) -> DeployResult<String> {
  fs::read_to_string(path).map_err(|e| {
    RenderError::TemplateUnreadable {
      path: path.to_path_buf(),
      reason: e.to_string(),
    }
    .into()
  })
}

/// A rendered manifest in a scoped temporary file
#[derive(Debug)]
pub struct RenderedManifest {
  descriptor: ReleaseDescriptor,
  file: NamedTempFile,
}

impl RenderedManifest {
  pub fn path(&self) -> &Path {
    self.file.path()
  }

  pub fn descriptor(&self) -> &ReleaseDescriptor {
    &self.descriptor
  }
}

/// Render and materialise the manifest for `descriptor`
pub fn render_manifest(
  template: &str,
  descriptor: &ReleaseDescriptor,
  env: &EnvConfig,
  substituter: &dyn Substituter,
) -> DeployResult<RenderedManifest> {
  let text = render_text(template, descriptor, env, substituter)?;

  let mut file = tempfile::Builder::new()
    .prefix("kube-rail-manifest-")
    .suffix(".yaml")
    .tempfile()?;
  file.write_all(text.as_bytes())?;
  file.flush()?;

  tracing::debug!(path = %file.path().display(), "rendered manifest");
  Ok(RenderedManifest {
    descriptor: descriptor.clone(),
    file,
  })
}
