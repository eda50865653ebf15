//! Tests for the `build` action

use crate::helpers::*;
use anyhow::Result;
use regex::Regex;

#[test]
fn test_build_pushes_version_then_latest() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["build", "--version", "v1.2.3"])?;

  assert_eq!(
    project.calls_to("docker", "push")?,
    vec![
      format!("docker push {}:v1.2.3", REPOSITORY),
      format!("docker push {}:latest", REPOSITORY),
    ]
  );
  assert_eq!(
    project.calls_to("docker", "tag")?,
    vec![format!("docker tag {0}:v1.2.3 {0}:latest", REPOSITORY)]
  );
  assert!(project.calls_to("kubectl", "apply")?.is_empty());
  Ok(())
}

#[test]
fn test_build_sequence() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["build", "--version", "v1.2.3"])?;

  let subcommands: Vec<String> = project
    .calls()?
    .iter()
    .filter_map(|call| call.split_whitespace().nth(1).map(String::from))
    .collect();
  assert_eq!(subcommands, vec!["info", "login", "build", "push", "tag", "push"]);
  Ok(())
}

#[test]
fn test_default_version_is_timestamp_shared_by_every_tag() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["build"])?;

  let pattern = Regex::new(&format!(r"^docker build --tag {}:(\d{{8}}-\d{{6}}) ", REPOSITORY))?;
  let builds = project.calls_to("docker", "build")?;
  assert_eq!(builds.len(), 1);
  let version = pattern
    .captures(&builds[0])
    .map(|c| c[1].to_string())
    .ok_or_else(|| anyhow::anyhow!("unexpected build call: {}", builds[0]))?;

  assert_eq!(
    project.calls_to("docker", "push")?,
    vec![
      format!("docker push {}:{}", REPOSITORY, version),
      format!("docker push {}:latest", REPOSITORY),
    ]
  );
  Ok(())
}

#[test]
fn test_password_from_env_file_goes_to_stdin() -> Result<()> {
  let project = TestProject::new()?;
  let output = project.run_ok(&["build", "--version", "v1"])?;

  let logins = project.calls_to("docker", "login")?;
  assert_eq!(logins, vec!["docker login --username acme --password-stdin".to_string()]);

  let text = format!("{}{}{}", stdout(&output), stderr(&output), project.calls()?.join("\n"));
  assert!(!text.contains("registry-secret"));
  Ok(())
}

#[test]
fn test_login_failure_stops_before_build() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "login");

  let output = project.run(&["build", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(20));
  assert!(stderr(&output).contains("[login]"));
  assert!(project.calls_to("docker", "build")?.is_empty());
  Ok(())
}

#[test]
fn test_build_failure_publishes_nothing() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "build");

  let output = project.run(&["all", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(21));
  assert!(project.calls_to("docker", "push")?.is_empty());
  assert!(project.calls_to("kubectl", "apply")?.is_empty());
  Ok(())
}

#[test]
fn test_push_failure_never_applies() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "push");

  let output = project.run(&["all", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(22));
  assert!(stderr(&output).contains("[publish]"));
  assert!(project.calls_to("kubectl", "apply")?.is_empty());
  assert!(project.leftover_manifests()?.is_empty());
  Ok(())
}

#[test]
fn test_unreachable_daemon() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "info");

  let output = project.run(&["build", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(13));
  assert!(project.calls_to("docker", "login")?.is_empty());
  Ok(())
}
