//! Preconditions fail before any build, push, or cluster call

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_missing_env_file() -> Result<()> {
  let project = TestProject::new()?;
  std::fs::remove_file(project.path.join(".env"))?;

  let output = project.run(&[])?;
  assert_eq!(output.status.code(), Some(11));
  assert!(stderr(&output).contains(".env"));
  assert!(project.calls()?.is_empty());
  Ok(())
}

#[test]
fn test_each_missing_variable_aborts_with_its_name() -> Result<()> {
  for name in REQUIRED_VARS {
    let project = TestProject::new()?;
    project.write_env(&[name])?;

    let output = project.run(&["all", "--version", "v1.0.0"])?;
    assert_eq!(output.status.code(), Some(12), "{}: {}", name, stderr(&output));
    assert!(stderr(&output).contains(name), "{}", name);
    assert!(project.calls()?.is_empty(), "{} reached docker or kubectl", name);
  }
  Ok(())
}

#[test]
fn test_empty_variable_counts_as_missing() -> Result<()> {
  let project = TestProject::new()?;
  std::fs::write(
    project.path.join(".env"),
    "TELEGRAM_TOKEN=\nANTHROPIC_API_KEY=a\nMONGODB_PASSWORD=b\nMONGODB_USERNAME=c\nSENTRY_DSN=d\n",
  )?;

  let output = project.run(&["build"])?;
  assert_eq!(output.status.code(), Some(12));
  assert!(stderr(&output).contains("TELEGRAM_TOKEN"));
  Ok(())
}

#[test]
fn test_missing_tool() -> Result<()> {
  for tool in ["docker", "kubectl"] {
    let project = TestProject::new()?;
    project.remove_tool(tool)?;

    let output = project.run(&["all", "--version", "v1.0.0"])?;
    assert_eq!(output.status.code(), Some(10), "{}", tool);
    assert!(stderr(&output).contains(tool));
    assert!(project.calls()?.is_empty());
  }
  Ok(())
}

#[test]
fn test_placeholder_username_rejected() -> Result<()> {
  let project = TestProject::new()?;
  let output = project.run(&["build", "--username", "your-dockerhub-username"])?;

  assert_eq!(output.status.code(), Some(13));
  assert!(project.calls()?.is_empty());
  Ok(())
}

#[test]
fn test_unresolvable_template_fails_before_build() -> Result<()> {
  let project = TestProject::new()?;
  project.write_template("image: DOCKER_IMAGE_NAME\nwebhook: ${WEBHOOK_URL}\n")?;

  let output = project.run(&["all", "--version", "v1.0.0"])?;
  assert_eq!(output.status.code(), Some(30));
  assert!(stderr(&output).contains("WEBHOOK_URL"));
  assert!(project.calls()?.is_empty());
  Ok(())
}
