//! Tests for the `apply` and `all` actions

use crate::helpers::*;
use anyhow::Result;
use std::time::{Duration, Instant};

#[test]
fn test_all_publishes_then_applies_once() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["--version", "v2.0.0"])?;

  let calls = project.calls()?;
  let last_push = calls.iter().rposition(|c| c.starts_with("docker push"));
  let apply = calls.iter().position(|c| c.starts_with("kubectl") && c.contains(" apply "));
  assert!(last_push.is_some() && apply.is_some());
  assert!(last_push < apply, "{:?}", calls);

  assert_eq!(project.calls_to("kubectl", "apply")?.len(), 1);
  assert!(calls.iter().any(|c| c.starts_with("kubectl --namespace bots apply --filename ")));
  Ok(())
}

#[test]
fn test_applied_manifest_is_fully_rendered_and_removed() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["all", "--version", "v2.0.0"])?;

  let manifest = project.applied_manifest()?;
  assert!(manifest.contains(&format!("image: {}:v2.0.0", REPOSITORY)));
  for name in REQUIRED_VARS {
    assert!(manifest.contains(&format!("value-of-{}", name.to_lowercase())), "{}", name);
  }
  assert!(!manifest.contains("DOCKER_IMAGE_NAME"));
  assert!(!manifest.contains("${"));

  assert!(project.leftover_manifests()?.is_empty());
  Ok(())
}

#[test]
fn test_apply_requires_version() -> Result<()> {
  let project = TestProject::new()?;
  let output = project.run(&["apply"])?;

  assert!(!output.status.success());
  assert!(stderr(&output).contains("--version"));
  assert!(project.calls()?.is_empty());
  Ok(())
}

#[test]
fn test_apply_only_never_builds() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["apply", "--version", "v1.9.0"])?;

  assert_eq!(
    project.calls_to("docker", "manifest")?,
    vec![format!("docker manifest inspect {}:v1.9.0", REPOSITORY)]
  );
  assert!(project.calls_to("docker", "build")?.is_empty());
  assert!(project.calls_to("docker", "push")?.is_empty());
  assert_eq!(project.calls_to("kubectl", "apply")?.len(), 1);
  assert!(project.applied_manifest()?.contains(&format!("{}:v1.9.0", REPOSITORY)));
  Ok(())
}

#[test]
fn test_apply_of_unpublished_version_fails() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "manifest");
  project.set_env("FAKE_DOCKER_ERROR", "no such manifest: docker.io/acme/telegram-bot:v0.0.1");

  let output = project.run(&["apply", "--version", "v0.0.1"])?;
  assert_eq!(output.status.code(), Some(22));
  assert!(stderr(&output).contains("not found in registry"));
  assert!(project.calls_to("kubectl", "apply")?.is_empty());
  Ok(())
}

#[test]
fn test_registry_auth_failure_is_not_reported_as_missing() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "manifest");
  project.set_env("FAKE_DOCKER_ERROR", "unauthorized: authentication required");

  let output = project.run(&["apply", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(20));
  assert!(stderr(&output).contains("unauthorized: authentication required"));
  assert!(!stderr(&output).contains("not found in registry"));
  assert!(project.calls_to("kubectl", "apply")?.is_empty());
  Ok(())
}

#[test]
fn test_registry_outage_quotes_the_reason() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_DOCKER_FAIL", "manifest");
  project.set_env("FAKE_DOCKER_ERROR", "Get \"https://registry-1.docker.io/v2/\": dial tcp: i/o timeout");

  let output = project.run(&["apply", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(22));
  assert!(stderr(&output).contains("i/o timeout"));
  assert!(!stderr(&output).contains("not found in registry"));
  Ok(())
}

#[test]
fn test_rejected_manifest() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_KUBECTL_APPLY_FAIL", "1");

  let output = project.run(&["apply", "--version", "v1"])?;
  assert_eq!(output.status.code(), Some(31));
  assert!(stderr(&output).contains("admission webhook"));
  assert!(project.calls_to("kubectl", "get")?.is_empty());
  assert!(project.leftover_manifests()?.is_empty());
  Ok(())
}

#[test]
fn test_rollout_timeout() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_KUBECTL_STATUS", STALLED_STATUS);

  let started = Instant::now();
  let output = project.run(&["apply", "--version", "v1", "--timeout", "2", "--poll-interval", "1"])?;

  assert_eq!(output.status.code(), Some(32));
  assert!(stderr(&output).contains("did not converge within 2s"));
  assert!(started.elapsed() < Duration::from_secs(30));

  // Applied once, polled repeatedly
  assert_eq!(project.calls_to("kubectl", "apply")?.len(), 1);
  assert!(project.calls_to("kubectl", "get")?.len() >= 2);
  assert!(project.leftover_manifests()?.is_empty());
  Ok(())
}

#[test]
fn test_unreadable_status_is_retried_until_timeout() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_KUBECTL_STATUS", "not json");

  let output = project.run(&["apply", "--version", "v1", "--timeout", "2", "--poll-interval", "1"])?;
  assert_eq!(output.status.code(), Some(32));
  assert!(project.calls_to("kubectl", "get")?.len() >= 2);
  Ok(())
}

#[test]
fn test_hanging_status_query_is_cut_off_at_deadline() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_KUBECTL_STATUS", STALLED_STATUS);
  project.set_env("FAKE_KUBECTL_GET_SLEEP", "20");

  let started = Instant::now();
  let output = project.run(&["apply", "--version", "v1", "--timeout", "2", "--poll-interval", "1"])?;
  let took = started.elapsed();

  assert_eq!(output.status.code(), Some(32), "{}", stderr(&output));
  // timeout + poll interval, plus slack for process startup
  assert!(took < Duration::from_secs(6), "took {:?}", took);

  let gets = project.calls_to("kubectl", "get")?;
  assert!(!gets.is_empty());
  assert!(gets.iter().all(|c| c.contains("--request-timeout=")), "{:?}", gets);
  assert!(project.leftover_manifests()?.is_empty());
  Ok(())
}

#[test]
fn test_interrupt_removes_manifest() -> Result<()> {
  let mut project = TestProject::new()?;
  project.set_env("FAKE_KUBECTL_STATUS", STALLED_STATUS);

  let mut child = project.spawn(&["apply", "--version", "v1", "--timeout", "60", "--poll-interval", "1"])?;

  // Wait until the manifest is applied and the rollout is being polled
  let started = Instant::now();
  while project.calls_to("kubectl", "get")?.is_empty() {
    if started.elapsed() > Duration::from_secs(20) {
      child.kill()?;
      anyhow::bail!("rollout was never polled");
    }
    std::thread::sleep(Duration::from_millis(50));
  }
  assert_eq!(project.leftover_manifests()?.len(), 1, "manifest exists while waiting");

  let pid = libc::pid_t::try_from(child.id())?;
  // SAFETY: sends SIGINT to the child spawned above.
  unsafe {
    libc::kill(pid, libc::SIGINT);
  }
  let output = child.wait_with_output()?;

  assert_eq!(output.status.code(), Some(130), "{}", stderr(&output));
  assert!(started.elapsed() < Duration::from_secs(30));
  assert!(project.leftover_manifests()?.is_empty());
  assert_eq!(project.calls_to("kubectl", "apply")?.len(), 1);
  Ok(())
}

#[test]
fn test_namespace_override() -> Result<()> {
  let project = TestProject::new()?;
  project.run_ok(&["apply", "--version", "v1", "--namespace", "staging"])?;

  assert!(
    project
      .calls()?
      .iter()
      .any(|c| c.starts_with("kubectl --namespace staging apply"))
  );
  Ok(())
}

#[test]
fn test_json_summary() -> Result<()> {
  let project = TestProject::new()?;
  let output = project.run_ok(&["apply", "--version", "v1", "--json"])?;

  let summary: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(summary["image"], format!("{}:v1", REPOSITORY));
  assert_eq!(summary["published"], false);
  assert_eq!(summary["rollout"]["updated"], 1);
  Ok(())
}

#[test]
fn test_json_stdout_is_only_the_summary() -> Result<()> {
  let project = TestProject::new()?;

  for action in ["all", "build"] {
    let output = project.run_ok(&[action, "--version", "v3", "--json"])?;
    let text = stdout(&output);
    let summary: serde_json::Value =
      serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("{action}: {e}\nstdout: {text}"))?;
    assert_eq!(summary["action"], action);
    assert_eq!(summary["published"], true);

    // Phase lines and tool output still reach the operator
    assert!(stderr(&output).contains("Pushing"), "{action}");
    assert!(stderr(&output).contains("fake docker: push"), "{action}");
  }
  Ok(())
}
