//! Check command: run every precondition and report without side effects

use crate::checks::{self, CheckContext, CheckResult, Severity, create_default_runner};
use crate::core::context::RunContext;
use crate::core::error::DeployResult;
use serde::Serialize;

/// JSON report for `kube-rail check --json`
#[derive(Debug, Serialize)]
struct CheckReport<'a> {
  passed: bool,
  image: Option<String>,
  namespace: &'a str,
  checks: &'a [CheckResult],
}

/// Run the check command
pub fn run_check(ctx: &RunContext, json: bool) -> DeployResult<()> {
  let check_ctx = CheckContext::from_run(ctx);
  let runner = create_default_runner(&check_ctx.config);
  let results = runner.run_all(&check_ctx)?;
  let failure = checks::failure(&results);

  if json {
    let report = CheckReport {
      passed: failure.is_none(),
      image: ctx.descriptor().ok().map(|d| d.image()),
      namespace: &ctx.config.deploy.namespace,
      checks: &results,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_results(&results, runner.checks().len());
  }

  match failure {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

fn print_results(results: &[CheckResult], registered: usize) {
  println!("🔍 Running {} precondition check(s)", registered);
  println!();

  for result in results {
    match (result.passed, result.severity) {
      (true, _) => println!("✅ {}: {}", result.check_name, result.message),
      (false, Severity::Error) => println!("❌ {}: {}", result.check_name, result.message),
      (false, Severity::Info) => println!("ℹ️  {}: {}", result.check_name, result.message),
    }
    if !result.passed
      && let Some(suggestion) = &result.suggestion
    {
      println!("   💡 {}", suggestion);
    }
  }

  let failed = results.iter().filter(|r| !r.passed).count();
  println!();
  if failed == 0 {
    println!("✅ All preconditions satisfied");
  } else {
    println!("⚠️  {} of {} check(s) failed", failed, results.len());
  }
}
