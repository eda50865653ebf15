//! Deploy command: build, apply, or both

use crate::backend::{Envsubst, SystemDocker, SystemKubectl};
use crate::checks::{CheckContext, create_default_runner};
use crate::core::config::RendererKind;
use crate::core::context::{Action, RunContext};
use crate::core::env::EnvConfig;
use crate::core::error::{DeployError, DeployResult, PreconditionError, ResultExt};
use crate::release::pipeline::{self, ReleaseOutcome};
use crate::release::render::{self, BuiltinSubstituter, Substituter};
use crate::release::rollout::{DeploymentStatus, SystemClock, WaitPolicy};
use crate::release::{Backends, PublishRequest, ReleasePlan, RolloutPlan};
use crate::ui::progress::WaitProgress;
use serde::Serialize;

/// JSON summary printed with `--json`
#[derive(Debug, Serialize)]
struct DeploySummary<'a> {
  action: String,
  version: &'a str,
  image: String,
  namespace: &'a str,
  published: bool,
  rollout: Option<&'a DeploymentStatus>,
}

/// Run every precondition check, failing before any external side effect
pub fn preflight(ctx: &RunContext) -> DeployResult<EnvConfig> {
  let check_ctx = CheckContext::from_run(ctx);
  let runner = create_default_runner(&check_ctx.config);
  let results = runner.validate(&check_ctx)?;
  tracing::info!(checks = results.len(), "preconditions satisfied");

  match check_ctx.env {
    Some(env) => Ok(env),
    None => Err(PreconditionError::MissingEnvFile { path: check_ctx.env_file }.into()),
  }
}

/// Substitution backend selected in rail.toml
pub fn substituter(kind: RendererKind) -> Box<dyn Substituter> {
  match kind {
    RendererKind::Envsubst => Box::new(Envsubst),
    RendererKind::Builtin => Box::new(BuiltinSubstituter),
  }
}

/// Registry password: process environment first, then the env file
fn registry_password(ctx: &RunContext, env: &EnvConfig) -> Option<String> {
  let name = &ctx.config.registry.password_env;
  std::env::var(name)
    .ok()
    .filter(|v| !v.is_empty())
    .or_else(|| env.get(name).map(str::to_string))
}

/// Assemble the plan for this run's action
fn plan(ctx: &RunContext, env: EnvConfig) -> DeployResult<ReleasePlan> {
  let descriptor = ctx.descriptor()?;

  let publish = if ctx.action.builds() {
    Some(PublishRequest {
      registry: ctx.config.registry.server.clone(),
      username: ctx.config.registry.account()?.to_string(),
      password: registry_password(ctx, &env),
      context: ctx.path(&ctx.config.build.context),
      dockerfile: ctx.config.build.dockerfile.as_ref().map(|p| ctx.path(p)),
    })
  } else {
    None
  };

  let rollout = if ctx.action.applies() {
    let template = render::load_template(&ctx.template())?;
    Some(RolloutPlan {
      template,
      env,
      deployment: ctx.config.deployment_name().to_string(),
      wait: WaitPolicy {
        timeout: ctx.config.deploy.timeout(),
        interval: ctx.config.deploy.poll_interval(),
      },
    })
  } else {
    None
  };

  Ok(ReleasePlan {
    descriptor,
    publish,
    rollout,
  })
}

/// Run the build, apply, or combined action
pub fn run_deploy(ctx: &RunContext, json: bool) -> DeployResult<()> {
  if ctx.action == Action::Apply && ctx.explicit_version.is_none() {
    return Err(DeployError::with_help(
      "apply needs the version of a previously published image",
      "Pass --version <tag> naming an image built by `kube-rail build`",
    ));
  }

  let env = preflight(ctx)?;
  let plan = plan(ctx, env)?;

  if !json {
    eprintln!(
      "📦 Release {} ({}) to namespace {}",
      plan.descriptor.version,
      ctx.action,
      plan.descriptor.namespace
    );
  }

  let engine = SystemDocker::new();
  let cluster = SystemKubectl::new();
  let clock = SystemClock;
  let substituter = substituter(ctx.config.deploy.renderer);
  let backends = Backends {
    engine: &engine,
    cluster: &cluster,
    clock: &clock,
    substituter: substituter.as_ref(),
  };

  let mut progress = match (&plan.rollout, json) {
    (Some(rollout), false) => WaitProgress::new(rollout.wait.timeout, format!("deployment/{}", rollout.deployment)),
    _ => WaitProgress::hidden(),
  };
  let outcome = pipeline::execute(&plan, &backends, &mut |poll| progress.observe(poll))
    .with_context(|| format!("Release {} failed", plan.descriptor.image()))?;
  if outcome.rollout.is_some() {
    progress.finish();
  }

  if json {
    print_json(ctx, &plan, &outcome)?;
  } else {
    print_outcome(&outcome);
  }
  Ok(())
}

fn print_outcome(outcome: &ReleaseOutcome) {
  println!();
  println!("✅ Published {}", outcome.published.image());
  if let Some(status) = &outcome.rollout {
    println!(
      "✅ Rolled out to namespace {} ({})",
      outcome.published.descriptor().namespace,
      status.summary()
    );
  }
}

fn print_json(ctx: &RunContext, plan: &ReleasePlan, outcome: &ReleaseOutcome) -> DeployResult<()> {
  let summary = DeploySummary {
    action: ctx.action.to_string(),
    version: plan.descriptor.version.as_str(),
    image: plan.descriptor.image(),
    namespace: &plan.descriptor.namespace,
    published: plan.publish.is_some(),
    rollout: outcome.rollout.as_ref(),
  };
  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}
