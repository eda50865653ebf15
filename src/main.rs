mod backend;
mod checks;
mod commands;
mod core;
mod release;
mod ui;

use clap::Parser;
use core::config::Overrides;
use core::context::{Action, RunContext};
use core::error::{DeployError, print_error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build, publish, and roll out the bot's container image
#[derive(Parser)]
#[command(name = "kube-rail")]
#[command(about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// What to run
  #[arg(value_enum, default_value_t = Action::All)]
  action: Action,

  /// Release version tag (default: local timestamp YYYYMMDD-HHMMSS)
  #[arg(long = "version", value_name = "VERSION")]
  release_version: Option<String>,

  /// Registry account (overrides [registry] account)
  #[arg(long)]
  username: Option<String>,

  /// Kubernetes namespace (overrides [deploy] namespace)
  #[arg(long)]
  namespace: Option<String>,

  /// Seconds to wait for the rollout to converge
  #[arg(long, value_name = "SECS")]
  timeout: Option<u64>,

  /// Seconds between rollout status polls
  #[arg(long, value_name = "SECS")]
  poll_interval: Option<u64>,

  /// Path to rail.toml (default: search the working directory)
  #[arg(long, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Path to the env file (default: .env)
  #[arg(long, value_name = "PATH")]
  env_file: Option<PathBuf>,

  /// Output results in JSON format
  #[arg(long)]
  json: bool,

  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long)]
  verbose: bool,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "kube_rail=debug" } else { "kube_rail=warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn run(cli: Cli) -> Result<(), DeployError> {
  let root = std::env::current_dir()?;
  let overrides = Overrides {
    username: cli.username,
    namespace: cli.namespace,
    env_file: cli.env_file,
    timeout_secs: cli.timeout,
    poll_interval_secs: cli.poll_interval,
  };
  let ctx = RunContext::build(
    &root,
    cli.action,
    cli.config.as_deref(),
    cli.release_version,
    overrides,
  )?;

  match ctx.action {
    Action::Check => commands::run_check(&ctx, cli.json),
    Action::Render => commands::run_render(&ctx),
    Action::Build | Action::Apply | Action::All => commands::run_deploy(&ctx, cli.json),
  }
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);
  core::interrupt::install();

  // Everything `run` owns (including the temporary manifest) is dropped before exit.
  if let Err(err) = run(cli) {
    handle_error(err);
  }
}

fn handle_error(err: DeployError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
