//! Precondition checks run before any image is built or manifest applied
//!
//! All checks implement the `Check` trait. The runner collects every failure
//! instead of stopping at the first, and the first failure decides the exit
//! code.
//!
//! # Built-in Checks
//!
//! - **tool:\<name\>**: a required executable (`docker`, `kubectl`, `envsubst`) is on PATH
//! - **env-file**: the dotenv file exists and parses
//! - **env:\<NAME\>**: a required variable is set and non-empty
//! - **registry-account**: the registry account is set and not a sample placeholder
//! - **template**: the deployment template resolves from the env file
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = CheckContext::from_run(&run);
//! let runner = create_default_runner(&ctx.config);
//!
//! for result in runner.run_all(&ctx)? {
//!   if !result.passed {
//!     println!("❌ {}: {}", result.check_name, result.message);
//!   }
//! }
//! ```

mod env;
mod registry;
mod runner;
mod template;
mod tools;
mod trait_def;

// Re-export public API
pub use runner::{create_default_runner, failure};
pub use trait_def::{CheckContext, CheckResult, Severity};

// Individual checks are not exported - they're registered in create_default_runner()
