//! CLI commands for kube-rail
//!
//! - **deploy**: `build`, `apply`, and `all` (build then apply)
//! - **check**: run the precondition checks and report
//! - **render**: print the rendered manifest without applying it
//!
//! All commands accept `&RunContext` so config and version are resolved once.

pub mod check;
pub mod deploy;
pub mod render;

pub use check::run_check;
pub use deploy::run_deploy;
pub use render::run_render;
