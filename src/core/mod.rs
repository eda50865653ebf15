//! Core engine for kube-rail
//!
//! - **config**: rail.toml parsing, defaults, and CLI overrides
//! - **context**: Per-run context (action, release descriptor)
//! - **env**: Secrets loaded from the dotenv file
//! - **error**: Error taxonomy with exit codes and help messages
//! - **interrupt**: SIGINT/SIGTERM flag for interrupt-safe cleanup

pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod interrupt;
