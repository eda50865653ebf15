//! Release orchestration: build, publish, render, apply, wait
//!
//! # Core Invariants
//!
//! 1. **One version per run**
//!    - Computed once (caller tag or `YYYYMMDD-HHMMSS`)
//!    - Used for the build tag, both pushes, and the manifest image
//!
//! 2. **Never apply an unpublished image**
//!    - `all` publishes first; `apply` verifies the tag exists in the registry
//!    - Enforced by the `PublishedImage` value the apply phase requires
//!
//! 3. **Never apply an unresolved placeholder**
//!    - Every `${VAR}` in the template must come from the env file
//!    - The rendered file is temporary and removed on every exit path
//!
//! 4. **Apply once, then observe**
//!    - Polling reads deployment status and never re-submits the manifest
//!
//! # Example rail.toml
//!
//! ```toml
//! [registry]
//! account = "acme"
//! image = "telegram-bot"
//!
//! [deploy]
//! namespace = "telegram-bot"
//! template = "k8s/deployment.yaml"
//! timeout_secs = 300
//! poll_interval_secs = 5
//! ```

pub mod pipeline;
pub mod publish;
pub mod render;
pub mod rollout;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{Backends, ReleasePlan, RolloutPlan};
pub use publish::PublishRequest;
