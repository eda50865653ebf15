//! Process-level interrupt flag
//!
//! SIGINT and SIGTERM only set a flag. Long-running phases poll it and return
//! `DeployError::Interrupted`, which unwinds through normal drops so scoped
//! temporary files are removed before the process exits.

use crate::core::error::{DeployError, DeployResult};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
  // Only async-signal-safe work here.
  INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers. Call once from main.
pub fn install() {
  #[cfg(unix)]
  {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
      libc::signal(libc::SIGINT, handler);
      libc::signal(libc::SIGTERM, handler);
    }
  }
}

/// Whether an interrupt has been received
pub fn requested() -> bool {
  INTERRUPTED.load(Ordering::SeqCst)
}

/// Return `Interrupted` if a signal arrived
pub fn check() -> DeployResult<()> {
  if requested() {
    tracing::warn!("interrupt received, aborting");
    return Err(DeployError::Interrupted);
  }
  Ok(())
}
