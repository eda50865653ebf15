//! Progress reporting for the rollout wait
//!
//! Uses `linya` for the bar when stderr is a terminal. Otherwise (CI logs,
//! redirected output) each poll is printed as a plain line.

use crate::release::rollout::Poll;
use linya::{Bar, Progress};
use std::io::IsTerminal;
use std::time::Duration;

/// Progress over the rollout deadline, advanced by each status poll
pub struct WaitProgress {
  bar: Option<(Progress, Bar)>,
  total: usize,
}

impl WaitProgress {
  /// Create a progress bar spanning `timeout` seconds
  pub fn new(timeout: Duration, label: impl Into<String>) -> Self {
    let total = timeout.as_secs().max(1) as usize;
    let bar = std::io::stderr().is_terminal().then(|| {
      let mut progress = Progress::new();
      let bar = progress.bar(total, label.into());
      (progress, bar)
    });
    Self { bar, total }
  }

  /// Hidden progress, for JSON output
  pub fn hidden() -> Self {
    Self { bar: None, total: 0 }
  }

  /// Record one poll of the wait loop
  pub fn observe(&mut self, poll: &Poll<'_>) {
    let status = poll
      .status
      .map(|s| s.summary())
      .unwrap_or_else(|| "status unavailable".to_string());

    match &mut self.bar {
      Some((progress, bar)) => {
        let pos = (poll.elapsed.as_secs() as usize).min(self.total);
        progress.set_and_draw(bar, pos);
      }
      None if self.total > 0 => {
        eprintln!("   attempt {} ({}s): {}", poll.attempt, poll.elapsed.as_secs(), status);
      }
      None => {}
    }
  }

  /// Fill the bar once the rollout converged
  pub fn finish(&mut self) {
    if let Some((progress, bar)) = &mut self.bar {
      progress.set_and_draw(bar, self.total);
    }
  }
}
