//! Subprocess helpers shared by the tool backends

use crate::core::error::{DeployError, DeployResult};
use crate::core::interrupt;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Output of a captured subprocess
#[derive(Debug)]
pub struct Captured {
  pub status: ExitStatus,
  pub stdout: String,
  pub stderr: String,
}

impl Captured {
  pub fn success(&self) -> bool {
    self.status.success()
  }

  /// Short failure reason: last non-empty stderr line, or the exit status
  pub fn reason(&self) -> String {
    self
      .stderr
      .lines()
      .rev()
      .map(str::trim)
      .find(|line| !line.is_empty())
      .map(String::from)
      .unwrap_or_else(|| describe_status(self.status))
  }
}

pub fn describe_status(status: ExitStatus) -> String {
  match status.code() {
    Some(code) => format!("exited with status {}", code),
    None => "terminated by signal".to_string(),
  }
}

/// Render a command line for logs
pub fn command_line(cmd: &Command) -> String {
  let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
  parts.extend(cmd.get_args().map(|a| a.to_string_lossy().to_string()));
  parts.join(" ")
}

fn spawn_error(cmd: &Command, err: std::io::Error) -> DeployError {
  DeployError::message(format!(
    "Failed to execute {}: {}",
    cmd.get_program().to_string_lossy(),
    err
  ))
}

/// Run to completion, capturing stdout and stderr
pub fn capture(cmd: &mut Command) -> DeployResult<Captured> {
  capture_with_input(cmd, None)
}

/// Run to completion with `input` on stdin, capturing stdout and stderr
pub fn capture_with_input(cmd: &mut Command, input: Option<&str>) -> DeployResult<Captured> {
  tracing::debug!(command = %command_line(cmd), "running");

  cmd
    .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

  let mut child = cmd.spawn().map_err(|e| spawn_error(cmd, e))?;
  // Feed stdin from a separate thread so a large template cannot deadlock against a full stdout pipe.
  let writer = match (input, child.stdin.take()) {
    (Some(input), Some(mut stdin)) => {
      let input = input.to_string();
      Some(std::thread::spawn(move || stdin.write_all(input.as_bytes())))
    }
    _ => None,
  };
  let output = child.wait_with_output()?;
  if let Some(writer) = writer {
    match writer.join() {
      Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
      Ok(result) => result?,
      Err(_) => return Err(DeployError::message("stdin writer thread panicked")),
    }
  }
  interrupt::check()?;

  let captured = Captured {
    status: output.status,
    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
  };
  tracing::trace!(status = ?captured.status, "finished");
  Ok(captured)
}

/// Run to completion like `capture`, but kill the child once `limit` has passed.
///
/// The child gets its own process group so a wrapper script and everything it
/// started are killed together.
pub fn capture_within(cmd: &mut Command, limit: Duration) -> DeployResult<Captured> {
  tracing::debug!(command = %command_line(cmd), limit_ms = limit.as_millis() as u64, "running");

  cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
  #[cfg(unix)]
  {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
  }

  let mut child = cmd.spawn().map_err(|e| spawn_error(cmd, e))?;
  let stdout = child.stdout.take().map(drain);
  let stderr = child.stderr.take().map(drain);
  let deadline = Instant::now() + limit;

  let status = loop {
    if let Some(status) = child.try_wait()? {
      break status;
    }
    if interrupt::requested() {
      kill(&mut child);
      return Err(DeployError::Interrupted);
    }
    if Instant::now() >= deadline {
      kill(&mut child);
      return Err(DeployError::message(format!(
        "{} did not finish within {}ms",
        cmd.get_program().to_string_lossy(),
        limit.as_millis()
      )));
    }
    std::thread::sleep(WAIT_SLICE);
  };

  let captured = Captured {
    status,
    stdout: collect(stdout),
    stderr: collect(stderr),
  };
  tracing::trace!(status = ?captured.status, "finished");
  Ok(captured)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
  std::thread::spawn(move || {
    let mut buf = Vec::new();
    // A read error only truncates the output
    let _ = pipe.read_to_end(&mut buf);
    buf
  })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
  reader
    .and_then(|handle| handle.join().ok())
    .map(|buf| String::from_utf8_lossy(&buf).into_owned())
    .unwrap_or_default()
}

fn kill(child: &mut Child) {
  #[cfg(unix)]
  {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
      // SAFETY: signals only the process group created for this child.
      unsafe {
        libc::kill(-pid, libc::SIGKILL);
      }
    }
  }
  if let Err(err) = child.kill() {
    tracing::debug!(error = %err, "kill failed");
  }
  if let Err(err) = child.wait() {
    tracing::debug!(error = %err, "reaping killed child failed");
  }
}

/// Run with the tool's output shown to the operator.
///
/// Child stdout is sent to our stderr so stdout only ever carries results.
pub fn stream(cmd: &mut Command) -> DeployResult<ExitStatus> {
  tracing::info!(command = %command_line(cmd), "running");

  let status = cmd
    .stdout(std::io::stderr())
    .status()
    .map_err(|e| spawn_error(cmd, e))?;
  interrupt::check()?;
  Ok(status)
}
