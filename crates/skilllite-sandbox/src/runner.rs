//! Resource-bounded bash execution: policy-checked, merged-stream, truncated.
//!
//! Grounded on the teacher's background-thread draining and post-exit
//! `getrusage` check (see `common::get_children_peak_rss_bytes`), adapted
//! from separate stdout/stderr to a single merged stream (ordering
//! preserved via a shared buffer) and wired through the [`crate::policy`]
//! validator and `skilllite_core::limiter` tail truncation ahead of
//! returning to the caller.

use crate::common::get_children_peak_rss_bytes;
use crate::policy;
use anyhow::{Context, Result};
use skilllite_core::limiter::{truncate_tail, TruncateResult};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Environment variables forwarded to the child process; everything else is
/// stripped so commands can't read secrets from the agent's own environment.
pub const ENV_WHITELIST: &[&str] = &["PATH", "HOME", "USER", "SHELL", "TERM", "LANG", "TZ"];

const MEMORY_CHECK_INTERVAL_MS: u64 = 100;
const MAX_OUTPUT_LINES: usize = 2_000;
const MAX_OUTPUT_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: TruncateResult,
    pub exit_code: i32,
    pub killed: bool,
    pub kill_reason: Option<String>,
}

/// Validate, then run `command` under `/bin/bash -c` in `workdir` with a
/// restricted environment, a timeout, and a memory cap. Returns the combined
/// (interleaved) stdout+stderr, tail-truncated to the substrate's output limits.
pub fn run_bash(
    command: &str,
    workdir: &std::path::Path,
    timeout_ms: u64,
    max_memory_mb: u64,
) -> Result<RunOutcome> {
    let sanitized = policy::sanitize(command);
    policy::validate(&sanitized).map_err(|reason| anyhow::anyhow!("command rejected: {reason}"))?;

    let mut cmd = Command::new("/bin/bash");
    cmd.arg("-c")
        .arg(&sanitized)
        .current_dir(workdir)
        .env_clear()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for key in ENV_WHITELIST {
        if let Ok(val) = std::env::var(key) {
            cmd.env(key, val);
        }
    }

    let mut child = cmd.spawn().context("failed to spawn bash command")?;
    let combined = Arc::new(Mutex::new(String::new()));

    let stdout_handle = child.stdout.take().map(|mut out| {
        let combined = Arc::clone(&combined);
        thread::spawn(move || drain_into(&mut out, &combined))
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        let combined = Arc::clone(&combined);
        thread::spawn(move || drain_into(&mut err, &combined))
    });

    let timeout = Duration::from_millis(timeout_ms);
    let memory_limit_bytes = max_memory_mb * 1024 * 1024;
    let check_interval = Duration::from_millis(MEMORY_CHECK_INTERVAL_MS);
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            if let Some(h) = stdout_handle {
                let _ = h.join();
            }
            if let Some(h) = stderr_handle {
                let _ = h.join();
            }
            if let Some(peak) = get_children_peak_rss_bytes() {
                if peak > memory_limit_bytes {
                    return Ok(kill_outcome(
                        format!(
                            "peak memory ({} MB) exceeded limit ({} MB)",
                            peak / (1024 * 1024),
                            max_memory_mb
                        ),
                        "memory_limit",
                    ));
                }
            }
            let text = Arc::try_unwrap(combined)
                .map(|m| m.into_inner().unwrap())
                .unwrap_or_default();
            let output = truncate_tail(&text, MAX_OUTPUT_LINES, MAX_OUTPUT_BYTES);
            return Ok(RunOutcome {
                output,
                exit_code: status.code().unwrap_or(-1),
                killed: false,
                kill_reason: None,
            });
        }

        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(kill_outcome(
                format!("exceeded timeout of {timeout_ms} ms"),
                "timeout",
            ));
        }

        if let Some(rss) = crate::common::get_process_memory(child.id()) {
            if rss > memory_limit_bytes {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(kill_outcome(
                    format!(
                        "memory usage ({} MB) exceeded limit ({max_memory_mb} MB)",
                        rss / (1024 * 1024)
                    ),
                    "memory_limit",
                ));
            }
        }

        thread::sleep(check_interval);
    }
}

fn kill_outcome(message: String, reason: &str) -> RunOutcome {
    RunOutcome {
        output: truncate_tail(&message, MAX_OUTPUT_LINES, MAX_OUTPUT_BYTES),
        exit_code: -1,
        killed: true,
        kill_reason: Some(reason.to_string()),
    }
}

fn drain_into(reader: &mut impl Read, combined: &Arc<Mutex<String>>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                combined.lock().unwrap().push_str(&chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_allowed_command_and_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_bash("echo hello", dir.path(), 5_000, 256).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.output.content.contains("hello"));
        assert!(!outcome.killed);
    }

    #[test]
    fn rejects_denied_command_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_bash("sudo rm -rf /", dir.path(), 5_000, 256).unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn kills_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_bash("sleep 5", dir.path(), 100, 256).unwrap();
        assert!(outcome.killed);
        assert_eq!(outcome.kill_reason.as_deref(), Some("timeout"));
    }

    #[test]
    fn restricted_environment_hides_unlisted_vars() {
        std::env::set_var("SKILLLITE_TEST_SECRET", "do-not-leak");
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_bash("echo $SKILLLITE_TEST_SECRET", dir.path(), 5_000, 256).unwrap();
        assert!(!outcome.output.content.contains("do-not-leak"));
    }
}
