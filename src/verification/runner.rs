//! Command execution and output capture.

use super::command::CommandResult;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<thread::JoinHandle<String>> {
    stream.map(|mut s| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = s.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).to_string()
        })
    })
}

fn collect(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Runs a single command string in `root`, killing it after `timeout`.
///
/// Uses POSIX shell-style quoting rules via `shell_words::split` so that
/// commands like `npx tsc -p "tsconfig build.json"` are parsed correctly.
#[must_use]
pub fn run_single_command(root: &Path, cmd_str: &str, timeout: Duration) -> CommandResult {
    let start = Instant::now();

    let parts = match shell_words::split(cmd_str) {
        Ok(p) => p,
        Err(e) => {
            return CommandResult::new(
                cmd_str.to_string(),
                -1,
                String::new(),
                format!("Failed to parse command: {e}"),
                0,
            );
        }
    };

    let Some(program) = parts.first() else {
        return CommandResult::new(
            cmd_str.to_string(),
            -1,
            String::new(),
            "Empty command".to_string(),
            0,
        );
    };

    let spawned = Command::new(program)
        .args(&parts[1..])
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(c) => c,
        Err(e) => {
            return CommandResult::new(
                cmd_str.to_string(),
                -1,
                String::new(),
                format!("Failed to execute: {e}"),
                elapsed_ms(start),
            );
        }
    };

    let out = drain(child.stdout.take());
    let err = drain(child.stderr.take());

    match child.wait_timeout(timeout) {
        Ok(Some(status)) => {
            let exit_code = status.code().unwrap_or(-1);
            CommandResult::new(
                cmd_str.to_string(),
                exit_code,
                collect(out),
                collect(err),
                elapsed_ms(start),
            )
        }
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            // Readers are left detached: grandchildren may still hold the pipes.
            tracing::warn!(command = cmd_str, secs = timeout.as_secs(), "command timed out");
            CommandResult::timed_out(cmd_str.to_string(), timeout.as_secs(), elapsed_ms(start))
        }
        Err(e) => {
            let _ = child.kill();
            CommandResult::new(
                cmd_str.to_string(),
                -1,
                String::new(),
                format!("Failed to execute: {e}"),
                elapsed_ms(start),
            )
        }
    }
}
