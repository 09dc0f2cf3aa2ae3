// src/verification/command.rs
use serde::Serialize;

/// Output kept per stream in reports.
const TAIL_CHARS: usize = 4000;

/// Result of running one external command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// The command that was executed (display form).
    command: String,
    passed: bool,
    /// Process exit code (-1 if unavailable: spawn failure, signal, timeout).
    exit_code: i32,
    timed_out: bool,
    stdout: String,
    stderr: String,
    duration_ms: u64,
}

impl CommandResult {
    #[must_use]
    pub fn new(
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            command,
            passed: exit_code == 0,
            exit_code,
            timed_out: false,
            stdout: tail(stdout),
            stderr: tail(stderr),
            duration_ms,
        }
    }

    /// A command killed after exceeding its time limit.
    #[must_use]
    pub fn timed_out(command: String, limit_secs: u64, duration_ms: u64) -> Self {
        Self {
            command,
            passed: false,
            exit_code: -1,
            timed_out: true,
            stdout: String::new(),
            stderr: format!("timed out after {limit_secs}s, process killed"),
            duration_ms,
        }
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Combined stdout and stderr output.
    #[must_use]
    pub fn output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Count error lines in output.
    #[must_use]
    pub fn error_count(&self) -> usize {
        count_matching_lines(&self.output(), |lower| {
            lower.contains("error:") || lower.contains("error[") || lower.starts_with("error")
        })
    }
}

/// Last `TAIL_CHARS` characters of `s`, on a char boundary.
fn tail(s: String) -> String {
    let count = s.chars().count();
    if count <= TAIL_CHARS {
        return s;
    }
    s.chars().skip(count - TAIL_CHARS).collect()
}

fn count_matching_lines(text: &str, predicate: impl Fn(&str) -> bool) -> usize {
    text.lines()
        .filter(|line| predicate(&line.to_lowercase()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passed_only_on_zero() {
        assert!(CommandResult::new("true".into(), 0, String::new(), String::new(), 1).passed());
        assert!(!CommandResult::new("false".into(), 1, String::new(), String::new(), 1).passed());
    }

    #[test]
    fn timeout_is_never_a_pass() {
        let r = CommandResult::timed_out("sleep 9".into(), 1, 1000);
        assert!(!r.passed());
        assert!(r.is_timed_out());
        assert_eq!(r.exit_code(), -1);
    }

    #[test]
    fn long_output_keeps_the_tail() {
        let long = format!("{}END", "x".repeat(TAIL_CHARS * 2));
        let r = CommandResult::new("cmd".into(), 1, long, String::new(), 0);
        assert_eq!(r.stdout().chars().count(), TAIL_CHARS);
        assert!(r.stdout().ends_with("END"));
    }

    #[test]
    fn counts_error_lines() {
        let r = CommandResult::new(
            "tsc".into(),
            2,
            String::new(),
            "src/a.ts(1,1): error TS2304: x\nerror: bad\nnote: fine\n".into(),
            0,
        );
        assert_eq!(r.error_count(), 2);
    }
}
