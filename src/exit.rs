// src/exit.rs
//! Standardized process exit codes for `reforge`.
//!
//! Provides a stable contract for scripts and automation.

use std::process::Termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReforgeExit {
    /// Run completed. Per-file or validation failures may still be recorded
    /// in the report.
    Success = 0,
    /// Fatal error. If the mutation window had opened, the tree was rolled
    /// back from the snapshot.
    Fatal = 1,
}

impl ReforgeExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn exit(self) -> ! {
        std::process::exit(self.code())
    }
}

impl Termination for ReforgeExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}

impl From<anyhow::Result<()>> for ReforgeExit {
    fn from(res: anyhow::Result<()>) -> Self {
        match res {
            Ok(()) => Self::Success,
            Err(e) => {
                eprintln!("Error: {e}");
                Self::Fatal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_contract() {
        assert_eq!(ReforgeExit::Success.code(), 0);
        assert_eq!(ReforgeExit::Fatal.code(), 1);
    }

    #[test]
    fn error_result_maps_to_fatal() {
        let res: anyhow::Result<()> = Err(anyhow::anyhow!("boom"));
        assert_eq!(ReforgeExit::from(res), ReforgeExit::Fatal);
    }
}
