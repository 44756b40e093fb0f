use std::process::ExitCode;

use super::commands::CommandResult;

/// Exit status of the `spgm` binary.
///
/// - `Success` (0): command completed, warnings at most
/// - `Failure` (1): command completed but found errors; nothing was written
/// - `Error` (2): command could not run (bad config, unreadable database, ...)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Error,
}

impl ExitStatus {
    pub fn from_result(result: &CommandResult) -> Self {
        if result.error_count > 0 {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}
