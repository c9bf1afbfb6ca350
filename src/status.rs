use std::process::ExitCode;

use derive_more::Display;

/// Exit status accumulated over a run. The variants are ordered so that
/// combining two statuses is just `max`; an error always wins over a change.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Ord, PartialOrd)]
pub enum ExitStatus {
    #[default]
    #[display("clean")]
    Clean,
    #[display("changed")]
    Changed,
    #[display("error")]
    Error,
}

impl ExitStatus {
    /// Escalate to `other` if it is worse. Never goes back down.
    pub fn escalate(&mut self, other: ExitStatus) {
        *self = (*self).max(other);
    }

    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Changed => 1,
            ExitStatus::Error => 2,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
