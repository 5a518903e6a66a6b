// Common data models for the downloader

use serde::Serialize;
use std::path::PathBuf;
use url::Url;

use crate::downloader::diagnostics::FailureReason;
use crate::downloader::formats::FormatKind;

/// One user request: a URL plus where and how to export it.
/// Built once from the prompts; immutable afterwards.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub url: Url,
    pub out_dir: PathBuf,
    pub formats: Vec<FormatKind>,
}

/// Result of one format's invocation. Reported, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub format: FormatKind,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, Serialize)]
pub enum OutcomeStatus {
    Success,
    Failure {
        reason: FailureReason,
        /// Error text surfaced by the external tool, verbatim where available
        detail: String,
    },
}

impl DownloadOutcome {
    pub fn success(format: FormatKind) -> Self {
        Self {
            format,
            status: OutcomeStatus::Success,
        }
    }

    pub fn failure(format: FormatKind, reason: FailureReason, detail: String) -> Self {
        Self {
            format,
            status: OutcomeStatus::Failure { reason, detail },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success)
    }
}

/// Session-wide tally driving the process exit code: non-zero only when
/// jobs ran and every one of them failed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionTally {
    pub attempted: usize,
    pub succeeded: usize,
}

impl SessionTally {
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        }
    }

    pub fn exit_code(&self) -> u8 {
        if self.attempted > 0 && self.succeeded == 0 {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session_exits_zero() {
        assert_eq!(SessionTally::default().exit_code(), 0);
    }

    #[test]
    fn test_all_failed_exits_nonzero() {
        let mut tally = SessionTally::default();
        tally.record(&DownloadOutcome::failure(
            FormatKind::Mp4,
            FailureReason::Unknown,
            String::new(),
        ));
        assert_eq!(tally.exit_code(), 1);
    }

    #[test]
    fn test_one_success_exits_zero() {
        let mut tally = SessionTally::default();
        tally.record(&DownloadOutcome::failure(
            FormatKind::Mp3,
            FailureReason::FormatUnavailable,
            String::new(),
        ));
        tally.record(&DownloadOutcome::success(FormatKind::Mp4));
        assert_eq!(tally.exit_code(), 0);
    }
}
