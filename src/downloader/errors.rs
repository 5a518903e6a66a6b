// Error types for the downloader core

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// Bad interactive input (absolute subfolder, empty host, ...)
    #[error("{0}")]
    InvalidInput(String),

    /// URL failed local validation before any extractor run
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A required external binary is missing
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Timeout / DNS / connect-level failure
    #[error("Network trouble: {0}")]
    Network(String),

    /// Failed to parse extractor output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Child process could not be started or awaited
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Filesystem operation failed
    #[error("Filesystem error: {0}")]
    Io(String),

    /// Anything the classifier could not pin down
    #[error("{0}")]
    Unknown(String),
}

// Coarse classification of free-text errors surfaced by external tools.
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection refused")
            || lower.contains("connection reset")
            || lower.contains("name or service not known")
        {
            return Self::Network(s);
        }

        if lower.contains("not found")
            || lower.contains("no such file")
            || lower.contains("command not found")
        {
            return Self::ToolNotFound(s);
        }

        if lower.contains("json") || lower.contains("parse") {
            return Self::ParseError(s);
        }

        if lower.contains("unsupported url") || lower.contains("is not a valid url") {
            return Self::InvalidUrl(s);
        }

        Self::Unknown(s)
    }
}
