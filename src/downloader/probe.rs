// Advisory preflight: reachability check and title/id probe
//
// Both run before the first download invocation of a URL. The reachability
// check blocks only on definite local failures (unresolvable host, hard
// HTTP error); anything ambiguous passes, because many platforms block
// ranged probes and the extractor deserves the final word. The media probe
// is purely informational.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::downloader::config::ExtractionConfig;
use crate::downloader::errors::DownloadError;
use crate::downloader::utils::run_output_with_timeout;

const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT_SECS: u64 = 20;

/// Lightweight summary of a media item, shown before downloading starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: String,
    pub title: String,
    pub uploader: Option<String>,
    pub duration_seconds: Option<u64>,
}

impl MediaSummary {
    /// "3:07"-style duration for display.
    pub fn duration_display(&self) -> Option<String> {
        self.duration_seconds
            .map(|secs| format!("{}:{:02}", secs / 60, secs % 60))
    }
}

/// Conservative ranged GET against the URL itself.
pub async fn reachability_check(url: &Url) -> Result<(), DownloadError> {
    let client = reqwest::Client::builder()
        .timeout(REACHABILITY_TIMEOUT)
        .user_agent("Mozilla/5.0")
        .build()
        .map_err(|e| DownloadError::ExecutionError(e.to_string()))?;

    let result = client
        .get(url.as_str())
        .header(reqwest::header::RANGE, "bytes=0-0")
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().as_u16() < 400 => Ok(()),
        Ok(resp) => Err(DownloadError::Unknown(format!(
            "URL responded with HTTP {}",
            resp.status().as_u16()
        ))),
        // DNS, refused connections and TLS failures are definite
        Err(e) if e.is_connect() => {
            Err(DownloadError::Network(format!("Host is not reachable: {e}")))
        }
        // Stalled or otherwise blocked probes are not a verdict
        Err(e) => {
            debug!("reachability probe inconclusive: {e}");
            Ok(())
        }
    }
}

/// Fetch a title/id summary via the extractor's JSON dump. Advisory only:
/// the caller reports failures as warnings and downloads anyway.
pub async fn probe_media(
    ytdlp: &Path,
    url: &str,
    config: &ExtractionConfig,
) -> Result<MediaSummary, DownloadError> {
    let mut args: Vec<String> = vec![
        "--dump-json".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--socket-timeout".to_string(),
        "15".to_string(),
        "--retries".to_string(),
        "2".to_string(),
    ];
    args.extend(config.extractor_args());
    args.extend(config.cookie_args());
    args.push(url.to_string());

    let output = run_output_with_timeout(ytdlp, &args, PROBE_TIMEOUT_SECS).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(DownloadError::from(stderr));
    }

    parse_summary(&output.stdout)
}

fn parse_summary(stdout: &[u8]) -> Result<MediaSummary, DownloadError> {
    let json_str = String::from_utf8_lossy(stdout);
    let json: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON from extractor: {e}")))?;

    Ok(MediaSummary {
        id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        uploader: json["uploader"].as_str().map(|s| s.to_string()),
        duration_seconds: json["duration"].as_f64().map(|d| d as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_full() {
        let json = br#"{"id":"123","title":"Title","uploader":"Someone","duration":187.0}"#;
        let summary = parse_summary(json).unwrap();
        assert_eq!(summary.id, "123");
        assert_eq!(summary.title, "Title");
        assert_eq!(summary.uploader.as_deref(), Some("Someone"));
        assert_eq!(summary.duration_display().as_deref(), Some("3:07"));
    }

    #[test]
    fn test_parse_summary_minimal() {
        let summary = parse_summary(br#"{"id":"x"}"#).unwrap();
        assert_eq!(summary.title, "Unknown");
        assert!(summary.duration_display().is_none());
    }

    #[test]
    fn test_parse_summary_rejects_garbage() {
        let err = parse_summary(b"not json").unwrap_err();
        assert!(matches!(err, DownloadError::ParseError(_)));
    }
}
