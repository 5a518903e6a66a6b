// Per-format invocation of the external extractor
//
// Each selected format gets its own extractor run with its own output file,
// so one format's failure cannot touch another's result. Runs execute
// sequentially and are awaited to completion; the extractor's own retry
// handling is the only retry layer.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::downloader::config::{ExtractionConfig, MAX_TITLE_LEN};
use crate::downloader::diagnostics::{diagnose, FailureReason};
use crate::downloader::errors::DownloadError;
use crate::downloader::formats::FormatKind;
use crate::downloader::models::DownloadOutcome;

/// Output filename template handed to the extractor. The id suffix keeps
/// items unique across playlist entries and across re-runs.
pub const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Build the full argument list for one format's invocation.
///
/// Video kinds merge best video + best audio into the requested container
/// and pin the filename extension to it. Mp3 downloads the best audio
/// stream and lets the audio extractor name the final file; forcing `.mp3`
/// into the template would yield `.mp3.mp3`.
pub fn build_format_args(config: &ExtractionConfig, kind: FormatKind, url: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        // a failed item inside a playlist must not abort the rest
        "--ignore-errors".to_string(),
        "--continue".to_string(),
        "--retries".to_string(),
        "10".to_string(),
        "--fragment-retries".to_string(),
        "10".to_string(),
        "--concurrent-fragments".to_string(),
        "4".to_string(),
        "--newline".to_string(),
        "--restrict-filenames".to_string(),
        "--trim-filenames".to_string(),
        MAX_TITLE_LEN.to_string(),
        "--user-agent".to_string(),
        "Mozilla/5.0".to_string(),
        "-P".to_string(),
        config.out_dir.display().to_string(),
    ];

    args.extend(config.extractor_args());
    args.extend(config.cookie_args());
    args.extend(config.solver_args());

    if kind.is_audio_only() {
        args.push("-f".to_string());
        args.push("bestaudio/best".to_string());
        args.push("-x".to_string());
        args.push("--audio-format".to_string());
        args.push("mp3".to_string());
        args.push("--audio-quality".to_string());
        args.push("0".to_string()); // best VBR
        args.push("-o".to_string());
        args.push(OUTPUT_TEMPLATE.to_string());
    } else {
        args.push("-f".to_string());
        args.push("bv*+ba/b".to_string());
        args.push("--merge-output-format".to_string());
        args.push(kind.ext().to_string());
        args.push("-o".to_string());
        args.push(OUTPUT_TEMPLATE.replace("%(ext)s", kind.ext()));
    }

    args.push(url.to_string());
    args
}

/// Run one format's invocation and record its outcome. Failures are caught
/// here; the caller keeps going with the remaining formats.
pub async fn run_format(
    ytdlp: &Path,
    config: &ExtractionConfig,
    kind: FormatKind,
    url: &str,
) -> DownloadOutcome {
    let args = build_format_args(config, kind, url);
    debug!(export = %kind, "spawning {} {}", ytdlp.display(), args.join(" "));

    match invoke_streaming(ytdlp, &args).await {
        Ok(invocation) if invocation.success => DownloadOutcome::success(kind),
        Ok(invocation) => {
            let reason = diagnose(&invocation.stderr);
            DownloadOutcome::failure(kind, reason, error_excerpt(&invocation.stderr))
        }
        Err(e) => DownloadOutcome::failure(kind, FailureReason::Unknown, e.to_string()),
    }
}

struct Invocation {
    success: bool,
    stderr: String,
}

/// Spawn the extractor, stream its stdout for progress rendering, collect
/// stderr for diagnostics. No timeout: downloads run as long as they need.
async fn invoke_streaming(ytdlp: &Path, args: &[String]) -> Result<Invocation, DownloadError> {
    let mut child = Command::new(ytdlp)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to start yt-dlp: {e}")))?;

    let stdout = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError("Failed to capture extractor stdout".to_string())
    })?;
    let stderr = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError("Failed to capture extractor stderr".to_string())
    })?;

    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut collected: Vec<String> = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            collected.push(line);
        }
        collected.join("\n")
    });

    let mut lines = BufReader::new(stdout).lines();
    let mut progressed = false;
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(status) = parse_progress_line(&line) {
            print!("\r  {status}\u{1b}[K");
            let _ = std::io::stdout().flush();
            progressed = true;
        } else if line.contains("[download]") || line.contains("[Merger]") {
            debug!("{line}");
        }
    }
    if progressed {
        println!();
    }

    let status = child
        .wait()
        .await
        .map_err(|e| DownloadError::ExecutionError(format!("Failed to wait for yt-dlp: {e}")))?;
    let stderr_output = stderr_task.await.unwrap_or_default();

    Ok(Invocation {
        success: status.success(),
        stderr: stderr_output,
    })
}

/// Turn an extractor progress line into a one-line status for the terminal.
///
/// Recognized shapes:
///   [download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)
///   [download] Destination: <file>
///   [Merger] Merging formats into ...
///   [ExtractAudio] Destination: ...
fn parse_progress_line(line: &str) -> Option<String> {
    lazy_static! {
        static ref PROGRESS_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)\s+at\s+(\d+\.?\d*\s*\w+/s)(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
        )
        .unwrap();
        static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"\[Merger\]\s+Merging").unwrap();
        static ref EXTRACT_RE: Regex = Regex::new(r"\[ExtractAudio\]").unwrap();
        static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str()).unwrap_or("?");
        let eta = caps.get(4).map(|m| m.as_str()).unwrap_or("");

        let status = if let (Some(fc), Some(ft)) = (caps.get(5), caps.get(6)) {
            format!(
                "⬇️ {:.1}% of {} @ {} ETA {} (frag {}/{})",
                percent,
                size,
                speed,
                eta,
                fc.as_str(),
                ft.as_str()
            )
        } else if !eta.is_empty() {
            format!("⬇️ {percent:.1}% of {size} @ {speed} ETA {eta}")
        } else {
            format!("⬇️ {percent:.1}% of {size} @ {speed}")
        };
        return Some(status);
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        let short_name: String = filename
            .rsplit('/')
            .next()
            .unwrap_or(filename)
            .chars()
            .take(50)
            .collect();
        return Some(format!("📥 Starting: {short_name}"));
    }

    if MERGE_RE.is_match(line) {
        return Some("🔄 Merging video and audio...".to_string());
    }

    if EXTRACT_RE.is_match(line) {
        return Some("🎵 Extracting audio...".to_string());
    }

    if ALREADY_RE.is_match(line) {
        return Some("✅ File already downloaded".to_string());
    }

    None
}

/// Pull the lines worth echoing back to the user out of extractor stderr.
fn error_excerpt(stderr: &str) -> String {
    let important: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| {
            l.starts_with("ERROR:")
                || l.contains("HTTP Error")
                || l.contains("Forbidden")
                || l.contains("PO Token")
                || l.contains("Requested format is not available")
        })
        .take(3)
        .collect();

    if !important.is_empty() {
        return important.join(" | ");
    }

    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("Unknown error")
        .trim()
        .chars()
        .take(200)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::config::CookieSource;
    use std::path::PathBuf;

    fn test_config() -> ExtractionConfig {
        ExtractionConfig {
            out_dir: PathBuf::from("/tmp/out"),
            cookie_source: CookieSource::Browser(ExtractionConfig::COOKIE_BROWSER),
            js_solver: None,
            po_token: None,
        }
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a.as_str() == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn test_video_args_pin_container_and_extension() {
        let args = build_format_args(&test_config(), FormatKind::Mp4, "https://e.com/v");
        assert_eq!(flag_value(&args, "--merge-output-format"), Some("mp4"));
        assert_eq!(flag_value(&args, "-f"), Some("bv*+ba/b"));
        assert_eq!(flag_value(&args, "-o"), Some("%(title)s [%(id)s].mp4"));
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_audio_args_keep_dynamic_extension() {
        let args = build_format_args(&test_config(), FormatKind::Mp3, "https://e.com/v");
        assert_eq!(flag_value(&args, "-f"), Some("bestaudio/best"));
        assert!(args.contains(&"-x".to_string()));
        assert_eq!(flag_value(&args, "--audio-format"), Some("mp3"));
        // extractor names the final .mp3; template keeps %(ext)s
        assert_eq!(flag_value(&args, "-o"), Some(OUTPUT_TEMPLATE));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_formats_get_distinct_output_names() {
        let mp4 = build_format_args(&test_config(), FormatKind::Mp4, "u");
        let mkv = build_format_args(&test_config(), FormatKind::Mkv, "u");
        assert_ne!(flag_value(&mp4, "-o"), flag_value(&mkv, "-o"));
    }

    #[test]
    fn test_url_is_last_argument() {
        let args = build_format_args(&test_config(), FormatKind::Mov, "https://e.com/v");
        assert_eq!(args.last().map(|s| s.as_str()), Some("https://e.com/v"));
    }

    #[test]
    fn test_browser_cookie_args() {
        let args = build_format_args(&test_config(), FormatKind::Mp4, "u");
        assert_eq!(flag_value(&args, "--cookies-from-browser"), Some("firefox"));
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_file_cookie_args() {
        let mut config = test_config();
        config.cookie_source = CookieSource::File(PathBuf::from("/tmp/cookies.txt"));
        let args = build_format_args(&config, FormatKind::Mp4, "u");
        assert_eq!(flag_value(&args, "--cookies"), Some("/tmp/cookies.txt"));
        assert!(!args.contains(&"--cookies-from-browser".to_string()));
    }

    #[test]
    fn test_solver_flags_absent_without_node() {
        let args = build_format_args(&test_config(), FormatKind::Mp4, "u");
        assert!(!args.contains(&"--remote-components".to_string()));
    }

    #[test]
    fn test_playlist_items_delegated() {
        let args = build_format_args(&test_config(), FormatKind::Mp4, "u");
        assert!(args.contains(&"--ignore-errors".to_string()));
        assert!(!args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn test_parse_progress_download_line() {
        let line = "[download]   6.2% of ~ 343.72MiB at  420.30KiB/s ETA 12:32 (frag 29/454)";
        let status = parse_progress_line(line).unwrap();
        assert!(status.contains("6.2%"));
        assert!(status.contains("frag 29/454"));
    }

    #[test]
    fn test_parse_progress_destination_line() {
        let line = "[download] Destination: /tmp/out/Title [123].mp4";
        let status = parse_progress_line(line).unwrap();
        assert!(status.contains("Starting"));
    }

    #[test]
    fn test_parse_progress_ignores_noise() {
        assert!(parse_progress_line("[youtube] Extracting URL").is_none());
    }

    #[test]
    fn test_error_excerpt_prefers_error_lines() {
        let stderr = "WARNING: something\nERROR: HTTP Error 403: Forbidden\nnoise";
        assert_eq!(error_excerpt(stderr), "ERROR: HTTP Error 403: Forbidden");
    }

    #[test]
    fn test_error_excerpt_falls_back_to_last_line() {
        let stderr = "line one\nline two\n";
        assert_eq!(error_excerpt(stderr), "line two");
    }
}
