// Shared extraction configuration for a run
//
// Process-wide state (environment token, conventional cookie file, detected
// toolchain) is read once when the configuration is built and threaded
// through explicitly, so every per-format invocation of a run sees the same
// values.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::downloader::errors::DownloadError;
use crate::downloader::formats::FormatKind;
use crate::downloader::tools::Toolchain;

/// Where the extractor should read cookies from. File and browser store are
/// mutually exclusive; an existing file always wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CookieSource {
    /// Explicit Netscape-format cookie file
    File(PathBuf),
    /// Browser profile cookie store, read directly by the extractor
    Browser(&'static str),
}

/// Challenge-solver runtime detected on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsSolver {
    pub node_path: PathBuf,
}

/// Options shared by every per-format invocation of a run.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub out_dir: PathBuf,
    pub cookie_source: CookieSource,
    pub js_solver: Option<JsSolver>,
    pub po_token: Option<String>,
}

impl ExtractionConfig {
    /// Player clients passed to the extractor, in order. The platform's
    /// default `web` client is deliberately absent: it is SABR-prone,
    /// frequently broken and throttled.
    pub const PLAYER_CLIENTS: &'static [&'static str] = &["tv", "mweb", "tv_embedded"];

    /// Browser whose cookie store is read when no cookie file is found.
    pub const COOKIE_BROWSER: &'static str = "firefox";

    /// Optional PO token unlocking some restricted mweb formats.
    pub const PO_TOKEN_VAR: &'static str = "YTDLP_PO_TOKEN";

    pub fn build(
        out_dir: PathBuf,
        explicit_cookie_file: Option<&Path>,
        toolchain: &Toolchain,
    ) -> Self {
        let cookie_source =
            resolve_cookie_source(explicit_cookie_file, &conventional_cookie_file());
        debug!(?cookie_source, "cookie source resolved");

        let js_solver = toolchain
            .node
            .path
            .clone()
            .map(|node_path| JsSolver { node_path });
        if js_solver.is_none() {
            debug!("no node runtime; JS challenge solving disabled");
        }

        let po_token = std::env::var(Self::PO_TOKEN_VAR)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if po_token.is_none() {
            debug!(
                "{} not set; PO-token-gated format variants stay unavailable",
                Self::PO_TOKEN_VAR
            );
        }

        Self {
            out_dir,
            cookie_source,
            js_solver,
            po_token,
        }
    }

    /// `--cookies` / `--cookies-from-browser` flags for this run.
    pub fn cookie_args(&self) -> Vec<String> {
        match &self.cookie_source {
            CookieSource::File(path) => {
                vec!["--cookies".to_string(), path.display().to_string()]
            }
            CookieSource::Browser(name) => {
                vec!["--cookies-from-browser".to_string(), (*name).to_string()]
            }
        }
    }

    /// Combined `--extractor-args` value: the client-variant list, plus the
    /// PO token when one came from the environment.
    pub fn extractor_args(&self) -> Vec<String> {
        let mut value = format!(
            "youtube:player_client={}",
            Self::PLAYER_CLIENTS.join(",")
        );
        if let Some(token) = &self.po_token {
            value.push_str(&format!(";po_token={token}"));
        }
        vec!["--extractor-args".to_string(), value]
    }

    /// Challenge-solver flags, present only when a node runtime was found.
    /// Without them affected downloads fail with a classified error instead
    /// of hanging on an unsolvable challenge.
    pub fn solver_args(&self) -> Vec<String> {
        match &self.js_solver {
            Some(solver) => vec![
                "--remote-components".to_string(),
                "ejs:github".to_string(),
                "--js-runtimes".to_string(),
                format!("node@{}", solver.node_path.display()),
            ],
            None => Vec::new(),
        }
    }
}

/// Pick the cookie source: explicit file if it exists, else the
/// conventional `cookies.txt`, else the browser store.
pub(crate) fn resolve_cookie_source(
    explicit: Option<&Path>,
    conventional: &Path,
) -> CookieSource {
    if let Some(path) = explicit {
        if path.exists() {
            return CookieSource::File(path.to_path_buf());
        }
        warn!(
            "cookie file {} does not exist; falling back to auto-detection",
            path.display()
        );
    }

    if conventional.exists() {
        return CookieSource::File(conventional.to_path_buf());
    }

    CookieSource::Browser(ExtractionConfig::COOKIE_BROWSER)
}

/// `cookies.txt` next to the executable, with a current-directory fallback.
fn conventional_cookie_file() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join("cookies.txt")));

    match beside_exe {
        Some(path) if path.exists() => path,
        _ => PathBuf::from("cookies.txt"),
    }
}

/// Resolve the output directory under the platform downloads directory.
/// Empty input keeps the downloads directory itself; relative subfolders
/// (including nested ones) are created; absolute paths are rejected.
pub fn resolve_output_dir(subfolder: &str) -> Result<PathBuf, DownloadError> {
    let base = dirs::download_dir().unwrap_or_else(|| PathBuf::from("."));
    resolve_output_dir_in(&base, subfolder)
}

pub(crate) fn resolve_output_dir_in(
    base: &Path,
    subfolder: &str,
) -> Result<PathBuf, DownloadError> {
    let trimmed = subfolder.trim();

    let out_dir = if trimmed.is_empty() {
        base.to_path_buf()
    } else {
        let sub = Path::new(trimmed);
        if sub.is_absolute() {
            return Err(DownloadError::InvalidInput(
                "Absolute paths are not allowed. Use subfolders only.".to_string(),
            ));
        }
        base.join(sub)
    };

    std::fs::create_dir_all(&out_dir).map_err(|e| {
        DownloadError::Io(format!(
            "Could not create {}: {e}",
            out_dir.display()
        ))
    })?;

    Ok(out_dir)
}

/// Longest title kept in a filename. The ` [id]` suffix is appended after
/// truncation so it always survives intact.
pub const MAX_TITLE_LEN: usize = 200;

/// Strip characters unsafe for the host filesystem, collapse whitespace and
/// trim to `MAX_TITLE_LEN`. Idempotent.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .chars()
        .take(MAX_TITLE_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Predicted final filename for one item, mirroring the output template the
/// extractor is given.
pub fn planned_filename(title: &str, id: &str, kind: FormatKind) -> String {
    format!("{} [{}].{}", sanitize_title(title), id, kind.ext())
}
