// External tool discovery: yt-dlp, ffmpeg, node

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::downloader::errors::DownloadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolType {
    /// The extraction/download engine everything is delegated to
    YtDlp,
    /// Transcoder/muxer invoked by yt-dlp for merge and extract steps
    Ffmpeg,
    /// JS runtime for platform challenge solving (EJS)
    Node,
}

impl ToolType {
    pub fn binary_name(self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::Ffmpeg => "ffmpeg",
            Self::Node => "node",
        }
    }

    fn version_arg(self) -> &'static str {
        match self {
            Self::YtDlp => "--version",
            Self::Ffmpeg => "-version", // ffmpeg uses a single dash
            Self::Node => "--version",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub tool: ToolType,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl ToolInfo {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

/// Locate a tool: conventional install locations first, then PATH.
pub fn detect(tool: ToolType) -> ToolInfo {
    let name = tool.binary_name();

    let common_paths = [
        format!("/opt/homebrew/bin/{name}"), // Homebrew on Apple Silicon
        format!("/usr/local/bin/{name}"),    // Homebrew on Intel Mac
        format!("/usr/bin/{name}"),          // System installation
    ];

    for path in common_paths {
        if Path::new(&path).exists() {
            let version = version_of(&path, tool);
            debug!(tool = name, %path, "found at conventional location");
            return ToolInfo {
                tool,
                path: Some(PathBuf::from(path)),
                version,
            };
        }
    }

    if let Ok(output) = Command::new("which").arg(name).output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                let version = version_of(&path, tool);
                debug!(tool = name, %path, "found via PATH");
                return ToolInfo {
                    tool,
                    path: Some(PathBuf::from(path)),
                    version,
                };
            }
        }
    }

    debug!(tool = name, "not found");
    ToolInfo {
        tool,
        path: None,
        version: None,
    }
}

fn version_of(path: &str, tool: ToolType) -> Option<String> {
    match Command::new(path).arg(tool.version_arg()).output() {
        Ok(output) if output.status.success() => {
            let out = String::from_utf8_lossy(&output.stdout);
            // ffmpeg prints a banner; the first line is enough everywhere
            out.lines().next().map(|l| l.trim().to_string())
        }
        _ => None,
    }
}

/// The set of external binaries a run depends on, detected once at startup
/// and threaded through explicitly.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub ytdlp: ToolInfo,
    pub ffmpeg: ToolInfo,
    pub node: ToolInfo,
}

impl Toolchain {
    pub fn ytdlp_path(&self) -> &Path {
        // preflight() guarantees presence
        self.ytdlp.path.as_deref().unwrap_or_else(|| Path::new("yt-dlp"))
    }
}

/// Detect the toolchain. yt-dlp is required; ffmpeg and node only degrade
/// capabilities when missing, which the caller reports.
pub fn preflight() -> Result<Toolchain, DownloadError> {
    let ytdlp = detect(ToolType::YtDlp);
    if !ytdlp.is_available() {
        return Err(DownloadError::ToolNotFound(
            "yt-dlp is not installed. Install it with `brew install yt-dlp` \
             or `pip install -U yt-dlp` and try again."
                .to_string(),
        ));
    }

    Ok(Toolchain {
        ytdlp,
        ffmpeg: detect(ToolType::Ffmpeg),
        node: detect(ToolType::Node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_names() {
        assert_eq!(ToolType::YtDlp.binary_name(), "yt-dlp");
        assert_eq!(ToolType::Ffmpeg.binary_name(), "ffmpeg");
        assert_eq!(ToolType::Node.binary_name(), "node");
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let info = ToolInfo {
            tool: ToolType::Node,
            path: None,
            version: None,
        };
        assert!(!info.is_available());
    }
}
