// Export format menu and selection parsing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Export target picked from the interactive menu.
///
/// Each kind carries a fixed post-processing recipe: the video kinds merge
/// best video + best audio into their container, `Mp3` extracts the best
/// audio stream and transcodes it. Ordering follows the numeric selector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FormatKind {
    Mp4,
    Mkv,
    Mov,
    Mp3,
}

impl FormatKind {
    /// Menu order, ascending by selector.
    pub const ALL: [FormatKind; 4] = [Self::Mp4, Self::Mkv, Self::Mov, Self::Mp3];

    /// Numeric selector the user types at the prompt.
    pub fn selector(self) -> u8 {
        match self {
            Self::Mp4 => 1,
            Self::Mkv => 2,
            Self::Mov => 3,
            Self::Mp3 => 4,
        }
    }

    pub fn from_selector(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.selector() == n)
    }

    /// File extension of the final export.
    pub fn ext(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Mov => "mov",
            Self::Mp3 => "mp3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mp4 => "Video MP4",
            Self::Mkv => "Video MKV",
            Self::Mov => "Video MOV",
            Self::Mp3 => "Audio MP3 (audio-only)",
        }
    }

    /// Audio-only kinds skip container merging and run the audio extractor.
    pub fn is_audio_only(self) -> bool {
        matches!(self, Self::Mp3)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ext())
    }
}

/// Outcome of parsing a raw selection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Deduplicated, sorted ascending by selector. Never empty.
    pub formats: Vec<FormatKind>,
    /// Tokens that did not resolve to a menu entry.
    pub rejected: Vec<String>,
}

/// Parse a free-form selection string ("1 4", "1,4") into format kinds.
///
/// Tokens split on whitespace and commas. A token counts only if it parses
/// cleanly as a known selector; anything else ("1x", "9", "mp4") lands in
/// `rejected` so the caller can warn. Empty or fully-invalid input falls
/// back to MP4.
pub fn parse_selection(raw: &str) -> Selection {
    let mut formats: Vec<FormatKind> = Vec::new();
    let mut rejected: Vec<String> = Vec::new();

    for token in raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        match token.parse::<u8>().ok().and_then(FormatKind::from_selector) {
            Some(kind) => {
                if !formats.contains(&kind) {
                    formats.push(kind);
                }
            }
            None => rejected.push(token.to_string()),
        }
    }

    // Stable processing order regardless of how the user typed them
    formats.sort();

    if formats.is_empty() {
        formats.push(FormatKind::Mp4);
    }

    Selection { formats, rejected }
}

/// Numbered menu shown above the selection prompt.
pub fn render_menu() -> String {
    let mut out = String::from("Export formats:\n");
    for kind in FormatKind::ALL {
        let default_tag = if kind == FormatKind::Mp4 { " (default)" } else { "" };
        out.push_str(&format!(
            "  {}) {}{}\n",
            kind.selector(),
            kind.label(),
            default_tag
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_selection() {
        let s = parse_selection("2");
        assert_eq!(s.formats, vec![FormatKind::Mkv]);
        assert!(s.rejected.is_empty());
    }

    #[test]
    fn test_multi_selection_any_order() {
        let s = parse_selection("4 1");
        assert_eq!(s.formats, vec![FormatKind::Mp4, FormatKind::Mp3]);
    }

    #[test]
    fn test_comma_separated() {
        let s = parse_selection("1,4");
        assert_eq!(s.formats, vec![FormatKind::Mp4, FormatKind::Mp3]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let s = parse_selection("3 3 3 1");
        assert_eq!(s.formats, vec![FormatKind::Mp4, FormatKind::Mov]);
    }

    #[test]
    fn test_empty_defaults_to_mp4() {
        let s = parse_selection("");
        assert_eq!(s.formats, vec![FormatKind::Mp4]);
        assert!(s.rejected.is_empty());
    }

    #[test]
    fn test_all_invalid_defaults_to_mp4() {
        let s = parse_selection("x 9 mp3");
        assert_eq!(s.formats, vec![FormatKind::Mp4]);
        assert_eq!(s.rejected, vec!["x", "9", "mp3"]);
    }

    #[test]
    fn test_garbage_suffix_is_rejected() {
        // "1x" is not a selection for 1; it is ignored entirely
        let s = parse_selection("1x 4");
        assert_eq!(s.formats, vec![FormatKind::Mp3]);
        assert_eq!(s.rejected, vec!["1x"]);
    }

    #[test]
    fn test_mixed_valid_invalid() {
        let s = parse_selection("1 foo 4");
        assert_eq!(s.formats, vec![FormatKind::Mp4, FormatKind::Mp3]);
        assert_eq!(s.rejected, vec!["foo"]);
    }

    #[test]
    fn test_full_valid_range() {
        let s = parse_selection("4 2 3 1 2");
        assert_eq!(s.formats, FormatKind::ALL.to_vec());
    }

    #[test]
    fn test_selector_round_trip() {
        for kind in FormatKind::ALL {
            assert_eq!(FormatKind::from_selector(kind.selector()), Some(kind));
        }
        assert_eq!(FormatKind::from_selector(0), None);
        assert_eq!(FormatKind::from_selector(5), None);
    }
}
