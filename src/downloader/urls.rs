// Pasted-input handling: URL extraction, normalization, cheap validation

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

use crate::downloader::errors::DownloadError;

lazy_static! {
    // http/https runs up to the first whitespace or quote
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s<>"]+"#).unwrap();
}

const TRAILING_JUNK: &[char] = &[' ', '\t', '\r', '\n', '.', '!', ',', ')', ';', ']', '>', '\'', '"'];

/// Make pasted URLs robust: salvage the first http(s) URL when junk
/// surrounds it, cut at a second URL glued on without whitespace, and strip
/// trailing copy/paste punctuation.
pub fn normalize_url(raw: &str) -> String {
    let mut s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    let first = [s.find("https://"), s.find("http://")]
        .into_iter()
        .flatten()
        .min();
    if let Some(i) = first {
        s = &s[i..];
    }

    let second = [
        s[1..].find("https://").map(|i| i + 1),
        s[1..].find("http://").map(|i| i + 1),
    ]
    .into_iter()
    .flatten()
    .min();
    if let Some(i) = second {
        s = &s[..i];
    }

    s.trim_end_matches(TRAILING_JUNK).to_string()
}

/// Pull every http(s) URL out of arbitrary pasted text.
/// `#`-comment lines are skipped; duplicates are dropped in order.
pub fn extract_urls(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let blob = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();

    for found in URL_RE.find_iter(&blob) {
        let normalized = normalize_url(found.as_str());
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }

    out
}

/// Local sanity check before any network or extractor work: scheme must be
/// http(s), host must be present, and near-miss YouTube hosts get a typo
/// hint instead of a cryptic extractor failure later.
pub fn validate_url(raw: &str) -> Result<Url, DownloadError> {
    let parsed = Url::parse(raw)
        .map_err(|e| DownloadError::InvalidUrl(format!("URL parse failed: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(DownloadError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ))
        }
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| DownloadError::InvalidUrl("URL is missing a host".to_string()))?;

    if let Some(hint) = youtube_typo_hint(host) {
        return Err(DownloadError::InvalidUrl(hint));
    }

    Ok(parsed)
}

fn youtube_typo_hint(host: &str) -> Option<String> {
    let h = host.to_ascii_lowercase();

    const REAL: [&str; 4] = ["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];
    if REAL.contains(&h.as_str()) {
        return None;
    }

    if h.contains("yout") && !h.contains("youtube") {
        return Some(format!(
            "Host looks like a typo. Did you mean 'youtube.com' or 'youtu.be'? (got '{host}')"
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_url() {
        assert_eq!(
            normalize_url("https://example.com/v/1"),
            "https://example.com/v/1"
        );
    }

    #[test]
    fn test_normalize_salvages_leading_junk() {
        assert_eq!(
            normalize_url("watch this https://example.com/v/1"),
            "https://example.com/v/1"
        );
    }

    #[test]
    fn test_normalize_cuts_glued_second_url() {
        assert_eq!(
            normalize_url("https://a.com/xhttps://b.com/y"),
            "https://a.com/x"
        );
    }

    #[test]
    fn test_normalize_strips_trailing_punctuation() {
        assert_eq!(
            normalize_url("https://example.com/v/1)."),
            "https://example.com/v/1"
        );
    }

    #[test]
    fn test_extract_multiple_urls_in_order() {
        let text = "see https://a.com/1 and https://b.com/2";
        assert_eq!(extract_urls(text), vec!["https://a.com/1", "https://b.com/2"]);
    }

    #[test]
    fn test_extract_skips_comment_lines() {
        let text = "# https://skipped.com/x\nhttps://kept.com/y";
        assert_eq!(extract_urls(text), vec!["https://kept.com/y"]);
    }

    #[test]
    fn test_extract_dedups_preserving_order() {
        let text = "https://a.com/1\nhttps://b.com/2\nhttps://a.com/1";
        assert_eq!(extract_urls(text), vec!["https://a.com/1", "https://b.com/2"]);
    }

    #[test]
    fn test_extract_from_plain_text_is_empty() {
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        assert!(validate_url("ftp://example.com/f").is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_validate_accepts_https() {
        let url = validate_url("https://example.com/v/123").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_youtube_typo_hint_fires() {
        let err = validate_url("https://youtbe.com/watch?v=x").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("youtube.com"), "unexpected message: {msg}");
    }

    #[test]
    fn test_real_youtube_hosts_pass() {
        for host in ["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"] {
            assert!(validate_url(&format!("https://{host}/watch?v=x")).is_ok());
        }
    }
}
