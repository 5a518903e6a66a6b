// Failure diagnostics - classifies extractor errors
//
// Analyzes the error text surfaced by the external extractor to determine:
// - Why a per-format invocation failed (restriction, network, format, ...)
// - An actionable hint for the user
// - Whether the condition is permanent

use serde::{Deserialize, Serialize};

/// Why a per-format invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// High-restriction format variant gated behind a PO token
    RestrictedFormat,

    /// A JS challenge had to be solved but no runtime was available
    ChallengeSolverMissing,

    /// The requested format/container combination does not exist for this source
    FormatUnavailable,

    /// Age-restricted content requiring login cookies
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// Private item requiring authorization
    Private,

    /// Deleted, removed or otherwise gone
    Unavailable,

    /// DRM-protected content; permanent, not an error in this system
    DrmProtected,

    /// Channel-membership gated content
    MembersOnly,

    /// Rate limiting (429 and friends)
    RateLimited,

    /// Bot/automation detection triggered
    BotDetection,

    /// Access denied (HTTP 403)
    Forbidden,

    /// Timeout / DNS / connect / TLS trouble
    NetworkTrouble,

    /// Nothing recognizable in the error text
    Unknown,
}

impl FailureReason {
    /// Permanent conditions get no retry-flavored hints.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DrmProtected | Self::Unavailable | Self::Private)
    }

    /// One-line description used in the per-format summary.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RestrictedFormat => "Restricted format (PO token required)",
            Self::ChallengeSolverMissing => "JS challenge could not be solved",
            Self::FormatUnavailable => "Requested format is not available for this source",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Blocked in your region",
            Self::Private => "Private item",
            Self::Unavailable => "Item unavailable (removed or deleted)",
            Self::DrmProtected => "DRM-protected content",
            Self::MembersOnly => "Members-only content",
            Self::RateLimited => "Rate limited by the platform",
            Self::BotDetection => "Automated-access detection triggered",
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTrouble => "Network trouble (timeout/DNS/TLS)",
            Self::Unknown => "Download failed",
        }
    }

    /// Actionable follow-up, when one exists.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RestrictedFormat => Some(
                "Set YTDLP_PO_TOKEN to unlock this variant, or pick a different format.",
            ),
            Self::ChallengeSolverMissing => {
                Some("Install node so the JS challenge solver can run.")
            }
            Self::FormatUnavailable => {
                Some("Try another export format; the source may not carry this container.")
            }
            Self::AgeRestricted => {
                Some("Provide cookies from a logged-in browser profile (18+ account).")
            }
            Self::GeoBlocked => Some("A proxy or VPN in an allowed region may help."),
            Self::MembersOnly => {
                Some("Use cookies from a browser where the membership is active.")
            }
            Self::RateLimited => Some("Wait a few minutes and try again."),
            Self::BotDetection => Some("Use cookies from a logged-in browser profile."),
            Self::Forbidden => {
                Some("Refresh cookies (re-login) or wait; the platform may be throttling.")
            }
            Self::NetworkTrouble => Some("Check the connection and try again."),
            Self::DrmProtected | Self::Private | Self::Unavailable | Self::Unknown => None,
        }
    }
}

/// Classify extractor error text. Always returns a reason; `Unknown` is the
/// fallthrough for anything unrecognized.
pub fn diagnose(error: &str) -> FailureReason {
    let lower = error.to_lowercase();

    // Most specific patterns first.

    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("playready")
        || lower.contains("fairplay")
        || lower.contains("encrypted media")
        || lower.contains("requires payment")
        || lower.contains("requires purchase")
    {
        return FailureReason::DrmProtected;
    }

    if lower.contains("members only")
        || lower.contains("members-only")
        || lower.contains("join this channel")
        || lower.contains("membership required")
    {
        return FailureReason::MembersOnly;
    }

    if lower.contains("po token")
        || lower.contains("gvs po token")
        || lower.contains("proof of origin")
    {
        return FailureReason::RestrictedFormat;
    }

    if lower.contains("js runtime")
        || lower.contains("ejs")
        || lower.contains("nsig extraction failed")
        || lower.contains("challenge solver")
    {
        return FailureReason::ChallengeSolverMissing;
    }

    if lower.contains("requested format is not available") {
        return FailureReason::FormatUnavailable;
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return FailureReason::AgeRestricted;
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return FailureReason::Private;
    }

    if lower.contains("video unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
        || lower.contains("does not exist")
        || lower.contains("http error 404")
    {
        return FailureReason::Unavailable;
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geographic restriction")
    {
        return FailureReason::GeoBlocked;
    }

    if lower.contains("429")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
    {
        return FailureReason::RateLimited;
    }

    if lower.contains("captcha")
        || lower.contains("unusual traffic")
        || lower.contains("confirm you're not a bot")
        || lower.contains("automated")
    {
        return FailureReason::BotDetection;
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return FailureReason::Forbidden;
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("handshake")
        || lower.contains("certificate verify failed")
        || lower.contains("name or service not known")
        || lower.contains("temporary failure in name resolution")
    {
        return FailureReason::NetworkTrouble;
    }

    FailureReason::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_403_detection() {
        assert_eq!(
            diagnose("ERROR: HTTP Error 403: Forbidden"),
            FailureReason::Forbidden
        );
    }

    #[test]
    fn test_po_token_is_restricted_format() {
        assert_eq!(
            diagnose("mweb client https formats require a GVS PO Token"),
            FailureReason::RestrictedFormat
        );
    }

    #[test]
    fn test_restricted_format_is_distinguishable_from_generic() {
        let restricted = diagnose("formats require a PO Token");
        let generic = diagnose("something completely different broke");
        assert_eq!(restricted, FailureReason::RestrictedFormat);
        assert_eq!(generic, FailureReason::Unknown);
        assert_ne!(restricted, generic);
    }

    #[test]
    fn test_challenge_solver_detection() {
        assert_eq!(
            diagnose("ERROR: No suitable JS runtime found for challenge"),
            FailureReason::ChallengeSolverMissing
        );
    }

    #[test]
    fn test_format_unavailable_detection() {
        assert_eq!(
            diagnose("ERROR: Requested format is not available"),
            FailureReason::FormatUnavailable
        );
    }

    #[test]
    fn test_age_restricted_detection() {
        assert_eq!(
            diagnose("Sign in to confirm your age"),
            FailureReason::AgeRestricted
        );
    }

    #[test]
    fn test_geo_detection() {
        assert_eq!(
            diagnose("This video is not available in your country"),
            FailureReason::GeoBlocked
        );
    }

    #[test]
    fn test_timeout_detection() {
        assert_eq!(diagnose("Timed out after 30s"), FailureReason::NetworkTrouble);
    }

    #[test]
    fn test_removed_item_detection() {
        assert_eq!(
            diagnose("This video has been removed by the uploader"),
            FailureReason::Unavailable
        );
    }

    #[test]
    fn test_drm_detection() {
        assert_eq!(
            diagnose("Widevine encrypted content cannot be downloaded"),
            FailureReason::DrmProtected
        );
    }

    #[test]
    fn test_members_only_detection() {
        assert_eq!(
            diagnose("This video is available to members only"),
            FailureReason::MembersOnly
        );
    }

    #[test]
    fn test_permanent_reasons() {
        assert!(FailureReason::DrmProtected.is_permanent());
        assert!(FailureReason::Unavailable.is_permanent());
        assert!(!FailureReason::Forbidden.is_permanent());
    }

    #[test]
    fn test_permanent_reasons_have_no_retry_hint() {
        assert!(FailureReason::DrmProtected.hint().is_none());
        assert!(FailureReason::Unavailable.hint().is_none());
    }

    #[test]
    fn test_unknown_fallthrough() {
        assert_eq!(diagnose("weird new failure mode"), FailureReason::Unknown);
    }
}
