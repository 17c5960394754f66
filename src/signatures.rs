//! Signature Store
//!
//! Static domain blocklist, suspicious-pattern list and legitimate-domain
//! whitelists. Read-only after load; every lookup is a pure function and
//! empty input never matches.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::error::GuardError;

/// Known ad, scam and mining network fragments (case-sensitive substrings).
pub const AD_DOMAINS: &[&str] = &[
    // General ad networks
    "googleads.g.doubleclick.net", "googlesyndication.com", "amazon-adsystem.com",
    "facebook.com/tr", "outbrain.com", "taboola.com", "adsystem.amazon.com",
    "ads.yahoo.com", "bing.com/ads", "adnxs.com", "bidswitch.net",
    "casalemedia.com", "contextweb.com", "doubleclick.net", "rubiconproject.com",
    "scorecardresearch.com", "turn.com", "adsystem.amazon.co.uk",
    // Adult ad networks
    "exoclick.com", "juicyads.com", "trafficjunky.net", "plugrush.com",
    "exosrv.com", "tsyndicate.com", "streamate.com", "cams.com",
    "chaturbate.com/affiliates", "livejasmin.com/landing", "stripchat.com/promo",
    "bongacams.com/promo", "cam4.com/ads", "flirt4free.com/go",
    "adsterra.com", "hilltopads.net", "propellerads.com", "popcash.net",
    "popads.net", "popunder.net", "adcash.com", "clickadu.com",
    "mgid.com", "revcontent.com", "contentad.net", "nativeads.com",
    // Malicious networks
    "malware-traffic.com", "phishing-ads.net", "fake-download.com",
    "virus-ads.com", "scam-popups.net", "dating-scam.com",
    "fake-virus-alert.com", "browser-hijack.net", "crypto-mining.ads",
    // Mining
    "coinhive.com", "coin-hive.com", "cryptoloot.pro", "jsecoin.com",
    "mineralt.io", "authedmine.com", "cryptonoter.com",
    // Fake software
    "softonic.com/go", "download.com/redir", "cnet-fake.com",
    "fake-adobe.com", "fake-chrome.net", "malware-download.org",
    // Dating scams
    "meet-singles.fake", "adult-dating.scam", "hookup-tonight.fake",
    "local-singles.scam", "adult-finder.fake",
];

/// Suspicious url/content patterns, matched case-insensitively in this order.
pub const SUSPICIOUS_PATTERNS: &[&str] = &[
    // Pop-up vocabulary
    "popup", "popunder", "advertisement", "promo", "offer",
    "overlay", "interstitial", "banner",
    r"//ads?\d*\.",
    // Adult
    "casino", "dating", "cam.*show", "live.*cam", "adult.*chat",
    "xxx.*free", "porn.*free", "sex.*dating", "hookup.*tonight",
    // Scam / malware
    "win.*prize", "congratulations", "you.*winner", "claim.*reward",
    "virus.*detected", "system.*infected", "security.*alert",
    "update.*required", "flash.*player", "java.*update",
    "your.*computer.*at.*risk", "click.*here.*to.*fix",
    // Phishing
    "verify.*account", "suspended.*account", "unusual.*activity",
    "confirm.*identity", "update.*payment", "expired.*card",
    // Fake downloads
    "download.*now", "install.*free", "speed.*up.*pc",
    "clean.*registry", "remove.*virus", "boost.*performance",
    // Crypto scams
    "free.*bitcoin", "crypto.*mining", "invest.*cryptocurrency",
    "double.*bitcoin", "guaranteed.*profit",
    // General
    "limited.*time", "act.*now", "urgent", "expires.*today",
    "streaming.*ads", "free.*movie", "survey", "redirect",
    "landing", "affiliate", "tracker", "referral",
];

/// Domains never treated as suspicious by the url predicate.
pub const LEGITIMATE_DOMAINS: &[&str] = &[
    "google.com", "youtube.com", "github.com", "stackoverflow.com",
    "wikipedia.org", "mozilla.org", "apple.com", "microsoft.com",
    "netflix.com", "amazon.com", "paypal.com", "ebay.com",
    "reddit.com", "twitter.com", "facebook.com", "instagram.com",
    "linkedin.com", "dropbox.com", "spotify.com", "steam.com",
];

/// Domains whose new windows are allowed outright unless they look ad-served.
pub const MAJOR_LEGITIMATE_DOMAINS: &[&str] = &[
    "google.com", "youtube.com", "github.com",
    "stackoverflow.com", "mozilla.org", "microsoft.com",
];

/// Fragments that revoke the major-domain allowance.
pub const AD_NETWORK_MARKERS: &[&str] = &["ads", "doubleclick"];

static BUILTIN: Lazy<Arc<SignatureStore>> = Lazy::new(|| {
    Arc::new(SignatureStore::new(
        AD_DOMAINS,
        SUSPICIOUS_PATTERNS,
        LEGITIMATE_DOMAINS,
    ))
});

/// Compile a pattern table, skipping (and logging) entries that fail.
pub(crate) fn compile_patterns(patterns: &[&str], case_insensitive: bool) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match compile_pattern(pattern, case_insensitive) {
            Ok(regex) => Some(regex),
            Err(err) => {
                log::warn!("Skipping signature: {}", err);
                None
            }
        })
        .collect()
}

pub(crate) fn compile_pattern(
    pattern: &str,
    case_insensitive: bool,
) -> std::result::Result<Regex, GuardError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| GuardError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn owned_fragments(fragments: &[&str]) -> Vec<String> {
    fragments
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
        .collect()
}

/// Read-only signature tables.
#[derive(Debug, Clone)]
pub struct SignatureStore {
    ad_domains: Vec<String>,
    patterns: Vec<Regex>,
    legitimate_domains: Vec<String>,
}

impl SignatureStore {
    /// Build a store from raw tables. Patterns that fail to compile and empty
    /// domain fragments are dropped.
    pub fn new(ad_domains: &[&str], patterns: &[&str], legitimate_domains: &[&str]) -> Self {
        Self {
            ad_domains: owned_fragments(ad_domains),
            patterns: compile_patterns(patterns, true),
            legitimate_domains: owned_fragments(legitimate_domains),
        }
    }

    /// The built-in tables, compiled once per process.
    pub fn builtin() -> Arc<SignatureStore> {
        BUILTIN.clone()
    }

    pub fn is_known_ad_domain(&self, url: &str) -> bool {
        !url.is_empty() && self.ad_domains.iter().any(|d| url.contains(d.as_str()))
    }

    pub fn matches_suspicious_pattern(&self, text: &str) -> bool {
        self.first_pattern_match(text).is_some()
    }

    /// Index of the first pattern (in table order) that matches `text`.
    pub fn first_pattern_match(&self, text: &str) -> Option<usize> {
        if text.is_empty() {
            return None;
        }
        self.patterns.iter().position(|p| p.is_match(text))
    }

    pub fn is_legitimate_domain(&self, url: &str) -> bool {
        !url.is_empty()
            && self
                .legitimate_domains
                .iter()
                .any(|d| url.contains(d.as_str()))
    }

    /// Major legitimate domains, unless the url also carries ad-network markers.
    pub fn is_major_legitimate(&self, url: &str) -> bool {
        !url.is_empty()
            && MAJOR_LEGITIMATE_DOMAINS.iter().any(|d| url.contains(d))
            && !AD_NETWORK_MARKERS.iter().any(|m| url.contains(m))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn ad_domain_count(&self) -> usize {
        self.ad_domains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_compile() {
        let store = SignatureStore::builtin();
        assert_eq!(store.pattern_count(), SUSPICIOUS_PATTERNS.len());
        assert_eq!(store.ad_domain_count(), AD_DOMAINS.len());
    }

    #[test]
    fn test_ad_domain_substring_is_case_sensitive() {
        let store = SignatureStore::builtin();
        assert!(store.is_known_ad_domain("https://cdn.taboola.com/feed.js"));
        assert!(!store.is_known_ad_domain("https://cdn.TABOOLA.com/feed.js"));
        assert!(!store.is_known_ad_domain(""));
    }

    #[test]
    fn test_patterns_ignore_case() {
        let store = SignatureStore::builtin();
        assert!(store.matches_suspicious_pattern("CONGRATULATIONS, you are our WINNER"));
        assert!(store.matches_suspicious_pattern("Your Computer Is At Risk"));
        assert!(!store.matches_suspicious_pattern("quarterly report"));
        assert!(!store.matches_suspicious_pattern(""));
    }

    #[test]
    fn test_first_pattern_match_follows_table_order() {
        let store = SignatureStore::new(&[], &["alpha", "beta"], &[]);
        assert_eq!(store.first_pattern_match("beta alpha"), Some(0));
        assert_eq!(store.first_pattern_match("beta"), Some(1));
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let store = SignatureStore::new(&["", "ads.example"], &["(unclosed", "ok"], &[]);
        assert_eq!(store.pattern_count(), 1);
        assert_eq!(store.ad_domain_count(), 1);
        assert!(!store.is_known_ad_domain("https://clean.example"));
    }

    #[test]
    fn test_major_legitimate_revoked_by_ad_markers() {
        let store = SignatureStore::builtin();
        assert!(store.is_major_legitimate("https://accounts.google.com"));
        assert!(!store.is_major_legitimate("https://ads.google.com/x"));
        assert!(!store.is_major_legitimate("https://google.com.doubleclick.net/"));
        assert!(!store.is_major_legitimate("https://example.org"));
    }

    #[test]
    fn test_legitimate_domains() {
        let store = SignatureStore::builtin();
        assert!(store.is_legitimate_domain("https://en.wikipedia.org/wiki/Rust"));
        assert!(!store.is_legitimate_domain("https://popads.net/"));
    }
}
