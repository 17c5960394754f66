//! Threat Scorer
//!
//! Computes a numeric threat score and categorical risk level for a url and
//! optional textual content. Scoring never fails: an empty url is "no signal"
//! and produces a zero assessment.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::signatures::SignatureStore;

pub const AD_DOMAIN_WEIGHT: u32 = 50;
pub const PATTERN_WEIGHT: u32 = 10;
pub const HIGH_RISK_WORD_WEIGHT: u32 = 30;

/// Scores above this are threats (and at least MEDIUM risk).
pub const THREAT_THRESHOLD: u32 = 20;
/// Scores above this are HIGH risk.
pub const HIGH_RISK_THRESHOLD: u32 = 50;

pub const HIGH_RISK_WORDS: &[&str] = &[
    "virus",
    "malware",
    "phishing",
    "cryptocurrency",
    "bitcoin",
    "dating",
    "casino",
];

const LOCAL_PREFIXES: &[&str] = &["file://", "chrome://"];
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonTag {
    NoUrl,
    AdDomain,
    PatternMatch,
    HighRiskWord,
}

impl ReasonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::NoUrl => "no-url",
            ReasonTag::AdDomain => "ad-domain",
            ReasonTag::PatternMatch => "pattern-match",
            ReasonTag::HighRiskWord => "high-risk-word",
        }
    }
}

impl fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if score > THREAT_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored, categorised evaluation of a url/content pair. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatAssessment {
    pub score: u32,
    pub reasons: BTreeSet<ReasonTag>,
    pub risk_level: RiskLevel,
    pub is_threat: bool,
}

impl ThreatAssessment {
    fn from_parts(score: u32, reasons: BTreeSet<ReasonTag>) -> Self {
        Self {
            score,
            reasons,
            risk_level: RiskLevel::from_score(score),
            is_threat: score > THREAT_THRESHOLD,
        }
    }

    pub fn zero() -> Self {
        Self::from_parts(0, BTreeSet::new())
    }

    fn no_url() -> Self {
        let mut reasons = BTreeSet::new();
        reasons.insert(ReasonTag::NoUrl);
        Self::from_parts(0, reasons)
    }

    pub fn has_reason(&self, tag: ReasonTag) -> bool {
        self.reasons.contains(&tag)
    }
}

impl Default for ThreatAssessment {
    fn default() -> Self {
        Self::zero()
    }
}

#[derive(Debug, Clone)]
pub struct ThreatScorer {
    signatures: Arc<SignatureStore>,
}

impl ThreatScorer {
    pub fn new(signatures: Arc<SignatureStore>) -> Self {
        Self { signatures }
    }

    pub fn signatures(&self) -> &SignatureStore {
        &self.signatures
    }

    pub fn score(&self, url: &str, content: &str) -> ThreatAssessment {
        if url.is_empty() {
            return ThreatAssessment::no_url();
        }

        let mut score = 0;
        let mut reasons = BTreeSet::new();

        if self.signatures.is_known_ad_domain(url) {
            score += AD_DOMAIN_WEIGHT;
            reasons.insert(ReasonTag::AdDomain);
        }

        // One pattern hit at most, whether it came from the url or the content.
        if self.signatures.matches_suspicious_pattern(url)
            || self.signatures.matches_suspicious_pattern(content)
        {
            score += PATTERN_WEIGHT;
            reasons.insert(ReasonTag::PatternMatch);
        }

        let folded = url.to_lowercase();
        if HIGH_RISK_WORDS.iter().any(|word| folded.contains(word)) {
            score += HIGH_RISK_WORD_WEIGHT;
            reasons.insert(ReasonTag::HighRiskWord);
        }

        ThreatAssessment::from_parts(score, reasons)
    }

    /// Whether `url` should be treated as an ad or threat.
    ///
    /// Local content and whitelisted domains are never suspicious.
    pub fn is_suspicious_url(&self, url: &str, content: &str) -> bool {
        if url.is_empty()
            || LOCAL_PREFIXES.iter().any(|p| url.starts_with(p))
            || LOCAL_HOSTS.iter().any(|h| url.contains(h))
            || self.signatures.is_legitimate_domain(url)
        {
            return false;
        }

        let assessment = self.score(url, content);
        if assessment.is_threat {
            log::info!(
                "🛑 Threat detected - score: {}, risk: {}, reasons: {:?}",
                assessment.score,
                assessment.risk_level,
                assessment.reasons
            );
        }
        assessment.is_threat
    }
}

impl Default for ThreatScorer {
    fn default() -> Self {
        Self::new(SignatureStore::builtin())
    }
}
