//! Site Classifier
//!
//! Picks the behavioural policy class for the current page from its host and
//! title. Exactly one class applies per page (first match in priority order),
//! or none.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::signatures::compile_patterns;

/// Topics that make any page "problematic" for new-window requests.
const PROBLEMATIC_TOPICS: &[&str] = &[
    "movie|stream|watch|free|film|tv|show",
    "porn|xxx|sex|adult|cam|tube",
    "torrent|pirate|download|crack|keygen",
    "casino|bet|poker|slots",
    "fmovies|putlocker|gomovies|123movies|pornhub|xvideos",
];

const STREAMING_HOST: &str = "movie|stream|watch|free|film|tv|show|series|fmovies";

/// Hosting shapes matched against the raw href and lower-cased host.
const UNSAFE_HOST_SHAPES: &[&str] = &[
    r"\d+\.\d+\.\d+\.\d+",
    r"[a-z]{20,}\.com",
    r"[0-9]{5,}[a-z]+\.",
];

const UNSAFE_PHRASES: &[&str] = &[
    "free.*download.*crack",
    "torrent.*download",
    "watch.*movies.*online.*free",
    "adult.*videos.*free",
    "casino.*bonus.*free",
];

static BUILTIN: Lazy<Arc<SiteClassifier>> = Lazy::new(|| Arc::new(SiteClassifier::new()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteCategory {
    Adult,
    Streaming,
    Gaming,
    Social,
}

impl SiteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteCategory::Adult => "adult",
            SiteCategory::Streaming => "streaming",
            SiteCategory::Gaming => "gaming",
            SiteCategory::Social => "social",
        }
    }
}

impl fmt::Display for SiteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A behavioural policy bucket.
#[derive(Debug, Clone)]
pub struct SiteClass {
    pub category: SiteCategory,
    pub match_patterns: Vec<Regex>,
    /// Aggressive classes treat every new top-level window as problematic.
    pub aggressive: bool,
    pub whitelist: Vec<&'static str>,
}

impl SiteClass {
    fn new(
        category: SiteCategory,
        patterns: &[&str],
        aggressive: bool,
        whitelist: &[&'static str],
    ) -> Self {
        Self {
            category,
            match_patterns: compile_patterns(patterns, true),
            aggressive,
            whitelist: whitelist.to_vec(),
        }
    }

    pub fn matches(&self, host: &str, title: &str) -> bool {
        self.match_patterns
            .iter()
            .any(|p| p.is_match(host) || p.is_match(title))
    }

    pub fn whitelists(&self, url: &str) -> bool {
        !url.is_empty() && self.whitelist.iter().any(|domain| url.contains(domain))
    }
}

#[derive(Debug, Clone)]
pub struct SiteClassifier {
    classes: Vec<SiteClass>,
    problematic: Vec<Regex>,
    streaming: Vec<Regex>,
    unsafe_shapes: Vec<Regex>,
    unsafe_phrases: Vec<Regex>,
}

impl SiteClassifier {
    pub fn new() -> Self {
        let classes = vec![
            SiteClass::new(
                SiteCategory::Adult,
                &["porn", "xxx", "sex", "adult", "cam", "tube", "xvideos", "pornhub"],
                true,
                &["google.com", "youtube.com", "twitter.com", "instagram.com"],
            ),
            SiteClass::new(
                SiteCategory::Streaming,
                &["movie", "stream", "watch", "fmovies", "putlocker", "123movies"],
                true,
                &["google.com", "youtube.com", "imdb.com", "netflix.com"],
            ),
            SiteClass::new(
                SiteCategory::Gaming,
                &["torrent", "pirate", "crack", "keygen", "hack", "cheat"],
                true,
                &["steam.com", "epic.com", "origin.com"],
            ),
            SiteClass::new(
                SiteCategory::Social,
                &["facebook", "twitter", "instagram", "tiktok", "snapchat"],
                false,
                &["facebook.com", "twitter.com", "instagram.com"],
            ),
        ];

        Self {
            classes,
            problematic: compile_patterns(PROBLEMATIC_TOPICS, true),
            streaming: compile_patterns(&[STREAMING_HOST], true),
            unsafe_shapes: compile_patterns(UNSAFE_HOST_SHAPES, false),
            unsafe_phrases: compile_patterns(UNSAFE_PHRASES, true),
        }
    }

    pub fn builtin() -> Arc<SiteClassifier> {
        BUILTIN.clone()
    }

    /// First class (adult, streaming, gaming, social) matching host or title.
    pub fn classify(&self, host: &str, title: &str) -> Option<&SiteClass> {
        self.classes.iter().find(|class| class.matches(host, title))
    }

    pub fn is_problematic(&self, host: &str, title: &str) -> bool {
        self.problematic
            .iter()
            .any(|p| p.is_match(host) || p.is_match(title))
    }

    pub fn is_streaming_host(&self, host: &str) -> bool {
        self.streaming.iter().any(|p| p.is_match(host))
    }

    pub fn is_unsafe_website(&self, href: &str, host: &str) -> bool {
        self.unsafe_shapes
            .iter()
            .chain(self.unsafe_phrases.iter())
            .any(|p| p.is_match(href) || p.is_match(host))
    }
}

impl Default for SiteClassifier {
    fn default() -> Self {
        Self::new()
    }
}
