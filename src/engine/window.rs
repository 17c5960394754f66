//! New-window, modal and focus decisions.

use super::{BlockReason, InterceptionEngine, PageContext, Verdict};
use crate::reporter::ReportKind;

/// Urls that can never open anything harmful.
const INERT_SCHEMES: &[&str] = &[
    "chrome:",
    "chrome-extension:",
    "moz-extension:",
    "edge:",
    "data:",
    "blob:",
];

/// Targets that open a new top-level browsing context.
const NEW_CONTEXT_TARGETS: &[&str] = &["_blank"];

const CHROME_FEATURES: &[&str] = &["toolbar", "menubar", "resizable", "scrollbars"];

/// Stack markers of a user-driven event handler.
const USER_GESTURE_FRAMES: &[&str] = &["click", "mousedown", "keydown"];

/// Arguments of a `window.open` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowOpenRequest {
    pub url: Option<String>,
    pub target: Option<String>,
    pub features: Option<String>,
}

impl WindowOpenRequest {
    pub fn new(url: Option<String>, target: Option<String>, features: Option<String>) -> Self {
        Self {
            url,
            target,
            features,
        }
    }

    pub fn url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn features(mut self, features: &str) -> Self {
        self.features = Some(features.to_string());
        self
    }

    /// `_blank` or no target at all.
    pub fn opens_new_context(&self) -> bool {
        match self.target.as_deref() {
            None | Some("") => true,
            Some(target) => NEW_CONTEXT_TARGETS.iter().any(|t| *t == target),
        }
    }
}

/// Parsed `window.open` feature string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowFeatures {
    raw: String,
    pairs: Vec<(String, String)>,
}

impl WindowFeatures {
    pub fn parse(features: &str) -> Self {
        let raw = features.to_ascii_lowercase();
        let pairs = raw
            .split(',')
            .filter_map(|item| {
                let item = item.trim();
                if item.is_empty() {
                    return None;
                }
                let (key, value) = item.split_once('=').unwrap_or((item, ""));
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self { raw, pairs }
    }

    fn value(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Browser chrome switched off (toolbar=no and friends).
    pub fn strips_chrome(&self) -> bool {
        CHROME_FEATURES
            .iter()
            .any(|key| matches!(self.value(key), Some("no") | Some("0")))
    }

    /// A 1x1 (or smaller) window.
    pub fn is_hidden(&self) -> bool {
        ["width", "height"].iter().any(|key| {
            self.value(key)
                .and_then(|v| v.trim_end_matches("px").parse::<f64>().ok())
                .map(|size| size <= 1.0)
                .unwrap_or(false)
        })
    }

    pub fn is_suspicious(&self) -> bool {
        self.raw.contains("popup") || self.strips_chrome() || self.is_hidden()
    }
}

/// Signals used to decide whether a call came from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserActivation {
    /// `navigator.userActivation.isActive`, when the browser exposes it.
    pub is_active: Option<bool>,
    /// Call-stack text of the guarded call.
    pub stack: Option<String>,
}

impl UserActivation {
    pub fn native(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            stack: None,
        }
    }

    pub fn from_stack(stack: &str) -> Self {
        Self {
            is_active: None,
            stack: Some(stack.to_string()),
        }
    }

    /// Native signal first; stack heuristic only where it is missing.
    pub fn is_user_initiated(&self) -> bool {
        match self.is_active {
            Some(active) => active,
            None => self
                .stack
                .as_deref()
                .map(|stack| USER_GESTURE_FRAMES.iter().any(|frame| stack.contains(frame)))
                .unwrap_or(false),
        }
    }
}

fn is_inert_url(url: &str) -> bool {
    url.is_empty() || url == "about:blank" || INERT_SCHEMES.iter().any(|s| url.starts_with(s))
}

impl InterceptionEngine {
    /// Decide a `window.open` request.
    pub fn evaluate_new_window(&mut self, page: &PageContext, request: &WindowOpenRequest) -> Verdict {
        if !self.is_enabled() {
            return Verdict::Allow;
        }

        let url = request.url.as_deref().unwrap_or("");
        if is_inert_url(url) || self.signatures.is_major_legitimate(url) {
            log::debug!("Allowing whitelisted new window: {:?}", url);
            return Verdict::Allow;
        }

        let verdict = match self.new_window_block_reason(page, request, url) {
            Some(reason) => {
                // Keep the rapid-fire clock running for blocked attempts too.
                self.note_popup_attempt();
                Verdict::Block(reason)
            }
            None if self.note_popup_attempt() => Verdict::Block(BlockReason::RapidFire),
            None => Verdict::Allow,
        };

        match verdict {
            Verdict::Block(reason) => {
                self.state.record_block();
                log::info!("🚫 Blocked new window ({}): {}", reason, url);
                self.report(ReportKind::NewWindowBlocked, url.to_string(), Some(reason));
            }
            Verdict::Allow => log::debug!("Allowing new window: {}", url),
        }
        verdict
    }

    fn new_window_block_reason(
        &self,
        page: &PageContext,
        request: &WindowOpenRequest,
        url: &str,
    ) -> Option<BlockReason> {
        let site_class = self.classifier.classify(&page.host, &page.title);
        let problematic = self.classifier.is_problematic(&page.host, &page.title)
            || site_class.map(|class| class.aggressive).unwrap_or(false);

        if problematic && request.opens_new_context() {
            let whitelisted = site_class.map(|class| class.whitelists(url)).unwrap_or(false);
            if !whitelisted {
                if let Some(class) = site_class {
                    log::debug!("Applying {} site rules on {}", class.category, page.host);
                }
                return Some(BlockReason::ProblematicSiteNewWindow);
            }
        }

        if self.scorer.is_suspicious_url(url, "") {
            return Some(BlockReason::SuspiciousUrl);
        }

        let suspicious_features = request
            .features
            .as_deref()
            .map(|features| WindowFeatures::parse(features).is_suspicious())
            .unwrap_or(false);
        if suspicious_features {
            return Some(BlockReason::SuspiciousFeatures);
        }

        None
    }

    /// Returns true when this attempt follows the previous one too closely.
    fn note_popup_attempt(&mut self) -> bool {
        let now = self.now_ms();
        self.state
            .record_popup_attempt(now, self.config.rapid_fire_window_ms)
    }

    /// Decide a modal-dialog open (`showModalDialog`).
    pub fn evaluate_modal(&mut self, url: &str) -> Verdict {
        if !self.is_enabled() || !self.scorer.is_suspicious_url(url, "") {
            return Verdict::Allow;
        }
        log::info!("🚫 Blocked modal dialog to: {}", url);
        self.report(
            ReportKind::ModalBlocked,
            url.to_string(),
            Some(BlockReason::SuspiciousUrl),
        );
        Verdict::Block(BlockReason::SuspiciousUrl)
    }

    /// Decide a `window.focus()` call.
    pub fn evaluate_focus(&self, activation: &UserActivation) -> Verdict {
        if !self.is_enabled() || activation.is_user_initiated() {
            return Verdict::Allow;
        }
        log::debug!("Blocked automatic focus attempt");
        Verdict::Block(BlockReason::NoUserActivation)
    }
}
