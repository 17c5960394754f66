//! Interception Engine
//!
//! The stateful core. One engine exists per page context; every guarded
//! capability asks it for a [`Verdict`] before touching the real browser
//! primitive. The engine consults the [`SiteClassifier`] for the page's
//! policy class and the [`ThreatScorer`] for url/content risk, applies the
//! temporal heuristics, and emits a report for every suppression.
//!
//! The engine never calls into the browser itself. Guards gather context,
//! ask the engine, and then either forward the original call or substitute an
//! inert result.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classifier::SiteClassifier;
use crate::config::GuardConfig;
use crate::control::{ControlMessage, ControlResponse};
use crate::reporter::{Report, ReportKind, ReportSink, Reporter, ReporterStats};
use crate::scorer::{ThreatAssessment, ThreatScorer};
use crate::signatures::SignatureStore;
use crate::state::InterceptionState;
use crate::time::{Clock, SystemClock};

mod dom;
mod injection;
mod listener;
mod submission;
mod window;

pub use dom::{ElementAction, ElementSnapshot, FRAME_LIKE_TAGS, OVERLAY_SELECTORS};
pub use injection::{truncate_chars, SCAM_ALERT_MARKERS};
pub use listener::ListenerPolicy;
pub use window::{UserActivation, WindowFeatures, WindowOpenRequest};

/// Why a capability use was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    ProblematicSiteNewWindow,
    SuspiciousUrl,
    SuspiciousFeatures,
    RapidFire,
    NoUserActivation,
    SuspiciousElement,
    FullPageOverlay,
    SuspiciousContent,
    SuspiciousFormAction,
    SuspiciousListener,
    SuspiciousTimer,
    ScamAlert,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::ProblematicSiteNewWindow => "problematic-site-new-window",
            BlockReason::SuspiciousUrl => "suspicious-url",
            BlockReason::SuspiciousFeatures => "suspicious-features",
            BlockReason::RapidFire => "rapid-fire",
            BlockReason::NoUserActivation => "no-user-activation",
            BlockReason::SuspiciousElement => "suspicious-element",
            BlockReason::FullPageOverlay => "full-page-overlay",
            BlockReason::SuspiciousContent => "suspicious-content",
            BlockReason::SuspiciousFormAction => "suspicious-form-action",
            BlockReason::SuspiciousListener => "suspicious-listener",
            BlockReason::SuspiciousTimer => "suspicious-timer",
            BlockReason::ScamAlert => "scam-alert",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(BlockReason),
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block(_))
    }

    pub fn reason(&self) -> Option<BlockReason> {
        match self {
            Verdict::Allow => None,
            Verdict::Block(reason) => Some(*reason),
        }
    }
}

/// The page a guard was invoked on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub href: String,
    /// Lower-cased hostname.
    pub host: String,
    pub title: String,
}

impl PageContext {
    pub fn new(href: impl Into<String>, host: &str, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            host: host.to_lowercase(),
            title: title.into(),
        }
    }

    /// Context for a bare host, e.g. `"xvideos.com"`.
    pub fn for_host(host: &str) -> Self {
        Self::new(format!("https://{}/", host), host, "")
    }
}

pub struct InterceptionEngine {
    config: GuardConfig,
    state: InterceptionState,
    signatures: Arc<SignatureStore>,
    scorer: ThreatScorer,
    classifier: Arc<SiteClassifier>,
    listener_policy: ListenerPolicy,
    reporter: Reporter,
    clock: Box<dyn Clock>,
}

impl InterceptionEngine {
    /// Engine with the built-in signatures and the wall clock.
    pub fn new(config: GuardConfig) -> Self {
        let signatures = SignatureStore::builtin();
        Self {
            state: InterceptionState::new(config.enabled),
            scorer: ThreatScorer::new(signatures.clone()),
            signatures,
            classifier: SiteClassifier::builtin(),
            listener_policy: ListenerPolicy::default(),
            reporter: Reporter::new(config.report_queue_capacity),
            clock: Box::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_signatures(mut self, signatures: Arc<SignatureStore>) -> Self {
        self.scorer = ThreatScorer::new(signatures.clone());
        self.signatures = signatures;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.reporter.attach_sink(sink);
        self
    }

    pub fn attach_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.reporter.attach_sink(sink);
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Takes effect for every later evaluation.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.state.is_enabled() != enabled {
            log::info!("Blocking {}", if enabled { "enabled" } else { "disabled" });
        }
        self.state.set_enabled(enabled);
    }

    pub fn blocked_attempts(&self) -> u32 {
        self.state.blocked_attempts()
    }

    pub fn scorer(&self) -> &ThreatScorer {
        &self.scorer
    }

    pub fn classifier(&self) -> &SiteClassifier {
        &self.classifier
    }

    pub fn listener_policy(&self) -> &ListenerPolicy {
        &self.listener_policy
    }

    pub fn assess(&self, url: &str, content: &str) -> ThreatAssessment {
        self.scorer.score(url, content)
    }

    pub fn reporter_stats(&self) -> ReporterStats {
        self.reporter.stats()
    }

    pub fn take_pending_reports(&mut self) -> Vec<Report> {
        self.reporter.take_pending()
    }

    pub fn handle_control_message(&mut self, message: &ControlMessage) -> ControlResponse {
        match message {
            ControlMessage::UpdateBlockingStatus { enabled } => {
                self.set_enabled(*enabled);
                ControlResponse::Ack { success: true }
            }
            ControlMessage::GetBlockedAttempts => ControlResponse::BlockedAttempts {
                blocked_attempts: self.blocked_attempts(),
            },
        }
    }

    /// Report the page itself when it looks like an unsafe website.
    ///
    /// Informational only; nothing is blocked.
    pub fn inspect_page(&mut self, page: &PageContext) -> bool {
        let unsafe_site = self.classifier.is_unsafe_website(&page.href, &page.host);
        if unsafe_site {
            log::info!("⚠️ Unsafe website detected: {}", page.host);
            self.report(ReportKind::UnsafeSiteDetected, page.host.clone(), None);
        }
        unsafe_site
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(crate) fn report(&mut self, kind: ReportKind, detail: String, reason: Option<BlockReason>) {
        let report = Report {
            kind,
            detail,
            reason,
            timestamp_ms: self.now_ms(),
        };
        self.reporter.emit(report);
    }
}

impl fmt::Debug for InterceptionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionEngine")
            .field("enabled", &self.state.is_enabled())
            .field("blocked_attempts", &self.state.blocked_attempts())
            .field("reporter", &self.reporter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn engine() -> InterceptionEngine {
        InterceptionEngine::new(GuardConfig::default()).with_clock(ManualClock::starting_at(1_000))
    }

    #[test]
    fn test_control_messages() {
        let mut engine = engine();
        let response =
            engine.handle_control_message(&ControlMessage::UpdateBlockingStatus { enabled: false });
        assert_eq!(response, ControlResponse::Ack { success: true });
        assert!(!engine.is_enabled());

        let response = engine.handle_control_message(&ControlMessage::GetBlockedAttempts);
        assert_eq!(response, ControlResponse::BlockedAttempts { blocked_attempts: 0 });
    }

    #[test]
    fn test_initial_flag_follows_config() {
        let engine = InterceptionEngine::new(GuardConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(!engine.is_enabled());
    }

    #[test]
    fn test_inspect_page_reports_unsafe_site() {
        let mut engine = engine();
        let page = PageContext::new("http://198.51.100.4/", "198.51.100.4", "");
        assert!(engine.inspect_page(&page));

        let reports = engine.take_pending_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::UnsafeSiteDetected);
        assert_eq!(reports[0].timestamp_ms, 1_000);
        assert_eq!(engine.blocked_attempts(), 0);
    }

    #[test]
    fn test_page_context_lowercases_host() {
        let page = PageContext::new("https://Example.COM/", "Example.COM", "Title");
        assert_eq!(page.host, "example.com");
        assert_eq!(page.title, "Title");
    }

    #[test]
    fn test_verdict_helpers() {
        assert!(!Verdict::Allow.is_blocked());
        assert_eq!(Verdict::Block(BlockReason::RapidFire).reason(), Some(BlockReason::RapidFire));
        assert_eq!(BlockReason::ProblematicSiteNewWindow.to_string(), "problematic-site-new-window");
    }
}
