//! Page-exit listener policy.

use regex::Regex;

use super::{BlockReason, InterceptionEngine, PageContext, Verdict};
use crate::reporter::ReportKind;
use crate::signatures::compile_patterns;

const GUARDED_EVENTS: &[&str] = &["beforeunload", "unload", "pagehide"];

/// Host categories on which exit listeners are inspected.
const GUARDED_HOSTS: &[&str] = &[
    "fmovies|putlocker|gomovies|123movies|pornhub|xvideos",
    "popads|popcash|adcash|exoclick",
];

/// Listener source fragments that open, alert or redirect on exit.
const LISTENER_MARKERS: &[&str] = &["window.open", "popup", "alert(", "redirect"];

#[derive(Debug, Clone)]
pub struct ListenerPolicy {
    events: Vec<&'static str>,
    hosts: Vec<Regex>,
    markers: Vec<&'static str>,
}

impl ListenerPolicy {
    pub fn new(events: &[&'static str], hosts: &[&str], markers: &[&'static str]) -> Self {
        Self {
            events: events.to_vec(),
            hosts: compile_patterns(hosts, true),
            markers: markers.to_vec(),
        }
    }

    pub fn watches_event(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| *e == event_type)
    }

    /// Whether listeners for `event_type` on `host` get inspected at all.
    pub fn guards_event(&self, host: &str, event_type: &str) -> bool {
        self.watches_event(event_type) && self.hosts.iter().any(|p| p.is_match(host))
    }

    pub fn should_deny(&self, host: &str, event_type: &str, source: &str) -> bool {
        self.guards_event(host, event_type)
            && self.markers.iter().any(|marker| source.contains(marker))
    }
}

impl Default for ListenerPolicy {
    fn default() -> Self {
        Self::new(GUARDED_EVENTS, GUARDED_HOSTS, LISTENER_MARKERS)
    }
}

impl InterceptionEngine {
    /// Decide an `addEventListener` registration given the listener's source text.
    pub fn evaluate_listener(&mut self, page: &PageContext, event_type: &str, source: &str) -> Verdict {
        if !self.is_enabled() || !self.listener_policy.should_deny(&page.host, event_type, source) {
            return Verdict::Allow;
        }
        log::info!("🚫 Blocked {} listener on {}", event_type, page.host);
        self.report(
            ReportKind::ListenerBlocked,
            format!("{}-blocked", event_type),
            Some(BlockReason::SuspiciousListener),
        );
        Verdict::Block(BlockReason::SuspiciousListener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;

    const POPUP_HANDLER: &str = "function () { window.open('https://popads.net') }";

    #[test]
    fn test_policy_matrix() {
        let policy = ListenerPolicy::default();
        assert!(policy.should_deny("fmovies.to", "beforeunload", POPUP_HANDLER));
        assert!(policy.should_deny("www.exoclick.com", "pagehide", "() => alert('bye')"));
        assert!(!policy.should_deny("fmovies.to", "click", POPUP_HANDLER));
        assert!(!policy.should_deny("docs.rs", "unload", POPUP_HANDLER));
        assert!(!policy.should_deny("fmovies.to", "unload", "() => saveProgress()"));
        assert!(policy.watches_event("pagehide"));
        assert!(!policy.watches_event("scroll"));
    }

    #[test]
    fn test_blocked_listener_reported() {
        let mut engine = InterceptionEngine::new(GuardConfig::default());
        let page = PageContext::for_host("putlocker.example");
        assert_eq!(
            engine.evaluate_listener(&page, "unload", POPUP_HANDLER),
            Verdict::Block(BlockReason::SuspiciousListener)
        );
        let reports = engine.take_pending_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::ListenerBlocked);
        assert_eq!(reports[0].detail, "unload-blocked");
    }

    #[test]
    fn test_disabled_allows_listener() {
        let mut engine = InterceptionEngine::new(GuardConfig::default());
        engine.set_enabled(false);
        let page = PageContext::for_host("putlocker.example");
        assert_eq!(engine.evaluate_listener(&page, "unload", POPUP_HANDLER), Verdict::Allow);
    }
}
