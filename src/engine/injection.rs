//! `document.write`, string timer and alert decisions.

use super::{BlockReason, InterceptionEngine, Verdict};
use crate::reporter::ReportKind;

/// Alert texts used by fake-virus and prize scams.
pub const SCAM_ALERT_MARKERS: &[&str] = &["virus", "infected", "winner", "congratulations"];

const TIMER_POPUP_MARKER: &str = "window.open";

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl InterceptionEngine {
    /// Decide markup passed to `document.write`/`writeln`.
    pub fn evaluate_content_injection(&mut self, content: &str) -> Verdict {
        if !self.is_enabled() || content.is_empty() {
            return Verdict::Allow;
        }

        let suspicious = self.signatures.is_known_ad_domain(content)
            || self.signatures.matches_suspicious_pattern(content);
        if !suspicious {
            return Verdict::Allow;
        }

        let prefix = truncate_chars(content, self.config.report_prefix_chars).to_string();
        log::info!("🚫 Blocked content injection: {}", prefix);
        self.report(
            ReportKind::ContentInjectionBlocked,
            prefix,
            Some(BlockReason::SuspiciousContent),
        );
        Verdict::Block(BlockReason::SuspiciousContent)
    }

    /// Decide string-form `setTimeout` code.
    pub fn evaluate_timer_code(&mut self, code: &str) -> Verdict {
        if !self.is_enabled() || !code.contains(TIMER_POPUP_MARKER) {
            return Verdict::Allow;
        }
        let prefix = truncate_chars(code, self.config.report_prefix_chars).to_string();
        log::info!("🚫 Blocked timer popup: {}", prefix);
        self.report(ReportKind::TimerBlocked, prefix, Some(BlockReason::SuspiciousTimer));
        Verdict::Block(BlockReason::SuspiciousTimer)
    }

    /// Decide an `alert()` message.
    pub fn evaluate_alert(&mut self, message: &str) -> Verdict {
        if !self.is_enabled() {
            return Verdict::Allow;
        }
        let folded = message.to_lowercase();
        if !SCAM_ALERT_MARKERS.iter().any(|marker| folded.contains(marker)) {
            return Verdict::Allow;
        }
        let prefix = truncate_chars(message, self.config.report_prefix_chars).to_string();
        log::info!("🚫 Blocked scam alert: {}", prefix);
        self.report(ReportKind::AlertBlocked, prefix, Some(BlockReason::ScamAlert));
        Verdict::Block(BlockReason::ScamAlert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::time::ManualClock;

    fn engine() -> InterceptionEngine {
        InterceptionEngine::new(GuardConfig::default()).with_clock(ManualClock::starting_at(7))
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_coinhive_injection_blocked() {
        let mut engine = engine();
        let content = format!(
            "<script src=\"https://coinhive.com/lib/coinhive.min.js\"></script>{}",
            "x".repeat(500)
        );
        assert_eq!(
            engine.evaluate_content_injection(&content),
            Verdict::Block(BlockReason::SuspiciousContent)
        );

        let reports = engine.take_pending_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::ContentInjectionBlocked);
        assert_eq!(reports[0].detail.chars().count(), 200);
        assert!(reports[0].detail.starts_with("<script src=\"https://coinhive.com"));
    }

    #[test]
    fn test_pattern_only_injection_blocked() {
        let mut engine = engine();
        assert!(engine
            .evaluate_content_injection("<div>Congratulations! Claim your reward</div>")
            .is_blocked());
    }

    #[test]
    fn test_plain_markup_passes() {
        let mut engine = engine();
        assert_eq!(engine.evaluate_content_injection("<p>Hello, world</p>"), Verdict::Allow);
        assert_eq!(engine.evaluate_content_injection(""), Verdict::Allow);
        assert!(engine.take_pending_reports().is_empty());
    }

    #[test]
    fn test_timer_code() {
        let mut engine = engine();
        assert_eq!(
            engine.evaluate_timer_code("window.open('https://popads.net')"),
            Verdict::Block(BlockReason::SuspiciousTimer)
        );
        assert_eq!(engine.evaluate_timer_code("refreshClock()"), Verdict::Allow);
        assert_eq!(engine.take_pending_reports()[0].kind, ReportKind::TimerBlocked);
    }

    #[test]
    fn test_scam_alerts() {
        let mut engine = engine();
        assert_eq!(
            engine.evaluate_alert("WARNING: Your PC is INFECTED"),
            Verdict::Block(BlockReason::ScamAlert)
        );
        assert!(engine.evaluate_alert("You are our 1,000,000th winner").is_blocked());
        assert_eq!(engine.evaluate_alert("Saved."), Verdict::Allow);

        let reports = engine.take_pending_reports();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.kind == ReportKind::AlertBlocked));
    }

    #[test]
    fn test_disabled_passes_through() {
        let mut engine = engine();
        engine.set_enabled(false);
        assert_eq!(engine.evaluate_content_injection("coinhive.com"), Verdict::Allow);
        assert_eq!(engine.evaluate_timer_code("window.open()"), Verdict::Allow);
        assert_eq!(engine.evaluate_alert("virus detected"), Verdict::Allow);
    }
}
