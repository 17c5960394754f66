//! Inserted-element, overlay-sweep and frame-source decisions.

use super::{BlockReason, InterceptionEngine, Verdict};
use crate::reporter::ReportKind;

/// Tags whose `src` is checked on insertion.
pub const FRAME_LIKE_TAGS: &[&str] = &["IFRAME", "FRAME", "SCRIPT", "EMBED", "OBJECT"];

/// Elements visited by the periodic overlay sweep.
pub const OVERLAY_SELECTORS: &[&str] = &[
    "[id*=\"popup\"]",
    "[class*=\"popup\"]",
    "[id*=\"overlay\"]",
    "[class*=\"overlay\"]",
    "[id*=\"modal\"]",
    "[class*=\"modal\"]",
    "[id*=\"advertisement\"]",
    "[class*=\"advertisement\"]",
    "[id*=\"ads\"]",
    "[class*=\"ads\"]",
    "[style*=\"position: fixed\"]",
    "[style*=\"position:fixed\"]",
    "[style*=\"z-index: 999\"]",
    "[style*=\"z-index:999\"]",
    "div[style*=\"width: 100%\"][style*=\"height: 100%\"]",
];

/// What the guard read off an element before asking the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSnapshot {
    /// Upper-case tag name.
    pub tag_name: String,
    pub src: Option<String>,
    /// Class name or id, for reports.
    pub identity: String,
    /// Computed `position`.
    pub position: String,
    /// Computed `z-index`; `None` for `auto`.
    pub z_index: Option<i64>,
    pub width: f64,
    pub height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl ElementSnapshot {
    pub fn is_frame_like(&self) -> bool {
        FRAME_LIKE_TAGS
            .iter()
            .any(|tag| self.tag_name.eq_ignore_ascii_case(tag))
    }

    pub fn is_fixed(&self) -> bool {
        self.position == "fixed"
    }

    pub fn is_positioned(&self) -> bool {
        self.position == "fixed" || self.position == "absolute"
    }

    fn z_above(&self, threshold: i64) -> bool {
        self.z_index.map(|z| z > threshold).unwrap_or(false)
    }

    /// Covers more than `ratio` of the viewport in either dimension.
    fn covers_viewport(&self, ratio: f64) -> bool {
        (self.viewport_width > 0.0 && self.width > self.viewport_width * ratio)
            || (self.viewport_height > 0.0 && self.height > self.viewport_height * ratio)
    }

    fn label(&self) -> String {
        if self.identity.is_empty() {
            self.tag_name.clone()
        } else {
            self.identity.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    Keep,
    Remove(BlockReason),
}

impl ElementAction {
    pub fn is_remove(&self) -> bool {
        matches!(self, ElementAction::Remove(_))
    }
}

impl InterceptionEngine {
    /// Decide an element the mutation observer just saw inserted.
    pub fn evaluate_inserted_element(&mut self, element: &ElementSnapshot) -> ElementAction {
        if !self.is_enabled() {
            return ElementAction::Keep;
        }

        if element.is_frame_like() {
            let src = element.src.as_deref().unwrap_or("");
            if self.scorer.is_suspicious_url(src, "") {
                log::info!("🚫 Removed suspicious {}: {}", element.tag_name, src);
                self.report(
                    ReportKind::ElementBlocked,
                    src.to_string(),
                    Some(BlockReason::SuspiciousElement),
                );
                return ElementAction::Remove(BlockReason::SuspiciousElement);
            }
        }

        if element.is_fixed() && element.z_above(self.config.inserted_overlay_min_z_index) {
            log::info!("🚫 Removed inserted overlay: {}", element.label());
            self.report(
                ReportKind::OverlayRemoved,
                element.label(),
                Some(BlockReason::FullPageOverlay),
            );
            return ElementAction::Remove(BlockReason::FullPageOverlay);
        }

        ElementAction::Keep
    }

    /// Decide an element found by the overlay sweep.
    pub fn evaluate_overlay(&mut self, element: &ElementSnapshot) -> ElementAction {
        if !self.is_enabled() || !element.is_positioned() {
            return ElementAction::Keep;
        }

        let overlay_shaped = element.z_above(self.config.sweep_overlay_min_z_index)
            || element.covers_viewport(self.config.viewport_coverage_ratio);
        if !overlay_shaped {
            return ElementAction::Keep;
        }

        log::info!("🚫 Removed overlay: {}", element.label());
        self.report(
            ReportKind::OverlayRemoved,
            element.label(),
            Some(BlockReason::FullPageOverlay),
        );
        ElementAction::Remove(BlockReason::FullPageOverlay)
    }

    /// Decide a `src` assignment on a freshly created frame.
    pub fn evaluate_frame_source(&mut self, url: &str) -> Verdict {
        if !self.is_enabled() || !self.scorer.is_suspicious_url(url, "") {
            return Verdict::Allow;
        }
        log::info!("🚫 Blocked frame source: {}", url);
        self.report(
            ReportKind::ElementBlocked,
            url.to_string(),
            Some(BlockReason::SuspiciousElement),
        );
        Verdict::Block(BlockReason::SuspiciousElement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;
    use crate::time::ManualClock;

    fn engine() -> InterceptionEngine {
        InterceptionEngine::new(GuardConfig::default()).with_clock(ManualClock::starting_at(0))
    }

    fn frame(tag: &str, src: &str) -> ElementSnapshot {
        ElementSnapshot {
            tag_name: tag.to_string(),
            src: Some(src.to_string()),
            position: "static".into(),
            ..Default::default()
        }
    }

    fn positioned(position: &str, z_index: Option<i64>, width: f64, height: f64) -> ElementSnapshot {
        ElementSnapshot {
            tag_name: "DIV".into(),
            identity: "div#cover".into(),
            position: position.into(),
            z_index,
            width,
            height,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_suspicious_frame_removed() {
        let mut engine = engine();
        let action = engine.evaluate_inserted_element(&frame("IFRAME", "https://exoclick.com/ad"));
        assert_eq!(action, ElementAction::Remove(BlockReason::SuspiciousElement));

        let action = engine.evaluate_inserted_element(&frame("script", "https://coinhive.com/lib.js"));
        assert!(action.is_remove());

        let reports = engine.take_pending_reports();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.kind == ReportKind::ElementBlocked));
        assert_eq!(reports[0].detail, "https://exoclick.com/ad");
    }

    #[test]
    fn test_clean_frames_kept() {
        let mut engine = engine();
        assert_eq!(
            engine.evaluate_inserted_element(&frame("IFRAME", "https://www.youtube.com/embed/x")),
            ElementAction::Keep
        );
        assert_eq!(
            engine.evaluate_inserted_element(&frame("IMG", "https://exoclick.com/pixel.gif")),
            ElementAction::Keep
        );
        let mut no_src = frame("IFRAME", "");
        no_src.src = None;
        assert_eq!(engine.evaluate_inserted_element(&no_src), ElementAction::Keep);
        assert!(engine.take_pending_reports().is_empty());
    }

    #[test]
    fn test_inserted_fixed_overlay() {
        let mut engine = engine();
        let action = engine.evaluate_inserted_element(&positioned("fixed", Some(1000), 10.0, 10.0));
        assert_eq!(action, ElementAction::Remove(BlockReason::FullPageOverlay));

        // inserted elements need more than z-index 999
        assert_eq!(
            engine.evaluate_inserted_element(&positioned("fixed", Some(999), 1280.0, 800.0)),
            ElementAction::Keep
        );
        assert_eq!(
            engine.evaluate_inserted_element(&positioned("absolute", Some(5000), 10.0, 10.0)),
            ElementAction::Keep
        );

        let reports = engine.take_pending_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::OverlayRemoved);
        assert_eq!(reports[0].detail, "div#cover");
    }

    #[test]
    fn test_sweep_overlay_shapes() {
        let mut engine = engine();
        assert!(engine
            .evaluate_overlay(&positioned("fixed", Some(101), 10.0, 10.0))
            .is_remove());
        assert!(engine
            .evaluate_overlay(&positioned("absolute", None, 1100.0, 10.0))
            .is_remove());
        assert!(engine
            .evaluate_overlay(&positioned("absolute", Some(1), 10.0, 700.0))
            .is_remove());

        assert_eq!(
            engine.evaluate_overlay(&positioned("fixed", Some(100), 1000.0, 600.0)),
            ElementAction::Keep
        );
        assert_eq!(
            engine.evaluate_overlay(&positioned("relative", Some(9999), 1280.0, 800.0)),
            ElementAction::Keep
        );
        assert_eq!(engine.reporter_stats().pending, 3);
    }

    #[test]
    fn test_zero_viewport_never_counts_as_covered() {
        let mut engine = engine();
        let mut element = positioned("fixed", None, 50.0, 50.0);
        element.viewport_width = 0.0;
        element.viewport_height = 0.0;
        assert_eq!(engine.evaluate_overlay(&element), ElementAction::Keep);
    }

    #[test]
    fn test_frame_source() {
        let mut engine = engine();
        assert_eq!(
            engine.evaluate_frame_source("https://popcash.net/go"),
            Verdict::Block(BlockReason::SuspiciousElement)
        );
        assert_eq!(engine.evaluate_frame_source("https://example.org/embed"), Verdict::Allow);
        assert_eq!(engine.evaluate_frame_source(""), Verdict::Allow);
    }

    #[test]
    fn test_disabled_keeps_everything() {
        let mut engine = engine();
        engine.set_enabled(false);
        assert_eq!(
            engine.evaluate_inserted_element(&frame("IFRAME", "https://exoclick.com/ad")),
            ElementAction::Keep
        );
        assert_eq!(
            engine.evaluate_overlay(&positioned("fixed", Some(5000), 1280.0, 800.0)),
            ElementAction::Keep
        );
        assert_eq!(engine.evaluate_frame_source("https://popcash.net/go"), Verdict::Allow);
    }
}
