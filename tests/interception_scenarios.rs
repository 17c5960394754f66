//! End-to-end engine scenarios, run natively.
//!
//! Run with: cargo test

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use popstop_wasm::{
    BlockReason, ControlMessage, ControlResponse, ControlSurface, ElementSnapshot, GuardConfig,
    InterceptionEngine, ManualClock, PageContext, ReasonTag, Report, ReportKind, ReportSink,
    RiskLevel, SignatureStore, ThreatScorer, Verdict, WindowOpenRequest,
};

fn engine_at(ms: u64) -> (InterceptionEngine, ManualClock) {
    let clock = ManualClock::starting_at(ms);
    let engine = InterceptionEngine::new(GuardConfig::default()).with_clock(clock.clone());
    (engine, clock)
}

#[derive(Clone, Default)]
struct CollectingSink(Rc<RefCell<Vec<Report>>>);

impl ReportSink for CollectingSink {
    fn deliver(&self, report: &Report) -> popstop_wasm::Result<()> {
        self.0.borrow_mut().push(report.clone());
        Ok(())
    }
}

// ===== Threat scoring =====

#[test]
fn doubleclick_subdomain_is_high_risk() {
    let scorer = ThreatScorer::default();
    let assessment = scorer.score("http://ads.doubleclick.net/x", "");
    assert!(assessment.score > 50, "score was {}", assessment.score);
    assert_eq!(assessment.risk_level, RiskLevel::High);
    assert!(assessment.is_threat);
    assert!(assessment.has_reason(ReasonTag::AdDomain));
    assert!(assessment.has_reason(ReasonTag::PatternMatch));
}

#[test]
fn score_of_exactly_fifty_is_medium() {
    let scorer = ThreatScorer::default();
    let assessment = scorer.score("https://taboola.com/feed", "");
    assert_eq!(assessment.score, 50);
    assert_eq!(assessment.risk_level, RiskLevel::Medium);
    assert!(assessment.is_threat);
}

#[test]
fn empty_url_carries_no_signal() {
    let scorer = ThreatScorer::default();
    let assessment = scorer.score("", "casino bonus");
    assert_eq!(assessment.score, 0);
    assert_eq!(assessment.risk_level, RiskLevel::Low);
    assert!(assessment.has_reason(ReasonTag::NoUrl));
    assert!(!scorer.is_suspicious_url("", ""));
}

// ===== New-window decisions =====

#[test]
fn problematic_site_new_window_is_blocked_and_reported() {
    let (engine, _) = engine_at(1_700_000_000_000);
    let sink = CollectingSink::default();
    let mut engine = engine.with_sink(Box::new(sink.clone()));

    let page = PageContext::new("https://xvideos.com/video1", "xvideos.com", "");
    let verdict = engine.evaluate_new_window(
        &page,
        &WindowOpenRequest::url("http://example.org").target("_blank"),
    );

    assert_eq!(verdict, Verdict::Block(BlockReason::ProblematicSiteNewWindow));
    assert_eq!(engine.blocked_attempts(), 1);

    let seen = sink.0.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind, ReportKind::NewWindowBlocked);
    assert_eq!(seen[0].detail, "http://example.org");
    assert_eq!(seen[0].timestamp_ms, 1_700_000_000_000);
}

#[test]
fn major_legitimate_destination_is_allowed() {
    let (mut engine, _) = engine_at(0);
    let page = PageContext::new("https://mail.google.com/", "mail.google.com", "Inbox");
    let verdict = engine.evaluate_new_window(
        &page,
        &WindowOpenRequest::url("https://accounts.google.com/signin").target("_blank"),
    );
    assert_eq!(verdict, Verdict::Allow);
    assert_eq!(engine.blocked_attempts(), 0);
}

#[test]
fn second_clean_request_within_cooldown_is_rapid_fire() {
    let (mut engine, clock) = engine_at(10_000);
    let page = PageContext::new("https://example.com/", "example.com", "Example Domain");
    let request = WindowOpenRequest::url("https://example.org/docs");

    assert_eq!(engine.evaluate_new_window(&page, &request), Verdict::Allow);
    clock.advance(1_000);
    assert_eq!(
        engine.evaluate_new_window(&page, &request),
        Verdict::Block(BlockReason::RapidFire)
    );
    assert_eq!(engine.blocked_attempts(), 1);
}

#[test]
fn disabling_forwards_everything_and_keeps_counter() {
    let (mut engine, clock) = engine_at(0);
    let page = PageContext::for_host("xvideos.com");
    let request = WindowOpenRequest::url("https://popads.net/").target("_blank");

    assert!(engine.evaluate_new_window(&page, &request).is_blocked());
    engine.set_enabled(false);
    for _ in 0..3 {
        clock.advance(10);
        assert_eq!(engine.evaluate_new_window(&page, &request), Verdict::Allow);
    }
    assert_eq!(engine.blocked_attempts(), 1);

    engine.set_enabled(true);
    clock.advance(10_000);
    assert!(engine.evaluate_new_window(&page, &request).is_blocked());
    assert_eq!(engine.blocked_attempts(), 2);
}

#[test]
fn custom_signatures_drive_new_window_decisions() {
    let page = PageContext::new("https://example.com/", "example.com", "Example Domain");
    let request = WindowOpenRequest::url("https://adnet.test/welcome");

    let (mut stock, _) = engine_at(0);
    assert_eq!(stock.evaluate_new_window(&page, &request), Verdict::Allow);

    let store = Arc::new(SignatureStore::new(&["adnet.test"], &[r"/welcome\b"], &[]));
    let (engine, _) = engine_at(0);
    let mut engine = engine.with_signatures(store);
    assert_eq!(engine.assess("https://adnet.test/welcome", "").score, 60);
    assert_eq!(
        engine.evaluate_new_window(&page, &request),
        Verdict::Block(BlockReason::SuspiciousUrl)
    );
}

// ===== Content and DOM =====

#[test]
fn coinhive_write_is_suppressed_with_short_detail() {
    let (mut engine, _) = engine_at(0);
    let markup = format!(
        "<script src=\"//coinhive.com/lib/miner.js\"></script><!-- {} -->",
        "padding ".repeat(80)
    );
    assert!(engine.evaluate_content_injection(&markup).is_blocked());

    let reports = engine.take_pending_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, ReportKind::ContentInjectionBlocked);
    assert!(reports[0].detail.chars().count() <= 200);
}

#[test]
fn inserted_ad_frame_and_overlay_are_removed() {
    let (mut engine, _) = engine_at(0);
    let frame = ElementSnapshot {
        tag_name: "IFRAME".into(),
        src: Some("https://googlesyndication.com/safeframe".into()),
        ..Default::default()
    };
    assert!(engine.evaluate_inserted_element(&frame).is_remove());

    let overlay = ElementSnapshot {
        tag_name: "DIV".into(),
        identity: "promo-overlay".into(),
        position: "fixed".into(),
        z_index: Some(2_147_483_647),
        width: 1920.0,
        height: 1080.0,
        viewport_width: 1920.0,
        viewport_height: 1080.0,
        ..Default::default()
    };
    assert!(engine.evaluate_inserted_element(&overlay).is_remove());

    let kinds: Vec<ReportKind> = engine.take_pending_reports().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![ReportKind::ElementBlocked, ReportKind::OverlayRemoved]);
}

// ===== Control surface =====

#[test]
fn control_surface_counts_blocks_from_engine() {
    let surface = Rc::new(ControlSurface::new());
    let (engine, clock) = engine_at(0);
    let mut engine = engine.with_sink(Box::new(surface.clone()));

    let page = PageContext::new("http://203.0.113.9/", "203.0.113.9", "");
    assert!(engine.inspect_page(&page));
    assert_eq!(surface.blocked_count(), 0);
    assert_eq!(surface.badge_text(), "");

    let request = WindowOpenRequest::url("https://propellerads.com/click");
    assert!(engine.evaluate_new_window(&page, &request).is_blocked());
    clock.advance(5_000);
    assert!(engine.evaluate_alert("Your computer is infected!").is_blocked());

    assert_eq!(surface.blocked_count(), 2);
    assert_eq!(surface.badge_text(), "2");
}

#[test]
fn control_messages_round_trip_through_engine() {
    let (mut engine, _) = engine_at(0);
    let message: ControlMessage =
        serde_json::from_str(r#"{"action":"updateBlockingStatus","enabled":false}"#).unwrap();
    assert_eq!(
        engine.handle_control_message(&message),
        ControlResponse::Ack { success: true }
    );
    assert!(!engine.is_enabled());

    let response = engine.handle_control_message(&ControlMessage::GetBlockedAttempts);
    assert_eq!(
        serde_json::to_value(response).unwrap(),
        serde_json::json!({ "blockedAttempts": 0 })
    );
}

#[test]
fn reports_queue_until_sink_attached() {
    let (mut engine, _) = engine_at(0);
    assert!(engine.evaluate_timer_code("window.open('//popcash.net')").is_blocked());
    assert_eq!(engine.reporter_stats().pending, 1);

    let sink = CollectingSink::default();
    engine.attach_sink(Box::new(sink.clone()));
    assert_eq!(engine.reporter_stats().pending, 0);
    assert_eq!(sink.0.borrow()[0].kind, ReportKind::TimerBlocked);
}
