//! # PopStop WASM
//!
//! In-page pop-up, overlay and injection guard compiled to WebAssembly.
//!
//! Loaded into every page by the extension's content script, it wraps the
//! page capabilities that ad networks abuse (`window.open`, `focus`,
//! `document.write`, `addEventListener`, form submission, timers, alerts)
//! and watches the DOM for inserted frames and overlays. Each wrapped call is
//! decided by a heuristic engine that scores urls and content against a
//! built-in signature set.
//!
//! ## Architecture
//!
//! ```text
//! Guards (Proxy apply traps, MutationObserver, overlay sweep)
//!   ↓
//! InterceptionEngine ── SiteClassifier
//!   ↓                └─ ThreatScorer ── SignatureStore
//! Reporter
//!   ↓
//! chrome.runtime.sendMessage → Control Surface (background worker)
//! ```
//!
//! Everything below the guards is plain Rust and runs natively in tests.

use wasm_bindgen::prelude::*;

pub mod classifier;
pub mod config;
pub mod control;
pub mod engine;
mod error;
pub mod guards;
pub mod reporter;
pub mod scorer;
pub mod signatures;
pub mod state;
pub mod time;

pub use classifier::{SiteCategory, SiteClass, SiteClassifier};
pub use config::GuardConfig;
pub use control::{ControlMessage, ControlResponse, ControlSurface};
pub use engine::{
    BlockReason, ElementAction, ElementSnapshot, InterceptionEngine, ListenerPolicy, PageContext,
    UserActivation, Verdict, WindowFeatures, WindowOpenRequest,
};
pub use error::{ErrorCategory, ErrorCode, ErrorInfo, GuardError, Result};
pub use guards::{
    assess_url, blocked_attempts, install_guards, is_enabled, set_enabled, take_pending_reports,
};
pub use reporter::{Report, ReportChannel, ReportKind, ReportSink, Reporter, ReporterStats};
pub use scorer::{ReasonTag, RiskLevel, ThreatAssessment, ThreatScorer};
pub use signatures::SignatureStore;
pub use state::InterceptionState;
pub use time::{Clock, ManualClock, SystemClock};

/// Module entry point: sets up logging.
#[wasm_bindgen(start)]
pub fn init() {
    // A second init (e.g. a re-injected content script) keeps the first logger.
    let _ = console_log::init_with_level(log::Level::Info);

    log::info!("PopStop guard module loaded");
}
