//! Browser guards
//!
//! Each guard puts a `Proxy` in front of one page capability. The proxy's
//! `apply` trap snapshots the call into plain Rust values, asks the shared
//! [`InterceptionEngine`] for a verdict, releases the engine, and then either
//! forwards to the original capability or returns that guard's safe result.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { install_guards, set_enabled } from './pkg/popstop_wasm.js';
//! await init();
//! install_guards();                                  // every guard
//! install_guards({ timers: false, alerts: false });  // selective
//! ```
//!
//! A guard that fails to install is logged and skipped; the page keeps the
//! original capability.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

use crate::config::GuardConfig;
use crate::engine::{InterceptionEngine, PageContext, Verdict};
use crate::error::{GuardError, Result};
use crate::scorer::ThreatScorer;

pub mod dom_guard;
pub mod form_guard;
pub mod injection_guard;
pub mod listener_guard;
pub mod messaging;
pub mod proxy_helpers;
pub mod window_guard;

/// The engine as shared between guard closures.
pub type SharedEngine = Rc<RefCell<InterceptionEngine>>;

thread_local! {
    static ENGINE: RefCell<Option<SharedEngine>> = RefCell::new(None);
}

/// Run `f` against the engine unless it is already borrowed.
///
/// A re-entrant call (a guarded capability invoked from inside another
/// guard's decision) gets `None` and must fall back to its safe default.
pub fn with_engine<T>(
    engine: &SharedEngine,
    f: impl FnOnce(&mut InterceptionEngine) -> T,
) -> Option<T> {
    match engine.try_borrow_mut() {
        Ok(mut engine) => Some(f(&mut engine)),
        Err(_) => {
            log::debug!("{}", GuardError::EngineBusy);
            None
        }
    }
}

/// Whether a non-window guard calls through to the original capability.
///
/// Only an explicit block stops the call; a busy engine (`None`) forwards.
pub fn forwards(verdict: Option<Verdict>) -> bool {
    !matches!(verdict, Some(Verdict::Block(_)))
}

/// Where a guard reads the page it runs on.
pub type PageSource = fn() -> PageContext;

/// The engine installed on this page, if any.
pub fn installed_engine() -> Option<SharedEngine> {
    ENGINE.with(|slot| slot.borrow().clone())
}

/// Snapshot of the current page's href, host and title.
pub fn page_context() -> PageContext {
    let Ok(window) = proxy_helpers::window() else {
        return PageContext::default();
    };
    let location = window.location();
    let href = location.href().unwrap_or_default();
    let host = location.hostname().unwrap_or_default();
    let title = window.document().map(|d| d.title()).unwrap_or_default();
    PageContext::new(href, &host, title)
}

/// Install the guards selected by `options`.
///
/// Returns `{ applied: string[], count: number }`. Installing twice is a
/// no-op that returns an empty list.
#[wasm_bindgen]
pub fn install_guards(options: JsValue) -> std::result::Result<JsValue, JsValue> {
    if installed_engine().is_some() {
        log::warn!("Guards already installed on this page");
        return Ok(applied_object(&[])?);
    }

    let config = GuardConfig::from_js(options);
    let engine: SharedEngine = Rc::new(RefCell::new(InterceptionEngine::new(config.clone())));

    match messaging::RuntimeMessageSink::detect() {
        Some(sink) => engine.borrow_mut().attach_sink(Box::new(sink)),
        None => log::debug!("No extension runtime; reports stay queued"),
    }
    if let Err(err) = messaging::listen_for_control(&engine) {
        log::debug!("Control messages unavailable: {}", err);
    }
    messaging::load_enabled_flag(&engine);

    let page = page_context();
    engine.borrow_mut().inspect_page(&page);

    let mut applied: Vec<&str> = Vec::new();
    let mut install = |name: &'static str, wanted: bool, result: &dyn Fn() -> Result<()>| {
        if !wanted {
            return;
        }
        match result() {
            Ok(()) => applied.push(name),
            Err(err) => log::warn!("Could not install {} guard: {}", name, err),
        }
    };

    install("newWindow", config.new_window, &|| window_guard::install_new_window(&engine));
    install("modal", config.modal, &|| window_guard::install_modal(&engine));
    install("focus", config.focus, &|| window_guard::install_focus(&engine));
    install("domMutation", config.dom_mutation, &|| dom_guard::observe_insertions(&engine));
    install("overlaySweep", config.overlay_sweep, &|| {
        dom_guard::start_overlay_sweep(&engine, config.overlay_sweep_interval_ms)
    });
    install("frameSource", config.frame_source, &|| dom_guard::install_frame_source(&engine));
    install("contentInjection", config.content_injection, &|| {
        injection_guard::install_document_write(&engine)
    });
    install("formSubmission", config.form_submission, &|| form_guard::install(&engine));
    install("eventListener", config.event_listener, &|| listener_guard::install(&engine));
    install("timers", config.timers, &|| injection_guard::install_timers(&engine));
    install("alerts", config.alerts, &|| injection_guard::install_alerts(&engine));

    log::info!("🛡️ Installed {} guards on {}", applied.len(), page.host);
    ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));

    Ok(applied_object(&applied)?)
}

fn applied_object(applied: &[&str]) -> Result<JsValue> {
    let result = Object::new();
    let applied_arr = Array::new();
    for name in applied {
        applied_arr.push(&JsValue::from_str(name));
    }
    Reflect::set(&result, &JsValue::from_str("applied"), &applied_arr)?;
    Reflect::set(
        &result,
        &JsValue::from_str("count"),
        &JsValue::from_f64(applied.len() as f64),
    )?;
    Ok(result.into())
}

/// Turn blocking on or off for every later decision.
#[wasm_bindgen]
pub fn set_enabled(enabled: bool) {
    if let Some(engine) = installed_engine() {
        with_engine(&engine, |engine| engine.set_enabled(enabled));
    }
}

/// Whether blocking is on. False before `install_guards`.
#[wasm_bindgen]
pub fn is_enabled() -> bool {
    installed_engine()
        .and_then(|engine| with_engine(&engine, |engine| engine.is_enabled()))
        .unwrap_or(false)
}

#[wasm_bindgen]
pub fn blocked_attempts() -> u32 {
    installed_engine()
        .and_then(|engine| with_engine(&engine, |engine| engine.blocked_attempts()))
        .unwrap_or(0)
}

/// Reports queued because no extension runtime was available to receive them.
#[wasm_bindgen]
pub fn take_pending_reports() -> std::result::Result<JsValue, JsValue> {
    let reports = installed_engine()
        .and_then(|engine| with_engine(&engine, |engine| engine.take_pending_reports()))
        .unwrap_or_default();
    Ok(serde_wasm_bindgen::to_value(&reports)?)
}

/// Score a url (and optional page content) without installing anything.
#[wasm_bindgen]
pub fn assess_url(url: &str, content: Option<String>) -> std::result::Result<JsValue, JsValue> {
    let content = content.unwrap_or_default();
    let assessment = match installed_engine() {
        Some(engine) => with_engine(&engine, |engine| engine.assess(url, &content)),
        None => None,
    }
    .unwrap_or_else(|| ThreatScorer::default().score(url, &content));
    Ok(serde_wasm_bindgen::to_value(&assessment)?)
}
