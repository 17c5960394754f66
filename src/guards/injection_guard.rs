//! `document.write`/`writeln`, string `setTimeout` and `alert` guards.
//!
//! Non-string arguments are never inspected and always forwarded.

use js_sys::Reflect;
use wasm_bindgen::prelude::*;

use super::{forwards, proxy_helpers, with_engine, SharedEngine};
use crate::engine::{InterceptionEngine, Verdict};
use crate::error::Result;

type Decide = fn(&mut InterceptionEngine, &str) -> Verdict;

/// Guard `obj[name]`: string first arguments go through `decide`, and a
/// blocked call returns `blocked` instead of reaching the original.
fn guard_string_call(
    obj: &JsValue,
    name: &str,
    engine: &SharedEngine,
    decide: Decide,
    blocked: JsValue,
) -> Result<()> {
    let original = proxy_helpers::get_method(obj, name)?;
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let verdict = proxy_helpers::string_arg(&args, 0)
                .and_then(|text| with_engine(&engine, |engine| decide(engine, &text)));
            if forwards(verdict) {
                proxy_helpers::call_function(&orig_fn, &this_arg, &args)
            } else {
                Ok(blocked.clone())
            }
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(obj, &JsValue::from_str(name), &proxied)?;
    Ok(())
}

pub fn install_document_write(engine: &SharedEngine) -> Result<()> {
    let document: JsValue = proxy_helpers::document()?.into();
    for name in ["write", "writeln"] {
        guard_string_call(
            &document,
            name,
            engine,
            InterceptionEngine::evaluate_content_injection,
            JsValue::UNDEFINED,
        )?;
    }
    Ok(())
}

/// Refuse string-form timers that open windows; the page gets timer id 0.
pub fn install_timers(engine: &SharedEngine) -> Result<()> {
    let window: JsValue = proxy_helpers::window()?.into();
    guard_string_call(
        &window,
        "setTimeout",
        engine,
        InterceptionEngine::evaluate_timer_code,
        JsValue::from_f64(0.0),
    )
}

pub fn install_alerts(engine: &SharedEngine) -> Result<()> {
    let window: JsValue = proxy_helpers::window()?.into();
    guard_string_call(
        &window,
        "alert",
        engine,
        InterceptionEngine::evaluate_alert,
        JsValue::UNDEFINED,
    )
}
