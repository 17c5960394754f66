//! `EventTarget.prototype.addEventListener` guard.
//!
//! Only page-exit events on known pop-up hosts are inspected; the listener is
//! judged by its source text.

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::{forwards, page_context, proxy_helpers, with_engine, PageSource, SharedEngine};
use crate::error::Result;

/// Source text of a listener: a function, or an object's `handleEvent`.
fn listener_source(listener: &JsValue) -> String {
    let function = if listener.is_function() {
        Some(listener.clone())
    } else if listener.is_object() {
        Reflect::get(listener, &JsValue::from_str("handleEvent"))
            .ok()
            .filter(|handler| handler.is_function())
    } else {
        None
    };
    function
        .and_then(|f| f.unchecked_ref::<Function>().to_string().as_string())
        .unwrap_or_default()
}

pub fn install(engine: &SharedEngine) -> Result<()> {
    install_with_page(engine, page_context)
}

pub fn install_with_page(engine: &SharedEngine, page: PageSource) -> Result<()> {
    let proto = proxy_helpers::get_prototype("EventTarget")?;
    let original = proxy_helpers::get_method(&proto, "addEventListener")?;
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let event_type = proxy_helpers::string_arg(&args, 0).unwrap_or_default();
            let listener = args.unchecked_ref::<Array>().get(1);

            let watched = with_engine(&engine, |engine| {
                engine.listener_policy().watches_event(&event_type)
            })
            .unwrap_or(false);
            if watched {
                let source = listener_source(&listener);
                let page = page();
                let verdict =
                    with_engine(&engine, |engine| engine.evaluate_listener(&page, &event_type, &source));
                if !forwards(verdict) {
                    return Ok(JsValue::UNDEFINED);
                }
            }
            proxy_helpers::call_function(&orig_fn, &this_arg, &args)
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(&proto, &JsValue::from_str("addEventListener"), &proxied)?;
    Ok(())
}
