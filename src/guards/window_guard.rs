//! `window.open`, `showModalDialog` and `window.focus` guards.

use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;

use super::{forwards, page_context, proxy_helpers, with_engine, SharedEngine};
use crate::engine::{UserActivation, Verdict, WindowOpenRequest};
use crate::error::Result;

/// Stand-in returned for a blocked `window.open`, shaped enough like a
/// closed window that callers poking at it do not throw.
pub fn inert_window() -> std::result::Result<JsValue, JsValue> {
    let stand_in = Object::new();
    Reflect::set(&stand_in, &JsValue::from_str("closed"), &JsValue::TRUE)?;
    for method in ["close", "focus", "blur", "postMessage"] {
        Reflect::set(
            &stand_in,
            &JsValue::from_str(method),
            &proxy_helpers::constant_function(JsValue::UNDEFINED),
        )?;
    }

    let location = Object::new();
    Reflect::set(&location, &JsValue::from_str("href"), &JsValue::from_str("about:blank"))?;
    Reflect::set(&stand_in, &JsValue::from_str("location"), &location)?;

    let document = Object::new();
    for method in ["write", "writeln"] {
        Reflect::set(
            &document,
            &JsValue::from_str(method),
            &proxy_helpers::constant_function(JsValue::UNDEFINED),
        )?;
    }
    Reflect::set(&stand_in, &JsValue::from_str("document"), &document)?;
    Ok(stand_in.into())
}

/// Read `window.open(url, target, features)` the way the browser converts it.
fn open_request(args: &JsValue) -> std::result::Result<WindowOpenRequest, JsValue> {
    Ok(WindowOpenRequest::new(
        proxy_helpers::coerced_arg(args, 0)?,
        proxy_helpers::coerced_arg(args, 1)?,
        proxy_helpers::coerced_arg(args, 2)?,
    ))
}

/// Only an explicit allow reaches the original `window.open`; a busy engine
/// gets the inert stand-in.
pub fn opens_window(verdict: Option<Verdict>) -> bool {
    matches!(verdict, Some(Verdict::Allow))
}

/// Read `navigator.userActivation.isActive`, falling back to the call stack.
fn user_activation() -> UserActivation {
    let is_active = proxy_helpers::get_global_path("navigator.userActivation")
        .and_then(|activation| Reflect::get(&activation, &JsValue::from_str("isActive")).ok())
        .and_then(|active| active.as_bool());
    let stack = if is_active.is_none() {
        let error = js_sys::Error::new("");
        Reflect::get(&error, &JsValue::from_str("stack"))
            .ok()
            .and_then(|stack| stack.as_string())
    } else {
        None
    };
    UserActivation { is_active, stack }
}

pub fn install_new_window(engine: &SharedEngine) -> Result<()> {
    let window: JsValue = proxy_helpers::window()?.into();
    let original = proxy_helpers::get_method(&window, "open")?;
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let request = match open_request(&args) {
                Ok(request) => request,
                Err(err) => {
                    log::debug!("Unreadable window.open arguments: {:?}", err);
                    return Ok(inert_window().unwrap_or(JsValue::NULL));
                }
            };
            let page = page_context();
            let verdict = with_engine(&engine, |engine| engine.evaluate_new_window(&page, &request));
            if !opens_window(verdict) {
                return Ok(inert_window().unwrap_or(JsValue::NULL));
            }
            let args = match &request.url {
                Some(url) => proxy_helpers::replace_arg(&args, 0, url),
                None => args,
            };
            proxy_helpers::call_function(&orig_fn, &this_arg, &args)
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(&window, &JsValue::from_str("open"), &proxied)?;
    Ok(())
}

/// Guard `showModalDialog` where the browser still has it.
pub fn install_modal(engine: &SharedEngine) -> Result<()> {
    let window: JsValue = proxy_helpers::window()?.into();
    let original = Reflect::get(&window, &JsValue::from_str("showModalDialog"))?;
    if !original.is_function() {
        log::debug!("showModalDialog not available; nothing to guard");
        return Ok(());
    }
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let Ok(url) = proxy_helpers::coerced_arg(&args, 0) else {
                return Ok(JsValue::NULL);
            };
            let url = url.unwrap_or_default();
            let verdict = with_engine(&engine, |engine| engine.evaluate_modal(&url));
            if forwards(verdict) {
                proxy_helpers::call_function(&orig_fn, &this_arg, &args)
            } else {
                Ok(JsValue::NULL)
            }
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(&window, &JsValue::from_str("showModalDialog"), &proxied)?;
    Ok(())
}

pub fn install_focus(engine: &SharedEngine) -> Result<()> {
    let window: JsValue = proxy_helpers::window()?.into();
    let original = proxy_helpers::get_method(&window, "focus")?;
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let activation = user_activation();
            let verdict = with_engine(&engine, |engine| engine.evaluate_focus(&activation));
            if forwards(verdict) {
                proxy_helpers::call_function(&orig_fn, &this_arg, &args)
            } else {
                Ok(JsValue::FALSE)
            }
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(&window, &JsValue::from_str("focus"), &proxied)?;
    Ok(())
}
