//! `HTMLFormElement.prototype.submit` guard.

use js_sys::Reflect;
use wasm_bindgen::prelude::*;

use super::{forwards, page_context, proxy_helpers, with_engine, PageSource, SharedEngine};
use crate::error::Result;

pub fn install(engine: &SharedEngine) -> Result<()> {
    install_with_page(engine, page_context)
}

/// Guard `submit`, reading the page from `page` at every call.
pub fn install_with_page(engine: &SharedEngine, page: PageSource) -> Result<()> {
    let proto = proxy_helpers::get_prototype("HTMLFormElement")?;
    let original = proxy_helpers::get_method(&proto, "submit")?;
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, form: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let action = Reflect::get(&form, &JsValue::from_str("action"))
                .ok()
                .and_then(|action| action.as_string())
                .filter(|action| !action.is_empty());
            let page = page();
            let verdict = with_engine(&engine, |engine| {
                engine.evaluate_form_submission(&page, action.as_deref())
            });
            if forwards(verdict) {
                proxy_helpers::call_function(&orig_fn, &form, &args)
            } else {
                Ok(JsValue::FALSE)
            }
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(&proto, &JsValue::from_str("submit"), &proxied)?;
    Ok(())
}
