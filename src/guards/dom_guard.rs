//! DOM mutation guard
//!
//! Three pieces share the engine:
//! - a `MutationObserver` on the document element that removes suspicious
//!   frames/scripts and high-z-index fixed overlays as they are inserted;
//! - a periodic sweep over [`OVERLAY_SELECTORS`] removing overlay-shaped
//!   elements that slipped in some other way;
//! - a guarded `src` setter on every `<iframe>` made by `document.createElement`.

use gloo_timers::callback::Interval;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord, Node};

use super::{forwards, proxy_helpers, with_engine, SharedEngine};
use crate::engine::{ElementAction, ElementSnapshot, OVERLAY_SELECTORS};
use crate::error::{GuardError, Result};

/// Read what the engine needs from a live element.
fn snapshot(window: &web_sys::Window, element: &Element) -> ElementSnapshot {
    let tag_name = element.tag_name().to_uppercase();
    let src = element
        .get_attribute("src")
        .or_else(|| {
            Reflect::get(element, &JsValue::from_str("src"))
                .ok()
                .and_then(|src| src.as_string())
        })
        .filter(|src| !src.is_empty());

    let class_name = element.class_name();
    let identity = if class_name.is_empty() {
        element.id()
    } else {
        class_name
    };

    let (position, z_index) = match window.get_computed_style(element) {
        Ok(Some(style)) => (
            style.get_property_value("position").unwrap_or_default(),
            style
                .get_property_value("z-index")
                .ok()
                .and_then(|z| z.trim().parse::<i64>().ok()),
        ),
        _ => (String::new(), None),
    };

    let rect = element.get_bounding_client_rect();
    let viewport_width = window.inner_width().ok().and_then(|w| w.as_f64()).unwrap_or(0.0);
    let viewport_height = window.inner_height().ok().and_then(|h| h.as_f64()).unwrap_or(0.0);

    ElementSnapshot {
        tag_name,
        src,
        identity,
        position,
        z_index,
        width: rect.width(),
        height: rect.height(),
        viewport_width,
        viewport_height,
    }
}

fn remove_if(element: &Element, action: ElementAction) {
    if action.is_remove() {
        element.remove();
    }
}

/// Start watching the document for inserted elements.
pub fn observe_insertions(engine: &SharedEngine) -> Result<()> {
    let window = proxy_helpers::window()?;
    let root = proxy_helpers::document()?
        .document_element()
        .ok_or_else(|| GuardError::missing("document.documentElement"))?;

    let engine = engine.clone();
    let observer_window = window;
    let callback = Closure::wrap(Box::new(move |records: Array, _observer: MutationObserver| {
        // computed style and layout are only read while blocking is on
        if !with_engine(&engine, |engine| engine.is_enabled()).unwrap_or(false) {
            return;
        }
        for record in records.iter() {
            let record: MutationRecord = record.unchecked_into();
            let added = record.added_nodes();
            for i in 0..added.length() {
                let Some(node) = added.get(i) else { continue };
                if node.node_type() != Node::ELEMENT_NODE {
                    continue;
                }
                let element: Element = node.unchecked_into();
                let element_snapshot = snapshot(&observer_window, &element);
                if let Some(action) =
                    with_engine(&engine, |engine| engine.evaluate_inserted_element(&element_snapshot))
                {
                    remove_if(&element, action);
                }
            }
        }
    }) as Box<dyn FnMut(Array, MutationObserver)>);

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer.observe_with_options(&root, &init)?;
    callback.forget();
    Ok(())
}

/// Run one overlay sweep over the current document.
pub fn sweep_overlays(engine: &SharedEngine) -> Result<usize> {
    if !with_engine(engine, |engine| engine.is_enabled()).unwrap_or(false) {
        return Ok(0);
    }
    let window = proxy_helpers::window()?;
    let document = proxy_helpers::document()?;

    let mut removed = 0;
    for selector in OVERLAY_SELECTORS {
        let Ok(matches) = document.query_selector_all(selector) else {
            continue;
        };
        for i in 0..matches.length() {
            let Some(node) = matches.get(i) else { continue };
            let element: Element = node.unchecked_into();
            // earlier selectors may already have removed it
            if !element.is_connected() {
                continue;
            }
            let element_snapshot = snapshot(&window, &element);
            if let Some(action) = with_engine(engine, |engine| engine.evaluate_overlay(&element_snapshot)) {
                if action.is_remove() {
                    removed += 1;
                }
                remove_if(&element, action);
            }
        }
    }
    Ok(removed)
}

/// Sweep every `interval_ms` for the lifetime of the page.
pub fn start_overlay_sweep(engine: &SharedEngine, interval_ms: u32) -> Result<()> {
    let engine = engine.clone();
    Interval::new(interval_ms, move || {
        if let Err(err) = sweep_overlays(&engine) {
            log::debug!("Overlay sweep failed: {}", err);
        }
    })
    .forget();
    Ok(())
}

/// Give every `<iframe>` from `document.createElement` a guarded `src` setter.
pub fn install_frame_source(engine: &SharedEngine) -> Result<()> {
    let document: JsValue = proxy_helpers::document()?.into();
    let descriptor = proxy_helpers::get_prototype("HTMLIFrameElement")
        .ok()
        .and_then(|proto| proxy_helpers::own_property_descriptor(&proto, "src"))
        .ok_or_else(|| GuardError::missing("HTMLIFrameElement.prototype.src"))?;
    let native_get: Function = Reflect::get(&descriptor, &JsValue::from_str("get"))?.unchecked_into();
    let native_set: Function = Reflect::get(&descriptor, &JsValue::from_str("set"))?.unchecked_into();

    let original = proxy_helpers::get_method(&document, "createElement")?;
    let orig_fn = original.clone();
    let engine = engine.clone();

    let apply_trap = Closure::wrap(Box::new(
        move |_target: JsValue, this_arg: JsValue, args: JsValue| -> std::result::Result<JsValue, JsValue> {
            let element = proxy_helpers::call_function(&orig_fn, &this_arg, &args)?;
            let is_iframe = proxy_helpers::string_arg(&args, 0)
                .map(|tag| tag.eq_ignore_ascii_case("iframe"))
                .unwrap_or(false);
            let enabled = with_engine(&engine, |engine| engine.is_enabled()).unwrap_or(false);
            if is_iframe && enabled {
                if let Err(err) = guard_frame_src(&element, &engine, &native_get, &native_set) {
                    log::debug!("Could not guard iframe src: {:?}", err);
                }
            }
            Ok(element)
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> std::result::Result<JsValue, JsValue>>);

    let proxied = proxy_helpers::proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(&document, &JsValue::from_str("createElement"), &proxied)?;
    Ok(())
}

fn guard_frame_src(
    frame: &JsValue,
    engine: &SharedEngine,
    native_get: &Function,
    native_set: &Function,
) -> std::result::Result<(), JsValue> {
    // Accessor closures never see `this`, so both sides are bound to the frame.
    let bound_get = native_get.bind(frame);
    let getter = Closure::wrap(Box::new(move || -> std::result::Result<JsValue, JsValue> {
        bound_get.call0(&JsValue::UNDEFINED)
    }) as Box<dyn FnMut() -> std::result::Result<JsValue, JsValue>>)
    .into_js_value();

    let bound_set = native_set.bind(frame);
    let engine = engine.clone();
    let setter = Closure::wrap(Box::new(move |value: JsValue| -> std::result::Result<JsValue, JsValue> {
        let url = proxy_helpers::coerce_string(&value)?;
        let judged = url.as_deref().unwrap_or_default();
        let verdict = with_engine(&engine, |engine| engine.evaluate_frame_source(judged));
        if !forwards(verdict) {
            return Ok(JsValue::UNDEFINED);
        }
        match url {
            Some(url) => bound_set.call1(&JsValue::UNDEFINED, &JsValue::from_str(&url)),
            None => bound_set.call1(&JsValue::UNDEFINED, &value),
        }
    }) as Box<dyn FnMut(JsValue) -> std::result::Result<JsValue, JsValue>>)
    .into_js_value();

    proxy_helpers::define_accessor(frame, "src", getter.unchecked_ref(), setter.unchecked_ref())?;
    Ok(())
}
