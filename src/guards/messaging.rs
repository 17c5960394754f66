//! Extension messaging: outbound reports, inbound control, stored flag.

use js_sys::{Array, Function, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};

use super::{proxy_helpers, with_engine, SharedEngine};
use crate::config::stored_enabled_flag;
use crate::control::ControlMessage;
use crate::error::{GuardError, Result};
use crate::reporter::{Report, ReportSink};

const STORAGE_KEY: &str = "blockingEnabled";

/// Delivers reports with `chrome.runtime.sendMessage`, fire-and-forget.
pub struct RuntimeMessageSink {
    runtime: JsValue,
    send: Function,
    swallow: Closure<dyn FnMut(JsValue)>,
}

impl RuntimeMessageSink {
    /// The sink for this page, when running inside an extension.
    pub fn detect() -> Option<Self> {
        let runtime = proxy_helpers::get_global_path("chrome.runtime")?;
        let send = Reflect::get(&runtime, &JsValue::from_str("sendMessage"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        let swallow = Closure::wrap(Box::new(|err: JsValue| {
            log::debug!("Could not communicate with background script: {:?}", err);
        }) as Box<dyn FnMut(JsValue)>);
        Some(Self {
            runtime,
            send,
            swallow,
        })
    }
}

impl ReportSink for RuntimeMessageSink {
    fn deliver(&self, report: &Report) -> Result<()> {
        let message = serde_wasm_bindgen::to_value(&report.to_message())
            .map_err(|err| GuardError::Transport(err.to_string()))?;
        let sent = self
            .send
            .call1(&self.runtime, &message)
            .map_err(|err| GuardError::Transport(format!("{:?}", err)))?;
        if let Some(promise) = sent.dyn_ref::<Promise>() {
            let _ = promise.catch(&self.swallow);
        }
        Ok(())
    }
}

/// Answer `updateBlockingStatus` and `getBlockedAttempts` from the background worker.
pub fn listen_for_control(engine: &SharedEngine) -> Result<()> {
    let on_message = proxy_helpers::get_global_path("chrome.runtime.onMessage")
        .ok_or_else(|| GuardError::missing("chrome.runtime.onMessage"))?;
    let add_listener: Function = proxy_helpers::get_method(&on_message, "addListener")?.unchecked_into();

    let engine = engine.clone();
    let listener = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: JsValue| -> JsValue {
            let Ok(message) = serde_wasm_bindgen::from_value::<ControlMessage>(message) else {
                return JsValue::FALSE;
            };
            let Some(response) = with_engine(&engine, |engine| engine.handle_control_message(&message))
            else {
                return JsValue::FALSE;
            };
            if let (Ok(response), Some(send_response)) = (
                serde_wasm_bindgen::to_value(&response),
                send_response.dyn_ref::<Function>(),
            ) {
                let _ = send_response.call1(&JsValue::UNDEFINED, &response);
            }
            JsValue::TRUE
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

    add_listener.call1(&on_message, listener.as_ref())?;
    listener.forget();
    Ok(())
}

/// Read `blockingEnabled` from `chrome.storage.sync` and apply it when it arrives.
///
/// Absence, a non-bool value or a failed read all mean enabled.
pub fn load_enabled_flag(engine: &SharedEngine) {
    let engine = engine.clone();
    spawn_local(async move {
        let stored = match read_stored_flag().await {
            Ok(stored) => stored,
            Err(err) => {
                log::debug!("Could not load blocking status, using default (enabled): {}", err);
                None
            }
        };
        let enabled = stored_enabled_flag(stored);
        with_engine(&engine, |engine| engine.set_enabled(enabled));
    });
}

async fn read_stored_flag() -> Result<Option<bool>> {
    let sync = proxy_helpers::get_global_path("chrome.storage.sync")
        .ok_or(GuardError::TransportUnavailable)?;
    let get: Function = proxy_helpers::get_method(&sync, "get")?.unchecked_into();
    let keys = Array::of1(&JsValue::from_str(STORAGE_KEY));
    let pending = get.call1(&sync, &keys)?;
    let promise: Promise = pending
        .dyn_into()
        .map_err(|_| GuardError::Transport("storage.get did not return a promise".into()))?;
    let items = JsFuture::from(promise).await?;
    Ok(Reflect::get(&items, &JsValue::from_str(STORAGE_KEY))?.as_bool())
}
