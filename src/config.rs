//! Guard configuration.
//!
//! Every guard is enabled by default. Thresholds default to the values the
//! extension has always shipped with.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::Result;

/// Configuration for which guards to install and how they decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Initial enabled flag, until the stored flag has been read.
    pub enabled: bool,

    // Guards
    pub new_window: bool,
    pub modal: bool,
    pub focus: bool,
    pub dom_mutation: bool,
    pub overlay_sweep: bool,
    pub frame_source: bool,
    pub content_injection: bool,
    pub form_submission: bool,
    pub event_listener: bool,
    pub timers: bool,
    pub alerts: bool,

    // Thresholds
    pub rapid_fire_window_ms: u64,
    pub overlay_sweep_interval_ms: u32,
    /// Inserted fixed elements above this z-index are removed.
    pub inserted_overlay_min_z_index: i64,
    /// Swept elements above this z-index are overlay-shaped.
    pub sweep_overlay_min_z_index: i64,
    pub viewport_coverage_ratio: f64,
    pub report_prefix_chars: usize,
    pub report_queue_capacity: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            new_window: true,
            modal: true,
            focus: true,
            dom_mutation: true,
            overlay_sweep: true,
            frame_source: true,
            content_injection: true,
            form_submission: true,
            event_listener: true,
            timers: true,
            alerts: true,
            rapid_fire_window_ms: 3_000,
            overlay_sweep_interval_ms: 3_000,
            inserted_overlay_min_z_index: 999,
            sweep_overlay_min_z_index: 100,
            viewport_coverage_ratio: 0.8,
            report_prefix_chars: 200,
            report_queue_capacity: 64,
        }
    }
}

impl GuardConfig {
    /// Read options passed from JavaScript; unreadable options mean defaults.
    pub fn from_js(options: JsValue) -> Self {
        if options.is_undefined() || options.is_null() {
            return Self::default();
        }
        serde_wasm_bindgen::from_value(options).unwrap_or_else(|err| {
            log::warn!("Unreadable guard options, using defaults: {}", err);
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Interpret the stored `blockingEnabled` value.
///
/// Anything other than an explicit `false` (absent, unreadable, not a bool)
/// leaves blocking on.
pub fn stored_enabled_flag(stored: Option<bool>) -> bool {
    stored != Some(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert!(config.enabled);
        assert!(config.new_window && config.dom_mutation && config.event_listener);
        assert_eq!(config.rapid_fire_window_ms, 3_000);
        assert_eq!(config.report_prefix_chars, 200);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GuardConfig::from_json(r#"{ "timers": false, "rapid_fire_window_ms": 500 }"#)
            .unwrap();
        assert!(!config.timers);
        assert!(config.alerts);
        assert_eq!(config.rapid_fire_window_ms, 500);
        assert_eq!(config.overlay_sweep_interval_ms, 3_000);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = GuardConfig::from_json("{ timers: nope").unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Config);
    }

    #[test]
    fn test_stored_enabled_flag() {
        assert!(stored_enabled_flag(None));
        assert!(stored_enabled_flag(Some(true)));
        assert!(!stored_enabled_flag(Some(false)));
    }
}
