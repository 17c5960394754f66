//! Control Surface model and control-message protocol.
//!
//! The real Control Surface (persisted storage, badge, popup UI) lives in the
//! extension's background worker. This module holds the pieces the core
//! shares with it: the inbound message shapes and an in-memory model of the
//! enabled flag and block counter that doubles as a report sink.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reporter::{Report, ReportSink};

/// Messages pushed to the page by the background worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    UpdateBlockingStatus { enabled: bool },
    GetBlockedAttempts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Ack {
        success: bool,
    },
    BlockedAttempts {
        #[serde(rename = "blockedAttempts")]
        blocked_attempts: u32,
    },
}

/// Enabled flag plus a block counter that only grows until reset.
#[derive(Debug)]
pub struct ControlSurface {
    enabled: Cell<bool>,
    blocked_count: Cell<u64>,
}

impl ControlSurface {
    pub fn new() -> Self {
        Self::from_stored(None, None)
    }

    /// Restore from persisted values; a missing flag means enabled.
    pub fn from_stored(enabled: Option<bool>, blocked_count: Option<u64>) -> Self {
        Self {
            enabled: Cell::new(crate::config::stored_enabled_flag(enabled)),
            blocked_count: Cell::new(blocked_count.unwrap_or(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn toggle(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn reset(&self) {
        self.blocked_count.set(0);
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked_count.get()
    }

    pub fn record(&self, report: &Report) {
        if report.kind.is_block() {
            self.blocked_count
                .set(self.blocked_count.get().saturating_add(1));
        }
    }

    /// Badge text: empty at zero, capped at "99+".
    pub fn badge_text(&self) -> String {
        match self.blocked_count.get() {
            0 => String::new(),
            n if n > 99 => "99+".to_string(),
            n => n.to_string(),
        }
    }

    /// The message that mirrors the current flag into a page.
    pub fn status_message(&self) -> ControlMessage {
        ControlMessage::UpdateBlockingStatus {
            enabled: self.is_enabled(),
        }
    }
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for Rc<ControlSurface> {
    fn deliver(&self, report: &Report) -> Result<()> {
        self.record(report);
        Ok(())
    }
}
