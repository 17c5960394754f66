//! Event Reporter
//!
//! One-way report channel from the engine to the Control Surface.
//!
//! - With a sink attached, each report is delivered immediately. A delivery
//!   failure drops the report; there is no retry.
//! - Without a sink, reports wait in a bounded queue. When the queue is full
//!   new reports are dropped.
//!
//! Emitting never fails and never blocks.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::BlockReason;
use crate::error::{GuardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    NewWindowBlocked,
    ModalBlocked,
    OverlayRemoved,
    ContentInjectionBlocked,
    FormBlocked,
    ListenerBlocked,
    ElementBlocked,
    TimerBlocked,
    AlertBlocked,
    UnsafeSiteDetected,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::NewWindowBlocked => "new-window-blocked",
            ReportKind::ModalBlocked => "modal-blocked",
            ReportKind::OverlayRemoved => "overlay-removed",
            ReportKind::ContentInjectionBlocked => "content-injection-blocked",
            ReportKind::FormBlocked => "form-blocked",
            ReportKind::ListenerBlocked => "listener-blocked",
            ReportKind::ElementBlocked => "element-blocked",
            ReportKind::TimerBlocked => "timer-blocked",
            ReportKind::AlertBlocked => "alert-blocked",
            ReportKind::UnsafeSiteDetected => "unsafe-site-detected",
        }
    }

    /// Action name understood by the background worker.
    pub fn action(&self) -> &'static str {
        match self {
            ReportKind::OverlayRemoved => "overlayRemoved",
            ReportKind::ContentInjectionBlocked => "documentWriteBlocked",
            ReportKind::UnsafeSiteDetected => "unsafeWebsiteDetected",
            _ => "popupBlocked",
        }
    }

    /// Whether the Control Surface counts this report as a block.
    pub fn is_block(&self) -> bool {
        !matches!(self, ReportKind::UnsafeSiteDetected)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub kind: ReportKind,
    pub detail: String,
    pub reason: Option<BlockReason>,
    pub timestamp_ms: u64,
}

/// Wire shape sent to the background worker.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage<'a> {
    pub action: &'static str,
    pub kind: ReportKind,
    pub detail: &'a str,
    pub source: Option<&'static str>,
}

impl Report {
    pub fn to_message(&self) -> OutboundMessage<'_> {
        OutboundMessage {
            action: self.kind.action(),
            kind: self.kind,
            detail: &self.detail,
            source: self.reason.map(|r| r.as_str()),
        }
    }
}

/// Destination for reports. Implementations must not block.
pub trait ReportSink {
    fn deliver(&self, report: &Report) -> Result<()>;
}

/// Bounded FIFO; full means drop the newcomer.
#[derive(Debug)]
pub struct ReportChannel {
    queue: VecDeque<Report>,
    capacity: usize,
    dropped: u64,
}

impl ReportChannel {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, report: Report) -> Result<()> {
        if self.queue.len() >= self.capacity {
            self.dropped += 1;
            return Err(GuardError::ChannelFull(self.queue.len()));
        }
        self.queue.push_back(report);
        Ok(())
    }

    pub fn drain(&mut self) -> Vec<Report> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReporterStats {
    pub emitted: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
    pub pending: usize,
}

pub struct Reporter {
    channel: ReportChannel,
    sink: Option<Box<dyn ReportSink>>,
    emitted: u64,
    delivered: u64,
    failed: u64,
}

impl Reporter {
    pub fn new(capacity: usize) -> Self {
        Self {
            channel: ReportChannel::with_capacity(capacity),
            sink: None,
            emitted: 0,
            delivered: 0,
            failed: 0,
        }
    }

    /// Attach a sink and hand it whatever queued up before it existed.
    pub fn attach_sink(&mut self, sink: Box<dyn ReportSink>) {
        for report in self.channel.drain() {
            self.deliver_to(sink.as_ref(), &report);
        }
        self.sink = Some(sink);
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn emit(&mut self, report: Report) {
        self.emitted += 1;
        match self.sink.take() {
            Some(sink) => {
                self.deliver_to(sink.as_ref(), &report);
                self.sink = Some(sink);
            }
            None => {
                if let Err(err) = self.channel.push(report) {
                    log::debug!("Report dropped: {}", err);
                }
            }
        }
    }

    fn deliver_to(&mut self, sink: &dyn ReportSink, report: &Report) {
        match sink.deliver(report) {
            Ok(()) => self.delivered += 1,
            Err(err) => {
                self.failed += 1;
                log::debug!("Could not deliver {} report: {}", report.kind, err);
            }
        }
    }

    /// Reports still waiting for a sink.
    pub fn take_pending(&mut self) -> Vec<Report> {
        self.channel.drain()
    }

    pub fn stats(&self) -> ReporterStats {
        ReporterStats {
            emitted: self.emitted,
            delivered: self.delivered,
            failed: self.failed,
            dropped: self.channel.dropped(),
            pending: self.channel.len(),
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("has_sink", &self.has_sink())
            .field("stats", &self.stats())
            .finish()
    }
}
