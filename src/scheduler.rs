//! Marshalling updates from background tasks onto the UI thread.

use std::time::Duration;

use eframe::egui::{self, ColorImage};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::model::{DownloadOutcome, MediaInfo, ProgressSample, RequestId};

/// Colour family of the status line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    /// Idle or finished fine
    Success,
    /// Fetching metadata
    Working,
    Downloading,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

impl StatusLine {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self { text: text.into(), tone }
    }
}

/// A mutation of UI state, applied on the UI thread in arrival order
pub enum UiEvent {
    Status(StatusLine),
    Media(MediaInfo),
    /// Decoded preview for the given request; may arrive late
    Thumbnail(RequestId, ColorImage),
    Progress(ProgressSample),
    Finished(DownloadOutcome),
    /// Re-enable the download buttons
    Unlock,
    /// Zero the progress bar after the given request completed
    ResetProgress(RequestId),
}

/// Thread-safe handle for queueing `UiEvent`s.
///
/// Sends never block. If the UI side has gone away the event is dropped.
#[derive(Clone)]
pub struct UiScheduler {
    tx: UnboundedSender<UiEvent>,
    repaint: Option<egui::Context>,
}

impl UiScheduler {
    /// Scheduler that wakes the egui loop whenever something is queued.
    pub fn new(ctx: egui::Context) -> (Self, UnboundedReceiver<UiEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx, repaint: Some(ctx) }, rx)
    }

    /// Scheduler without a window attached; the receiver is polled manually.
    #[cfg(test)]
    pub fn detached() -> (Self, UnboundedReceiver<UiEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx, repaint: None }, rx)
    }

    pub fn schedule(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            log::trace!("ui receiver closed, update dropped");
            return;
        }
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
    }

    /// Queues `event` once `delay` has elapsed. Must be called from within the runtime.
    pub fn schedule_after(&self, delay: Duration, event: UiEvent) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.schedule(event);
        });
    }
}
