//! # Progress Notifications
//!
//! The remote job reports its state while it runs. Each report becomes a
//! [`ProgressEvent`] handed to a [`ProgressObserver`]. Observers must be
//! `Send + Sync`: the polling future may run on any runtime worker thread.
//! Every event is delivered before `UpscaleClient::submit` resolves.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;

/// Coarse stage of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    Queued,
    InProgress,
    Completed,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Queued => "queued",
            ProgressStage::InProgress => "in_progress",
            ProgressStage::Completed => "completed",
        }
    }

    /// Fraction shown by a progress bar. Log messages carry no quantitative
    /// information, so this only distinguishes the three stages.
    pub fn coarse_fraction(&self) -> f32 {
        match self {
            ProgressStage::Queued => 0.0,
            ProgressStage::InProgress => 0.5,
            ProgressStage::Completed => 1.0,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn queued(position: Option<u64>) -> Self {
        match position {
            Some(position) => Self::new(ProgressStage::Queued, format!("queue position {}", position)),
            None => Self::new(ProgressStage::Queued, "queued"),
        }
    }

    pub fn in_progress(message: impl Into<String>) -> Self {
        Self::new(ProgressStage::InProgress, message)
    }

    pub fn completed() -> Self {
        Self::new(ProgressStage::Completed, "completed")
    }
}

/// Receives progress notifications of a running job.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _event: ProgressEvent) {}
}

/// Observer that forwards events into an unbounded channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
