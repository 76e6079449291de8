//! Progress event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ProgressBus`] is the process-wide subscriber registry for pipeline
//! progress: observers may subscribe and unsubscribe (by dropping the
//! receiver) concurrently with delivery. Shared via `Arc<ProgressBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use reelsmith_core::project::PipelineStage;

// ---------------------------------------------------------------------------
// ProgressEvent
// ---------------------------------------------------------------------------

/// One progress update from a pipeline run.
///
/// Within a stage, `fraction` values published by the pipeline are
/// monotonically non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: PipelineStage,

    /// Completion fraction for the stage, `0.0..=1.0`.
    pub fraction: f64,

    /// Human-readable status line.
    pub message: String,

    /// Item counter within the stage (e.g. scenes captured so far).
    pub current_item: usize,

    /// Total items in the stage, `0` when the stage has no item granularity.
    pub total_items: usize,

    /// Failure message, set only on the terminal failure event.
    pub error: Option<String>,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create an event with no item counters and no error.
    pub fn new(stage: PipelineStage, fraction: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            fraction,
            message: message.into(),
            current_item: 0,
            total_items: 0,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach item counters.
    pub fn with_items(mut self, current_item: usize, total_items: usize) -> Self {
        self.current_item = current_item;
        self.total_items = total_items;
        self
    }

    /// Attach a failure message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ProgressBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`ProgressEvent`]s.
///
/// Wraps a [`broadcast::Sender`] so any number of observers independently
/// receive every published event. Publishing never fails; with zero
/// subscribers the event is simply dropped.
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: ProgressEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
