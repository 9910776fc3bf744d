//! Messages into and out of the pipeline

use aroundme_eye::EnrichedDetection;
use aroundme_spk::{AlertMode, HapticPattern};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parsed voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceIntent {
    SwitchToContinuous,
    SwitchToNormal,
    RequestScan,
    RequestDescribe,
    Unknown,
}

/// Why a frame never reached the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Replaced by a newer frame while waiting
    Superseded,
    /// The single waiting slot was taken
    QueueFull,
    /// A newer frame was already dispatched
    Stale,
    /// The pipeline was shutting down
    ShuttingDown,
}

/// Event published by the pipeline worker
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    FrameProcessed {
        seq: u64,
        timestamp: DateTime<Utc>,
        raw_count: usize,
        detections: Vec<EnrichedDetection>,
    },
    Spoken {
        text: String,
        priority: bool,
    },
    Vibrated {
        pattern: HapticPattern,
    },
    ModeChanged {
        mode: AlertMode,
    },
    /// `seq` is `None` for frames rejected before numbering
    FrameDropped {
        seq: Option<u64>,
        reason: DropReason,
    },
}
