//! Speech and haptic sinks

pub mod custom;

pub use custom::{CustomHapticSink, CustomSpeechSink};

use crate::error::SpeechError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Something that can say a sentence out loud
#[async_trait]
pub trait SpeechSink: Send + Sync {
    /// Start speaking `text`; with `interrupt` any utterance in progress is flushed
    async fn speak(&self, text: &str, interrupt: bool) -> Result<(), SpeechError>;

    /// Whether the sink has finished its last utterance
    fn is_idle(&self) -> bool;
}

/// Something that can vibrate
pub trait HapticSink: Send + Sync {
    fn vibrate(&self, pattern: HapticPattern) -> Result<(), SpeechError>;
}

/// Vibration patterns used for proximity alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapticPattern {
    /// Obstacle very close
    DoubleBuzz,
    /// Obstacle approaching
    SinglePulse,
}

impl HapticPattern {
    /// Alternating off/on durations in milliseconds, starting with a delay
    pub fn waveform_ms(&self) -> &'static [u64] {
        match self {
            HapticPattern::DoubleBuzz => &[0, 200, 100, 200],
            HapticPattern::SinglePulse => &[0, 150],
        }
    }

    /// Total time the pattern takes to play
    pub fn duration_ms(&self) -> u64 {
        self.waveform_ms().iter().sum()
    }

    pub fn name(&self) -> &'static str {
        match self {
            HapticPattern::DoubleBuzz => "double-buzz",
            HapticPattern::SinglePulse => "single-pulse",
        }
    }
}
