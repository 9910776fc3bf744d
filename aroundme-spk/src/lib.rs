//! aroundme-spk: spoken and haptic alerts
//!
//! Decides what the user hears and feels for each processed frame:
//! - Speech throttling, priority preemption and a de-duplicated FIFO queue
//! - Haptic pattern selection with a cooldown
//! - Pluggable speech and haptic sinks

pub mod config;
pub mod dispatcher;
pub mod engines;
pub mod error;
pub mod queue;

pub use config::AlertConfig;
pub use dispatcher::{AlertMode, AlertSession, DispatchDecision, DispatcherState, SpeechOutcome, SpeechRequest};
pub use engines::{CustomHapticSink, CustomSpeechSink, HapticPattern, HapticSink, SpeechSink};
pub use error::SpeechError;
pub use queue::{QueuePush, SpeechQueue};
