//! Alert dispatch: what is spoken and vibrated for each frame

use crate::config::AlertConfig;
use crate::engines::{HapticPattern, HapticSink, SpeechSink};
use crate::error::SpeechError;
use crate::queue::{QueuePush, SpeechQueue};
use aroundme_eye::processing::{DistanceTier, EnrichedDetection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const CONTINUOUS_CONFIRMATION: &str =
    "Switched to continuous mode. I'll describe everything around you.";
const NORMAL_CONFIRMATION: &str = "Back to normal mode.";

/// Sentence spoken when the user switches into `mode`
pub fn mode_confirmation(mode: AlertMode) -> &'static str {
    match mode {
        AlertMode::Continuous => CONTINUOUS_CONFIRMATION,
        AlertMode::Normal => NORMAL_CONFIRMATION,
    }
}

/// How much the user wants to hear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    /// Only the most urgent approaching obstacle
    #[default]
    Normal,
    /// Everything in view, every frame
    Continuous,
}

/// One utterance offered to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// Interrupts current speech and skips the queue
    pub priority: bool,
    /// Exempt from duplicate throttling
    pub alert: bool,
    pub timestamp: DateTime<Utc>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            priority: false,
            alert: false,
            timestamp,
        }
    }

    pub fn priority(mut self) -> Self {
        self.priority = true;
        self
    }

    pub fn alert(mut self) -> Self {
        self.alert = true;
        self
    }
}

/// What happened to a speech request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Handed to the speech sink
    Spoken,
    /// Waiting behind the current utterance
    Queued,
    /// Same text spoken too recently
    Throttled,
    /// Queue is at capacity
    Dropped,
    /// The sink rejected it
    Failed,
}

/// Per-session dispatcher state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatcherState {
    pub is_speaking: bool,
    pub last_spoken_text: Option<String>,
    pub last_speak_time: Option<DateTime<Utc>>,
    pub last_vibration_time: Option<DateTime<Utc>>,
    pub mode: AlertMode,
}

/// Result of dispatching one frame's detections
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchDecision {
    /// Text chosen for this frame, if any
    pub text: Option<String>,
    pub speech: Option<SpeechOutcome>,
    /// Earlier queued utterance handed to the sink while evaluating this frame
    pub drained: Option<String>,
    /// Pattern that actually fired
    pub haptic: Option<HapticPattern>,
}

enum Drain {
    Empty,
    Busy,
    Spoken(String),
    Failed(String),
}

/// Owns the dispatcher state, speech queue and sinks for one user session
pub struct AlertSession {
    config: AlertConfig,
    speech: Arc<dyn SpeechSink>,
    haptics: Arc<dyn HapticSink>,
    queue: SpeechQueue,
    state: DispatcherState,
}

impl AlertSession {
    /// Create a new alert session
    pub fn new(
        config: AlertConfig,
        speech: Arc<dyn SpeechSink>,
        haptics: Arc<dyn HapticSink>,
    ) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        Ok(Self {
            queue: SpeechQueue::new(config.queue_size),
            config,
            speech,
            haptics,
            state: DispatcherState::default(),
        })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn mode(&self) -> AlertMode {
        self.state.mode
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Copy of the current state for readers outside the dispatcher
    pub fn snapshot(&self) -> DispatcherState {
        self.state.clone()
    }

    /// Change mode without announcing it
    pub fn set_mode(&mut self, mode: AlertMode) {
        self.state.mode = mode;
    }

    /// Change mode and announce it; `None` if already in `mode`
    pub async fn switch_mode(&mut self, mode: AlertMode, now: DateTime<Utc>) -> Option<SpeechOutcome> {
        if self.state.mode == mode {
            debug!("Already in {:?} mode", mode);
            return None;
        }

        info!("Alert mode {:?} -> {:?}", self.state.mode, mode);
        self.state.mode = mode;

        let request = SpeechRequest::new(mode_confirmation(mode), now).priority();
        Some(self.speak(request).await)
    }

    /// Decide speech and vibration for one frame
    pub async fn dispatch(
        &mut self,
        detections: &[EnrichedDetection],
        now: DateTime<Utc>,
    ) -> DispatchDecision {
        let text = self.candidate_text(detections);

        let (speech, drained) = match &text {
            Some(text) => {
                let (outcome, drained) = self.offer(SpeechRequest::new(text.clone(), now)).await;
                (Some(outcome), drained)
            }
            None => (None, self.drain_queue(now).await),
        };

        let haptic = match haptic_pattern(detections) {
            Some(pattern) => self.vibrate(pattern, now),
            None => None,
        };

        DispatchDecision {
            text,
            speech,
            drained,
            haptic,
        }
    }

    /// Offer one utterance
    pub async fn speak(&mut self, request: SpeechRequest) -> SpeechOutcome {
        self.offer(request).await.0
    }

    /// Offer one utterance; also returns any other queued text that reached the sink
    async fn offer(&mut self, request: SpeechRequest) -> (SpeechOutcome, Option<String>) {
        let now = request.timestamp;

        if request.text.len() > self.config.max_text_length {
            warn!(
                "Utterance of {} bytes exceeds max_text_length {}",
                request.text.len(),
                self.config.max_text_length
            );
            return (SpeechOutcome::Failed, self.drain_queue(now).await);
        }

        if !request.priority && !request.alert && self.is_throttled(&request.text, now) {
            debug!("Throttled repeat of \"{}\"", request.text);
            return (SpeechOutcome::Throttled, self.drain_queue(now).await);
        }

        if request.priority {
            let outcome = if self.speak_now(&request.text, true, now).await {
                SpeechOutcome::Spoken
            } else {
                SpeechOutcome::Failed
            };
            return (outcome, None);
        }

        if self.queue.push(&request.text) == QueuePush::Full {
            warn!("Speech queue full, dropping \"{}\"", request.text);
            return (SpeechOutcome::Dropped, self.drain_queue(now).await);
        }

        match self.drain(now).await {
            Drain::Spoken(text) if text == request.text => (SpeechOutcome::Spoken, None),
            Drain::Failed(text) if text == request.text => (SpeechOutcome::Failed, None),
            Drain::Spoken(other) => (SpeechOutcome::Queued, Some(other)),
            Drain::Failed(_) | Drain::Busy | Drain::Empty => (SpeechOutcome::Queued, None),
        }
    }

    /// Speak the next queued utterance if the sink is idle; returns the text handed over
    pub async fn drain_queue(&mut self, now: DateTime<Utc>) -> Option<String> {
        match self.drain(now).await {
            Drain::Spoken(text) => Some(text),
            _ => None,
        }
    }

    async fn drain(&mut self, now: DateTime<Utc>) -> Drain {
        if !self.speech.is_idle() {
            self.state.is_speaking = true;
            return Drain::Busy;
        }
        self.state.is_speaking = false;

        let Some(text) = self.queue.pop_front() else {
            return Drain::Empty;
        };

        if self.speak_now(&text, false, now).await {
            Drain::Spoken(text)
        } else {
            Drain::Failed(text)
        }
    }

    async fn speak_now(&mut self, text: &str, interrupt: bool, now: DateTime<Utc>) -> bool {
        match self.speech.speak(text, interrupt).await {
            Ok(()) => {
                debug!("Speaking \"{}\" (interrupt: {})", text, interrupt);
                self.state.is_speaking = true;
                self.state.last_spoken_text = Some(text.to_string());
                self.state.last_speak_time = Some(now);
                true
            }
            Err(e) => {
                error!("Speech sink failed for \"{}\": {}", text, e);
                self.state.is_speaking = false;
                false
            }
        }
    }

    fn vibrate(&mut self, pattern: HapticPattern, now: DateTime<Utc>) -> Option<HapticPattern> {
        if let Some(last) = self.state.last_vibration_time {
            if elapsed_ms(last, now) < self.config.vibration_cooldown_ms {
                debug!("Vibration {} suppressed by cooldown", pattern.name());
                return None;
            }
        }

        match self.haptics.vibrate(pattern) {
            Ok(()) => {
                self.state.last_vibration_time = Some(now);
                Some(pattern)
            }
            Err(e) => {
                error!("Haptic sink failed for {}: {}", pattern.name(), e);
                None
            }
        }
    }

    fn is_throttled(&self, text: &str, now: DateTime<Utc>) -> bool {
        match (&self.state.last_spoken_text, self.state.last_speak_time) {
            (Some(last_text), Some(last_time)) if last_text == text => {
                elapsed_ms(last_time, now) < self.config.min_time_between_similar_utterances_ms
            }
            _ => false,
        }
    }

    fn candidate_text(&self, detections: &[EnrichedDetection]) -> Option<String> {
        match self.state.mode {
            AlertMode::Normal => {
                let mut best: Option<&EnrichedDetection> = None;
                for detection in detections.iter().filter(|d| d.distance_tier.is_alerting()) {
                    if best.map_or(true, |b| detection.danger_score > b.danger_score) {
                        best = Some(detection);
                    }
                }
                best.map(|d| d.description.clone())
            }
            AlertMode::Continuous => {
                if detections.is_empty() {
                    return None;
                }
                let mut ranked: Vec<&EnrichedDetection> = detections.iter().collect();
                ranked.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
                let descriptions: Vec<&str> = ranked
                    .into_iter()
                    .take(self.config.continuous_max_items)
                    .map(|d| d.description.as_str())
                    .collect();
                Some(descriptions.join(&self.config.continuous_separator))
            }
        }
    }
}

fn haptic_pattern(detections: &[EnrichedDetection]) -> Option<HapticPattern> {
    if detections.iter().any(|d| d.distance_tier == DistanceTier::Danger) {
        Some(HapticPattern::DoubleBuzz)
    } else if detections.iter().any(|d| d.distance_tier == DistanceTier::Warning) {
        Some(HapticPattern::SinglePulse)
    } else {
        None
    }
}

/// Milliseconds from `earlier` to `later`; a clock that went backwards counts as zero
fn elapsed_ms(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u64 {
    (later - earlier).num_milliseconds().max(0) as u64
}
