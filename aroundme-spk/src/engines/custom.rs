//! Closure-backed sinks
//! Lets callers plug in a platform speech engine or vibrator without a new type

use crate::engines::{HapticPattern, HapticSink, SpeechSink};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::sync::Arc;

type SpeakFn = dyn Fn(&str, bool) -> Result<(), SpeechError> + Send + Sync;
type IdleFn = dyn Fn() -> bool + Send + Sync;
type VibrateFn = dyn Fn(HapticPattern) -> Result<(), SpeechError> + Send + Sync;

/// Speech sink wrapper around user-provided functions
pub struct CustomSpeechSink {
    name: String,
    speak_fn: Arc<SpeakFn>,
    is_idle_fn: Arc<IdleFn>,
    max_text_length: usize,
}

impl CustomSpeechSink {
    /// Create a new custom speech sink
    pub fn new<F1, F2>(name: impl Into<String>, speak_fn: F1, is_idle_fn: F2) -> Self
    where
        F1: Fn(&str, bool) -> Result<(), SpeechError> + Send + Sync + 'static,
        F2: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            speak_fn: Arc::new(speak_fn),
            is_idle_fn: Arc::new(is_idle_fn),
            max_text_length: 10_000,
        }
    }

    /// Sink whose utterances complete instantly
    pub fn always_idle<F>(name: impl Into<String>, speak_fn: F) -> Self
    where
        F: Fn(&str, bool) -> Result<(), SpeechError> + Send + Sync + 'static,
    {
        Self::new(name, speak_fn, || true)
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SpeechSink for CustomSpeechSink {
    async fn speak(&self, text: &str, interrupt: bool) -> Result<(), SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Sink("Text cannot be empty".to_string()));
        }

        if text.len() > self.max_text_length {
            return Err(SpeechError::Sink(format!(
                "Text too long for {} (max {} bytes)",
                self.name, self.max_text_length
            )));
        }

        (self.speak_fn)(text, interrupt)
    }

    fn is_idle(&self) -> bool {
        (self.is_idle_fn)()
    }
}

/// Haptic sink wrapper around a user-provided function
pub struct CustomHapticSink {
    vibrate_fn: Arc<VibrateFn>,
}

impl CustomHapticSink {
    pub fn new<F>(vibrate_fn: F) -> Self
    where
        F: Fn(HapticPattern) -> Result<(), SpeechError> + Send + Sync + 'static,
    {
        Self {
            vibrate_fn: Arc::new(vibrate_fn),
        }
    }

    /// Sink for devices without a vibrator
    pub fn unavailable() -> Self {
        Self::new(|_| Err(SpeechError::Haptic("No vibrator available".to_string())))
    }
}

impl HapticSink for CustomHapticSink {
    fn vibrate(&self, pattern: HapticPattern) -> Result<(), SpeechError> {
        (self.vibrate_fn)(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_custom_sink_forwards_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sink = CustomSpeechSink::always_idle("test", move |text, interrupt| {
            assert_eq!(text, "Car ahead");
            assert!(interrupt);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        sink.speak("Car ahead", true).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sink.is_idle());
        assert_eq!(sink.name(), "test");
    }

    #[tokio::test]
    async fn test_custom_sink_rejects_bad_text() {
        let sink = CustomSpeechSink::always_idle("test", |_, _| Ok(())).with_max_text_length(4);
        assert!(sink.speak("", false).await.is_err());
        assert!(sink.speak("too long", false).await.is_err());
        assert!(sink.speak("ok", false).await.is_ok());
    }

    #[test]
    fn test_unavailable_haptics() {
        let sink = CustomHapticSink::unavailable();
        assert!(sink.vibrate(HapticPattern::SinglePulse).is_err());
    }
}
