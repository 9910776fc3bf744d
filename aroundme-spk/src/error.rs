//! Error types for aroundme-spk

use aroundme_core::Error as CoreError;
use thiserror::Error;

/// Alert delivery errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech sink error: {0}")]
    Sink(String),

    #[error("Haptic sink error: {0}")]
    Haptic(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<SpeechError> for CoreError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Config(msg) => CoreError::Configuration(msg),
            other => CoreError::Sink(format!("Alert error: {}", other)),
        }
    }
}
