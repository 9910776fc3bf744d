//! Error types for aroundme-nav

use aroundme_core::Error as CoreError;
use aroundme_eye::VisionError;
use aroundme_spk::SpeechError;
use thiserror::Error;

/// Navigation pipeline errors
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

impl From<NavigationError> for CoreError {
    fn from(err: NavigationError) -> Self {
        match err {
            NavigationError::Config(msg) => CoreError::Configuration(msg),
            NavigationError::Parse(e) => CoreError::Configuration(e.to_string()),
            NavigationError::Vision(e) => e.into(),
            NavigationError::Speech(e) => e.into(),
            NavigationError::Io(e) => CoreError::Io(e),
            NavigationError::Shutdown(msg) => CoreError::Concurrency(msg),
        }
    }
}
