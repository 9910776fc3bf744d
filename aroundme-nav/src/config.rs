//! Navigator configuration

use crate::error::NavigationError;
use aroundme_eye::VisionConfig;
use aroundme_spk::{AlertConfig, AlertMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// What to do with a frame that arrives while another is still waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// The newer frame replaces the waiting one
    #[default]
    KeepLatest,
    /// One frame may wait; newer frames are rejected until it is taken
    Queue,
}

/// Full pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Process every Nth submitted frame
    pub frame_skip: u32,

    pub backpressure: BackpressurePolicy,

    /// Mode the session starts in
    pub initial_mode: AlertMode,

    /// Capacity of the pipeline event channel
    pub event_buffer_size: usize,

    /// Capacity of the voice intent channel
    pub intent_buffer_size: usize,

    /// How long shutdown waits for the worker (ms)
    pub shutdown_timeout_ms: u64,

    pub vision: VisionConfig,
    pub alerts: AlertConfig,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            frame_skip: 2,
            backpressure: BackpressurePolicy::KeepLatest,
            initial_mode: AlertMode::Normal,
            event_buffer_size: 256,
            intent_buffer_size: 16,
            shutdown_timeout_ms: 5000,
            vision: VisionConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl NavigatorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NavigationError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML configuration; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self, NavigationError> {
        let config: NavigatorConfig = toml::from_str(content)?;
        config.validate().map_err(NavigationError::Config)?;
        Ok(config)
    }

    /// Apply `AROUNDME_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup; unparsable values are ignored with a warning
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("AROUNDME_FRAME_SKIP") {
            match value.parse() {
                Ok(n) => self.frame_skip = n,
                Err(_) => warn!("Ignoring invalid AROUNDME_FRAME_SKIP: {}", value),
            }
        }

        if let Some(value) = lookup("AROUNDME_CONFIDENCE_THRESHOLD") {
            match value.parse() {
                Ok(t) => self.vision.confidence_threshold = t,
                Err(_) => warn!("Ignoring invalid AROUNDME_CONFIDENCE_THRESHOLD: {}", value),
            }
        }

        if let Some(value) = lookup("AROUNDME_MODE") {
            match value.to_ascii_lowercase().as_str() {
                "normal" => self.initial_mode = AlertMode::Normal,
                "continuous" => self.initial_mode = AlertMode::Continuous,
                _ => warn!("Ignoring invalid AROUNDME_MODE: {}", value),
            }
        }
    }

    /// Validate navigator configuration
    pub fn validate(&self) -> Result<(), String> {
        self.vision.validate()?;
        self.alerts.validate()?;

        if self.frame_skip == 0 {
            return Err("frame_skip must be at least 1".to_string());
        }

        if self.event_buffer_size == 0 || self.event_buffer_size > 100_000 {
            return Err("event_buffer_size must be between 1 and 100000".to_string());
        }

        if self.intent_buffer_size == 0 || self.intent_buffer_size > 10_000 {
            return Err("intent_buffer_size must be between 1 and 10000".to_string());
        }

        if self.shutdown_timeout_ms == 0 {
            return Err("shutdown_timeout_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}
