//! Configuration for alert delivery

use serde::{Deserialize, Serialize};

/// Alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Window in which an identical non-priority utterance is dropped (ms)
    pub min_time_between_similar_utterances_ms: u64,

    /// Minimum gap between two vibrations (ms)
    pub vibration_cooldown_ms: u64,

    /// Descriptions read out per frame in continuous mode
    pub continuous_max_items: usize,

    /// Joiner between continuous-mode descriptions
    pub continuous_separator: String,

    /// Maximum pending utterances
    pub queue_size: usize,

    /// Longest utterance handed to a speech sink (bytes)
    pub max_text_length: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_time_between_similar_utterances_ms: 3000,
            vibration_cooldown_ms: 2000,
            continuous_max_items: 3,
            continuous_separator: ". ".to_string(),
            queue_size: 100,
            max_text_length: 10_000,
        }
    }
}

impl AlertConfig {
    /// Validate alert configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_time_between_similar_utterances_ms > 600_000 {
            return Err("min_time_between_similar_utterances_ms too large (max 10 minutes)".to_string());
        }

        if self.vibration_cooldown_ms > 600_000 {
            return Err("vibration_cooldown_ms too large (max 10 minutes)".to_string());
        }

        if self.continuous_max_items == 0 {
            return Err("continuous_max_items must be at least 1".to_string());
        }

        if self.queue_size == 0 || self.queue_size > 10_000 {
            return Err("queue_size must be between 1 and 10000".to_string());
        }

        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }

        if self.continuous_separator.chars().any(|c| c == '\0') {
            return Err("continuous_separator contains invalid characters".to_string());
        }

        Ok(())
    }
}
