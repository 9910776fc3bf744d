//! Temporal confirmation of detections across frames

use crate::error::VisionError;
use crate::models::RawDetection;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Detection whose label has been seen on enough processed frames
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedDetection {
    pub detection: RawDetection,
    pub consecutive_frames: u32,
}

/// Per-label frame counter that surfaces a label only after it has been
/// re-detected on `threshold` processed frames
///
/// Counts grow by one per frame a label is present and shrink by one per
/// frame it is absent; a label is forgotten once its count reaches zero. A
/// frame with no detections at all clears every label.
pub struct ConfirmationFilter {
    counts: HashMap<String, i32>,
    threshold: u32,
}

impl ConfirmationFilter {
    /// Create a new confirmation filter
    pub fn new(threshold: u32) -> Result<Self, VisionError> {
        if threshold < 1 {
            return Err(VisionError::Config(
                "confirmation_threshold must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            counts: HashMap::new(),
            threshold,
        })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Update tracking with one frame's detections and return the confirmed ones
    pub fn update(&mut self, detections: Vec<RawDetection>) -> Vec<ConfirmedDetection> {
        if detections.is_empty() {
            if !self.counts.is_empty() {
                debug!("Empty frame, forgetting {} tracked labels", self.counts.len());
            }
            self.counts.clear();
            return Vec::new();
        }

        let present: HashSet<&str> = detections.iter().map(|d| d.label.as_str()).collect();

        for label in &present {
            *self.counts.entry((*label).to_string()).or_insert(0) += 1;
        }

        self.counts.retain(|label, count| {
            if present.contains(label.as_str()) {
                return true;
            }
            *count -= 1;
            *count > 0
        });

        let threshold = self.threshold as i32;
        let confirmed: Vec<ConfirmedDetection> = detections
            .into_iter()
            .filter_map(|detection| {
                let count = self.counts.get(&detection.label).copied().unwrap_or(0);
                (count >= threshold).then(|| ConfirmedDetection {
                    detection,
                    consecutive_frames: count as u32,
                })
            })
            .collect();

        debug!(
            "Tracking {} labels, {} detections confirmed",
            self.counts.len(),
            confirmed.len()
        );
        confirmed
    }

    /// Current count for a label, if it is tracked
    pub fn tracked_count(&self, label: &str) -> Option<i32> {
        self.counts.get(label).copied()
    }

    /// All labels currently tracked
    pub fn tracked_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.counts.keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Forget all tracked labels
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}
