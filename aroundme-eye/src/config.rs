//! Configuration for aroundme-eye

use crate::models::yolo::COCO_CLASSES;
use serde::{Deserialize, Serialize};

/// Vision pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Minimum objectness and final confidence for a candidate (0.0-1.0)
    pub confidence_threshold: f32,
    /// IoU above which a lower-confidence box is suppressed (0.0-1.0)
    pub iou_threshold: f32,
    /// Maximum detections kept per frame after NMS
    pub max_detections: usize,
    /// Processed frames a label must be seen in before it is confirmed
    pub confirmation_threshold: u32,
    /// Box/frame area ratio above which an obstacle is very close
    pub danger_area_ratio: f32,
    /// Box/frame area ratio above which an obstacle is approaching
    pub warning_area_ratio: f32,
    /// Box/frame area ratio above which an obstacle is at a safe distance
    pub safe_area_ratio: f32,
    /// Labels prone to false positives against static backgrounds
    pub confusable_labels: Vec<String>,
    /// Minimum confidence required for confusable labels
    pub confusable_min_confidence: f32,
    /// Class names indexed by the model's class scores
    pub labels: Vec<String>,
    /// Require exactly `5 + labels.len()` columns in the output tensor
    pub strict_shape: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.35,
            iou_threshold: 0.45,
            max_detections: 10,
            confirmation_threshold: 2,
            danger_area_ratio: 0.35,
            warning_area_ratio: 0.15,
            safe_area_ratio: 0.05,
            confusable_labels: ["refrigerator", "tv", "laptop", "cell phone"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            confusable_min_confidence: 0.50,
            labels: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
            strict_shape: true,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
            ("confusable_min_confidence", self.confusable_min_confidence),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0", name));
            }
        }

        if self.max_detections == 0 {
            return Err("max_detections must be at least 1".to_string());
        }

        if self.max_detections > 1000 {
            return Err("max_detections too large (max 1000)".to_string());
        }

        if self.confirmation_threshold < 1 {
            return Err("confirmation_threshold must be at least 1".to_string());
        }

        for (name, value) in [
            ("danger_area_ratio", self.danger_area_ratio),
            ("warning_area_ratio", self.warning_area_ratio),
            ("safe_area_ratio", self.safe_area_ratio),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(format!("{} must be in (0.0, 1.0]", name));
            }
        }

        if !(self.safe_area_ratio < self.warning_area_ratio
            && self.warning_area_ratio < self.danger_area_ratio)
        {
            return Err(
                "Area ratios must be strictly ordered: safe < warning < danger".to_string(),
            );
        }

        if self.labels.is_empty() {
            return Err("labels cannot be empty".to_string());
        }

        if self.labels.iter().any(|l| l.trim().is_empty()) {
            return Err("labels cannot contain empty names".to_string());
        }

        Ok(())
    }

    /// True when `label` needs the stricter confusable-class confidence
    pub fn is_confusable(&self, label: &str) -> bool {
        self.confusable_labels
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
    }
}
