//! Spatial classification: where an obstacle is and how close it looks

use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::processing::confirmation::ConfirmedDetection;
use aroundme_core::BoundingBox;
use serde::{Deserialize, Serialize};

/// Horizontal position of an obstacle in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Left,
    Center,
    Right,
}

impl Position {
    pub fn phrase(&self) -> &'static str {
        match self {
            Position::Left => "on your left",
            Position::Center => "in front of you",
            Position::Right => "on your right",
        }
    }
}

/// Coarse proximity derived from how much of the frame a box covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistanceTier {
    Far,
    Safe,
    Warning,
    Danger,
}

impl DistanceTier {
    pub fn phrase(&self) -> &'static str {
        match self {
            DistanceTier::Danger => "very close",
            DistanceTier::Warning => "approaching",
            DistanceTier::Safe => "at safe distance",
            DistanceTier::Far => "far away",
        }
    }

    /// Ranking contribution of the tier (Danger 4 .. Far 1)
    pub fn score(&self) -> u32 {
        match self {
            DistanceTier::Danger => 4,
            DistanceTier::Warning => 3,
            DistanceTier::Safe => 2,
            DistanceTier::Far => 1,
        }
    }

    /// Tiers that are announced in normal mode
    pub fn is_alerting(&self) -> bool {
        matches!(self, DistanceTier::Danger | DistanceTier::Warning)
    }
}

/// Confirmed detection with position, tier and spoken description
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDetection {
    pub detection: ConfirmedDetection,
    pub position: Position,
    pub distance_tier: DistanceTier,
    pub danger_score: u32,
    pub description: String,
}

impl EnrichedDetection {
    pub fn label(&self) -> &str {
        &self.detection.detection.label
    }

    pub fn confidence(&self) -> f32 {
        self.detection.detection.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.detection.detection.bbox
    }
}

/// Stateless mapper from box geometry to position and distance tier
#[derive(Debug, Clone)]
pub struct SpatialClassifier {
    danger_area_ratio: f32,
    warning_area_ratio: f32,
    safe_area_ratio: f32,
}

impl SpatialClassifier {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Ok(Self {
            danger_area_ratio: config.danger_area_ratio,
            warning_area_ratio: config.warning_area_ratio,
            safe_area_ratio: config.safe_area_ratio,
        })
    }

    pub fn position_for(&self, center_x: f32, frame_width: f32) -> Position {
        if center_x < frame_width / 3.0 {
            Position::Left
        } else if center_x > 2.0 * frame_width / 3.0 {
            Position::Right
        } else {
            Position::Center
        }
    }

    /// Boundary values fall into the farther tier
    pub fn tier_for(&self, area_ratio: f32) -> DistanceTier {
        if area_ratio > self.danger_area_ratio {
            DistanceTier::Danger
        } else if area_ratio > self.warning_area_ratio {
            DistanceTier::Warning
        } else if area_ratio > self.safe_area_ratio {
            DistanceTier::Safe
        } else {
            DistanceTier::Far
        }
    }

    pub fn classify(
        &self,
        detection: ConfirmedDetection,
        frame_width: u32,
        frame_height: u32,
    ) -> EnrichedDetection {
        let width = frame_width as f32;
        let height = frame_height as f32;
        let bbox = detection.detection.bbox;

        let (area_ratio, height_ratio) = if frame_width == 0 || frame_height == 0 {
            (0.0, 0.0)
        } else {
            (bbox.area() / (width * height), (bbox.height() / height).clamp(0.0, 1.0))
        };

        let position = self.position_for(bbox.center_x(), width);
        let distance_tier = self.tier_for(area_ratio);
        let danger_score = distance_tier.score() + (height_ratio * 5.0).floor() as u32;
        let description = format!(
            "{} {}, {}",
            capitalize(&detection.detection.label),
            position.phrase(),
            distance_tier.phrase()
        );

        EnrichedDetection {
            detection,
            position,
            distance_tier,
            danger_score,
            description,
        }
    }

    pub fn classify_all(
        &self,
        detections: Vec<ConfirmedDetection>,
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<EnrichedDetection> {
        detections
            .into_iter()
            .map(|d| self.classify(d, frame_width, frame_height))
            .collect()
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
