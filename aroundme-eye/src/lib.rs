//! aroundme-eye: obstacle perception for AroundMe
//!
//! Turns raw detector output into confirmed, spatially classified
//! obstacles:
//! - YOLO-style tensor decoding with greedy non-maximum suppression
//! - Temporal confirmation to suppress single-frame jitter
//! - Position, distance tier and danger scoring per obstacle

pub mod config;
pub mod error;
pub mod frame;
pub mod models;
pub mod processing;

pub use config::VisionConfig;
pub use error::VisionError;
pub use frame::Frame;
pub use models::{InferenceEngine, RawDetection, YoloDecoder};
pub use processing::{
    ConfirmationFilter, ConfirmedDetection, DetectionPipeline, DistanceTier, EnrichedDetection,
    Position, SpatialClassifier,
};
