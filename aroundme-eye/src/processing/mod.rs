//! Vision processing pipelines

pub mod confirmation;
pub mod detection;
pub mod spatial;

pub use confirmation::{ConfirmationFilter, ConfirmedDetection};
pub use detection::DetectionPipeline;
pub use spatial::{DistanceTier, EnrichedDetection, Position, SpatialClassifier};
