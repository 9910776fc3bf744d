//! Inference seam and detector output decoding

pub mod engine;
pub mod yolo;

pub use engine::{InferenceEngine, UnavailableEngine};
pub use yolo::{RawDetection, YoloDecoder, COCO_CLASSES};
