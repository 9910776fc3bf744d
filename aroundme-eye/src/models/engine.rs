//! Inference engine seam
//!
//! The network itself lives outside this crate. Anything that can turn a
//! frame into a `[N, 5 + K]` tensor can drive the pipeline.

use crate::error::VisionError;
use crate::frame::Frame;
use async_trait::async_trait;
use ndarray::Array2;

/// Trait for object detection backends
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Run the model on a frame, returning one row per candidate box
    async fn infer(&self, frame: &Frame) -> Result<Array2<f32>, VisionError>;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Engine used when no model could be loaded; every call fails
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl InferenceEngine for UnavailableEngine {
    async fn infer(&self, _frame: &Frame) -> Result<Array2<f32>, VisionError> {
        Err(VisionError::Model(format!("Model unavailable: {}", self.reason)))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Utc;

    #[tokio::test]
    async fn test_unavailable_engine_always_fails() {
        let engine = UnavailableEngine::new("no model file");
        let frame = Frame::new(Bytes::new(), 640, 480, Utc::now());
        let err = engine.infer(&frame).await.unwrap_err();
        assert!(err.to_string().contains("no model file"));
        assert_eq!(engine.name(), "unavailable");
    }
}
