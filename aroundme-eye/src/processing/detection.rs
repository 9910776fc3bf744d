//! Object detection pipeline

use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::frame::Frame;
use crate::models::{InferenceEngine, RawDetection, YoloDecoder};
use std::sync::Arc;
use tracing::{debug, warn};

/// Object detection pipeline
///
/// Inference and decoding failures never escape `detect`; they are logged
/// and reported as an empty frame.
pub struct DetectionPipeline {
    engine: Option<Arc<dyn InferenceEngine>>,
    decoder: YoloDecoder,
}

impl DetectionPipeline {
    /// Create a new detection pipeline
    pub fn new(engine: Arc<dyn InferenceEngine>, config: VisionConfig) -> Result<Self, VisionError> {
        Ok(Self {
            engine: Some(engine),
            decoder: YoloDecoder::new(config)?,
        })
    }

    /// Pipeline that reports nothing, for when no model could be loaded
    pub fn disabled(config: VisionConfig) -> Result<Self, VisionError> {
        Ok(Self {
            engine: None,
            decoder: YoloDecoder::new(config)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.engine.is_some()
    }

    pub fn config(&self) -> &VisionConfig {
        self.decoder.config()
    }

    /// Process frame and detect objects
    pub async fn detect(&self, frame: &Frame) -> Vec<RawDetection> {
        let Some(engine) = self.engine.as_ref() else {
            return Vec::new();
        };

        debug!("Running object detection on frame");
        let output = match engine.infer(frame).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Inference with {} failed: {}", engine.name(), e);
                return Vec::new();
            }
        };

        let (width, height) = frame.oriented_size();
        match self.decoder.decode(output.view(), width, height) {
            Ok(detections) => {
                debug!("Detected {} objects", detections.len());
                detections
            }
            Err(e) => {
                warn!("Discarding malformed detector output: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use ndarray::Array2;

    struct FnEngine<F>(F);

    #[async_trait]
    impl<F> InferenceEngine for FnEngine<F>
    where
        F: Fn() -> Result<Array2<f32>, VisionError> + Send + Sync,
    {
        async fn infer(&self, _frame: &Frame) -> Result<Array2<f32>, VisionError> {
            (self.0)()
        }

        fn name(&self) -> &str {
            "fn"
        }
    }

    fn config() -> VisionConfig {
        VisionConfig {
            labels: vec!["person".to_string(), "car".to_string()],
            ..VisionConfig::default()
        }
    }

    fn frame() -> Frame {
        Frame::new(Bytes::from_static(&[0u8; 16]), 640, 480, Utc::now())
    }

    #[tokio::test]
    async fn test_detect_decodes_engine_output() {
        let engine = FnEngine(|| {
            Ok(Array2::from_shape_vec((1, 7), vec![0.5, 0.5, 0.4, 0.4, 0.9, 0.0, 1.0]).unwrap())
        });

        let pipeline = DetectionPipeline::new(Arc::new(engine), config()).unwrap();
        let detections = pipeline.detect(&frame()).await;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "car");
    }

    #[tokio::test]
    async fn test_detect_inference_failure_is_empty() {
        let engine = FnEngine(|| Err(VisionError::Inference("delegate crashed".to_string())));
        let pipeline = DetectionPipeline::new(Arc::new(engine), config()).unwrap();
        assert!(pipeline.detect(&frame()).await.is_empty());
    }

    #[tokio::test]
    async fn test_detect_malformed_output_is_empty() {
        let engine = FnEngine(|| Ok(Array2::zeros((4, 3))));
        let pipeline = DetectionPipeline::new(Arc::new(engine), config()).unwrap();
        assert!(pipeline.detect(&frame()).await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_pipeline_is_always_empty() {
        let pipeline = DetectionPipeline::disabled(config()).unwrap();
        assert!(!pipeline.is_enabled());
        assert!(pipeline.detect(&frame()).await.is_empty());
    }
}
