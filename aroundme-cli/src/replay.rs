//! Recorded detector output, replayed through the pipeline

use anyhow::{bail, Context, Result};
use aroundme_eye::{Frame, InferenceEngine, VisionError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One recorded frame
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub rotation_degrees: u32,
    /// Raw detector rows for this frame
    #[serde(default)]
    pub rows: Vec<Vec<f32>>,
}

impl ReplayFrame {
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms)
            .single()
            .with_context(|| format!("timestamp {} is out of range", self.timestamp_ms))
    }

    /// Frame without pixel data; the engine only looks at the timestamp
    pub fn to_frame(&self) -> Result<Frame> {
        Ok(Frame::new(Bytes::new(), self.width, self.height, self.timestamp()?)
            .with_rotation(self.rotation_degrees))
    }
}

pub fn load_frames(path: &Path) -> Result<Vec<ReplayFrame>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_frames(&content).with_context(|| format!("invalid replay file {}", path.display()))
}

pub fn parse_frames(content: &str) -> Result<Vec<ReplayFrame>> {
    let frames: Vec<ReplayFrame> = serde_json::from_str(content)?;
    Ok(frames)
}

/// Inference engine answering each frame with its recorded tensor
pub struct ReplayEngine {
    outputs: HashMap<i64, Array2<f32>>,
}

impl ReplayEngine {
    /// Frames without rows produce an empty tensor with `columns` columns
    pub fn new(frames: &[ReplayFrame], columns: usize) -> Result<Self> {
        let mut outputs = HashMap::with_capacity(frames.len());

        for (index, frame) in frames.iter().enumerate() {
            let tensor = if frame.rows.is_empty() {
                Array2::zeros((0, columns))
            } else {
                let width = frame.rows[0].len();
                if frame.rows.iter().any(|row| row.len() != width) {
                    bail!("frame {}: rows have different lengths", index);
                }
                let flat: Vec<f32> = frame.rows.iter().flatten().copied().collect();
                Array2::from_shape_vec((frame.rows.len(), width), flat)
                    .with_context(|| format!("frame {}: bad tensor shape", index))?
            };

            if outputs.insert(frame.timestamp_ms, tensor).is_some() {
                bail!("frame {}: duplicate timestamp {}", index, frame.timestamp_ms);
            }
        }

        Ok(Self { outputs })
    }
}

#[async_trait]
impl InferenceEngine for ReplayEngine {
    async fn infer(&self, frame: &Frame) -> Result<Array2<f32>, VisionError> {
        let key = frame.timestamp.timestamp_millis();
        self.outputs
            .get(&key)
            .cloned()
            .ok_or_else(|| VisionError::Inference(format!("no recorded output at {} ms", key)))
    }

    fn name(&self) -> &str {
        "replay"
    }
}
