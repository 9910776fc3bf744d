//! Camera frames handed to the pipeline by the frame source

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A single camera frame
///
/// The pixel buffer is reference counted; dropping the frame releases the
/// pipeline's hold on it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Bytes,
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u32,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    pub fn new(pixels: Bytes, width: u32, height: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            pixels,
            width,
            height,
            rotation_degrees: 0,
            timestamp,
        }
    }

    pub fn with_rotation(mut self, rotation_degrees: u32) -> Self {
        self.rotation_degrees = rotation_degrees % 360;
        self
    }

    /// Width and height after applying the rotation
    pub fn oriented_size(&self) -> (u32, u32) {
        if self.rotation_degrees == 90 || self.rotation_degrees == 270 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}
