//! YOLO output decoding and non-maximum suppression

use crate::config::VisionConfig;
use crate::error::VisionError;
use aroundme_core::BoundingBox;
use ndarray::ArrayView2;
use std::cmp::Ordering;
use tracing::debug;

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Columns preceding the class scores: cx, cy, w, h, objectness
const BOX_COLUMNS: usize = 5;

/// Label used when the class index is past the configured label list
const FALLBACK_LABEL: &str = "object";

/// Candidate detection decoded from one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Decoder for `[N, 5 + K]` YOLO output tensors
pub struct YoloDecoder {
    config: VisionConfig,
}

impl YoloDecoder {
    /// Create a decoder, rejecting invalid configuration
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Decode a raw output tensor into confidence-ordered detections
    pub fn decode(
        &self,
        output: ArrayView2<'_, f32>,
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<RawDetection>, VisionError> {
        let (rows, columns) = output.dim();
        debug!("YOLO output shape: [{}, {}]", rows, columns);

        if columns <= BOX_COLUMNS {
            return Err(VisionError::Shape(format!(
                "expected at least {} columns, got [{}, {}]",
                BOX_COLUMNS + 1,
                rows,
                columns
            )));
        }

        let expected = BOX_COLUMNS + self.config.labels.len();
        if self.config.strict_shape && columns != expected {
            return Err(VisionError::Shape(format!(
                "expected [N, {}], got [{}, {}]",
                expected, rows, columns
            )));
        }

        if image_width == 0 || image_height == 0 {
            return Err(VisionError::Shape("image dimensions cannot be zero".to_string()));
        }

        let frame_width = image_width as f32;
        let frame_height = image_height as f32;
        let threshold = self.config.confidence_threshold;
        let mut candidates = Vec::new();

        for row in output.rows() {
            let objectness = row[4];
            if !objectness.is_finite() || objectness < threshold {
                continue;
            }

            // First index wins on ties
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for (class_idx, score) in row.iter().skip(BOX_COLUMNS).enumerate() {
                if score.is_finite() && *score > best_score {
                    best_score = *score;
                    best_class = class_idx;
                }
            }

            let confidence = objectness * best_score;
            if confidence < threshold {
                continue;
            }

            let label = self
                .config
                .labels
                .get(best_class)
                .map(|s| s.as_str())
                .unwrap_or(FALLBACK_LABEL);

            if self.config.is_confusable(label) && confidence < self.config.confusable_min_confidence {
                debug!("Skipping low-confidence {} ({:.2})", label, confidence);
                continue;
            }

            let bbox = BoundingBox::from_center(
                row[0] * frame_width,
                row[1] * frame_height,
                row[2] * frame_width,
                row[3] * frame_height,
            )
            .clamp_to(frame_width, frame_height);

            if bbox.is_degenerate() {
                continue;
            }

            candidates.push(RawDetection {
                class_id: best_class,
                label: label.to_string(),
                confidence: confidence.min(1.0),
                bbox,
            });
        }

        let detections = apply_nms(candidates, self.config.iou_threshold, self.config.max_detections);
        debug!("YOLO decoded {} detections", detections.len());
        Ok(detections)
    }
}

/// Greedy class-agnostic non-maximum suppression
///
/// Returns at most `max_detections` boxes in descending confidence.
pub fn apply_nms(
    mut detections: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let mut keep: Vec<RawDetection> = Vec::with_capacity(max_detections.min(detections.len()));
    for detection in detections {
        if keep.len() >= max_detections {
            break;
        }

        let overlaps = keep
            .iter()
            .any(|kept| kept.bbox.iou(&detection.bbox) > iou_threshold);
        if !overlaps {
            keep.push(detection);
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn test_config() -> VisionConfig {
        VisionConfig {
            labels: vec!["person".to_string(), "car".to_string(), "tv".to_string()],
            ..VisionConfig::default()
        }
    }

    fn tensor(rows: &[[f32; 8]]) -> Array2<f32> {
        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Array2::from_shape_vec((rows.len(), 8), flat).unwrap()
    }

    fn detection(label: &str, confidence: f32, bbox: BoundingBox) -> RawDetection {
        RawDetection {
            class_id: 0,
            label: label.to_string(),
            confidence,
            bbox,
        }
    }

    #[test]
    fn test_decode_single_row() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let output = tensor(&[[0.5, 0.5, 0.5, 0.5, 0.9, 0.1, 1.0, 0.0]]);
        let detections = decoder.decode(output.view(), 640, 480).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "car");
        assert_eq!(detections[0].class_id, 1);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(detections[0].bbox, BoundingBox::new(160.0, 120.0, 480.0, 360.0));
    }

    #[test]
    fn test_decode_objectness_below_threshold() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let output = tensor(&[[0.5, 0.5, 0.2, 0.2, 0.3, 0.0, 1.0, 0.0]]);
        assert!(decoder.decode(output.view(), 640, 480).unwrap().is_empty());
    }

    #[test]
    fn test_decode_final_confidence_below_threshold() {
        // 0.6 * 0.5 = 0.30 < 0.35
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let output = tensor(&[[0.5, 0.5, 0.2, 0.2, 0.6, 0.0, 0.5, 0.0]]);
        assert!(decoder.decode(output.view(), 640, 480).unwrap().is_empty());
    }

    #[test]
    fn test_decode_confusable_label_needs_higher_confidence() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        // tv at 0.45 passes the general threshold but not the confusable one
        let low = tensor(&[[0.5, 0.5, 0.2, 0.2, 0.9, 0.0, 0.0, 0.5]]);
        assert!(decoder.decode(low.view(), 640, 480).unwrap().is_empty());

        let high = tensor(&[[0.5, 0.5, 0.2, 0.2, 0.9, 0.0, 0.0, 0.6]]);
        let detections = decoder.decode(high.view(), 640, 480).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "tv");
    }

    #[test]
    fn test_decode_clamps_to_image_bounds() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let output = tensor(&[[0.05, 0.5, 0.2, 0.2, 0.9, 1.0, 0.0, 0.0]]);
        let detections = decoder.decode(output.view(), 100, 100).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox.left, 0.0);
        assert!((detections[0].bbox.right - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_discards_degenerate_boxes() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let output = tensor(&[
            [0.5, 0.5, 0.0, 0.2, 0.9, 1.0, 0.0, 0.0],
            [1.5, 0.5, 0.2, 0.2, 0.9, 1.0, 0.0, 0.0],
        ]);
        assert!(decoder.decode(output.view(), 640, 480).unwrap().is_empty());
    }

    #[test]
    fn test_decode_skips_non_finite_rows() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let output = tensor(&[
            [0.5, 0.5, 0.2, 0.2, f32::NAN, 1.0, 0.0, 0.0],
            [f32::NAN, 0.5, 0.2, 0.2, 0.9, 1.0, 0.0, 0.0],
        ]);
        assert!(decoder.decode(output.view(), 640, 480).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_unexpected_shape() {
        let decoder = YoloDecoder::new(test_config()).unwrap();
        let narrow = Array2::<f32>::zeros((3, 5));
        assert!(matches!(
            decoder.decode(narrow.view(), 640, 480),
            Err(VisionError::Shape(_))
        ));

        let wide = Array2::<f32>::zeros((3, 85));
        assert!(matches!(
            decoder.decode(wide.view(), 640, 480),
            Err(VisionError::Shape(_))
        ));
    }

    #[test]
    fn test_decode_lenient_shape_uses_fallback_label() {
        let config = VisionConfig {
            labels: vec!["person".to_string()],
            strict_shape: false,
            ..VisionConfig::default()
        };
        let decoder = YoloDecoder::new(config).unwrap();
        let output = tensor(&[[0.5, 0.5, 0.2, 0.2, 0.9, 0.0, 0.0, 1.0]]);
        let detections = decoder.decode(output.view(), 640, 480).unwrap();
        assert_eq!(detections[0].label, "object");
    }

    #[test]
    fn test_decoder_rejects_invalid_config() {
        let config = VisionConfig {
            confirmation_threshold: 0,
            ..VisionConfig::default()
        };
        assert!(matches!(YoloDecoder::new(config), Err(VisionError::Config(_))));
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_confidence() {
        let a = detection("car", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let b = detection("car", 0.7, BoundingBox::new(5.0, 5.0, 105.0, 105.0));
        let kept = apply_nms(vec![b, a.clone()], 0.45, 10);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn test_nms_keeps_boxes_below_threshold() {
        let a = detection("car", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let b = detection("car", 0.7, BoundingBox::new(70.0, 0.0, 170.0, 100.0));
        let kept = apply_nms(vec![a, b], 0.45, 10);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_respects_max_detections_and_order() {
        let detections: Vec<RawDetection> = (0..20)
            .map(|i| {
                let x = i as f32 * 200.0;
                detection("person", 0.4 + i as f32 * 0.01, BoundingBox::new(x, 0.0, x + 50.0, 50.0))
            })
            .collect();
        let kept = apply_nms(detections, 0.45, 10);
        assert_eq!(kept.len(), 10);
        assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!((kept[0].confidence - 0.59).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(apply_nms(vec![], 0.45, 10).is_empty());
    }
}
