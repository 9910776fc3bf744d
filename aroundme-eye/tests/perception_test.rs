//! Decode → confirm → classify tests for aroundme-eye

use aroundme_eye::config::VisionConfig;
use aroundme_eye::models::YoloDecoder;
use aroundme_eye::processing::{ConfirmationFilter, DistanceTier, Position, SpatialClassifier};
use ndarray::Array2;

const CLASSES: usize = 80;
const CAR: usize = 2;
const REFRIGERATOR: usize = 72;

fn coco_row(cx: f32, cy: f32, w: f32, h: f32, objectness: f32, class: usize, score: f32) -> Vec<f32> {
    let mut row = vec![cx, cy, w, h, objectness];
    let mut scores = vec![0.0; CLASSES];
    scores[class] = score;
    row.extend(scores);
    row
}

fn tensor(rows: Vec<Vec<f32>>) -> Array2<f32> {
    let n = rows.len();
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, 5 + CLASSES), flat).unwrap()
}

#[test]
fn test_decoder_never_exceeds_max_detections() {
    let decoder = YoloDecoder::new(VisionConfig::default()).unwrap();
    // 30 disjoint boxes on a 6x5 grid
    let rows: Vec<Vec<f32>> = (0..30)
        .map(|i| {
            let cx = 0.1 + (i % 6) as f32 * 0.16;
            let cy = 0.1 + (i / 6) as f32 * 0.2;
            coco_row(cx, cy, 0.05, 0.05, 0.5 + i as f32 * 0.01, 0, 1.0)
        })
        .collect();

    let detections = decoder.decode(tensor(rows).view(), 640, 480).unwrap();
    assert_eq!(detections.len(), 10);
    assert!(detections
        .windows(2)
        .all(|pair| pair[0].confidence >= pair[1].confidence));
}

#[test]
fn test_overlapping_boxes_collapse_to_highest_confidence() {
    let decoder = YoloDecoder::new(VisionConfig::default()).unwrap();
    let rows = vec![
        coco_row(0.5, 0.5, 0.4, 0.4, 0.7, CAR, 1.0),
        coco_row(0.51, 0.5, 0.4, 0.4, 0.9, CAR, 1.0),
        coco_row(0.1, 0.1, 0.1, 0.1, 0.6, 0, 1.0),
    ];

    let detections = decoder.decode(tensor(rows).view(), 640, 480).unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].label, "car");
    assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    assert_eq!(detections[1].label, "person");
}

#[test]
fn test_refrigerator_needs_half_confidence() {
    let decoder = YoloDecoder::new(VisionConfig::default()).unwrap();
    let rows = vec![coco_row(0.5, 0.5, 0.3, 0.6, 0.8, REFRIGERATOR, 0.55)];
    // 0.8 * 0.55 = 0.44
    assert!(decoder.decode(tensor(rows).view(), 640, 480).unwrap().is_empty());
}

#[test]
fn test_car_confirmed_and_classified_on_second_frame() {
    let config = VisionConfig::default();
    let decoder = YoloDecoder::new(config.clone()).unwrap();
    let mut filter = ConfirmationFilter::new(config.confirmation_threshold).unwrap();
    let classifier = SpatialClassifier::new(&config).unwrap();

    // 0.5 x 0.8 of the frame covers 40% of its area
    let output = tensor(vec![coco_row(0.5, 0.5, 0.5, 0.8, 0.9, CAR, 1.0)]);

    let first = decoder.decode(output.view(), 640, 480).unwrap();
    assert!(filter.update(first).is_empty());

    let second = decoder.decode(output.view(), 640, 480).unwrap();
    let confirmed = filter.update(second);
    let enriched = classifier.classify_all(confirmed, 640, 480);

    assert_eq!(enriched.len(), 1);
    assert_eq!(enriched[0].position, Position::Center);
    assert_eq!(enriched[0].distance_tier, DistanceTier::Danger);
    assert_eq!(enriched[0].description, "Car in front of you, very close");
}
