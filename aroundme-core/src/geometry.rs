//! Axis-aligned box geometry shared by the decoder and the classifiers

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Build a box from its center point and size
    pub fn from_center(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            left: center_x - width / 2.0,
            top: center_y - height / 2.0,
            right: center_x + width / 2.0,
            bottom: center_y + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }

    /// True when the box has no positive width or height
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.right <= self.left || self.bottom <= self.top
    }

    /// Clamp every edge into `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: f32, height: f32) -> Self {
        Self {
            left: self.left.clamp(0.0, width),
            top: self.top.clamp(0.0, height),
            right: self.right.clamp(0.0, width),
            bottom: self.bottom.clamp(0.0, height),
        }
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let inter_left = self.left.max(other.left);
        let inter_top = self.top.max(other.top);
        let inter_right = self.right.min(other.right);
        let inter_bottom = self.bottom.min(other.bottom);

        if inter_right <= inter_left || inter_bottom <= inter_top {
            return 0.0;
        }

        (inter_right - inter_left) * (inter_bottom - inter_top)
    }

    /// Intersection over union, 0.0 for disjoint or invalid boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        if !self.is_finite() || !other.is_finite() {
            return 0.0;
        }

        let inter_area = self.intersection_area(other);
        if inter_area <= 0.0 {
            return 0.0;
        }

        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 || !union_area.is_finite() {
            return 0.0;
        }

        let iou = inter_area / union_area;
        if iou.is_finite() {
            iou.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical() {
        let bbox = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        assert!((bbox.iou(&bbox) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        let b = BoundingBox::new(200.0, 200.0, 250.0, 250.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(b.iou(&a), 0.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // 10x10 boxes shifted by 5 on x: inter 50, union 150
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_contained() {
        let outer = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let inner = BoundingBox::new(0.0, 0.0, 5.0, 10.0);
        assert!((outer.iou(&inner) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_iou_invalid_inputs() {
        let valid = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        let nan = BoundingBox::new(f32::NAN, 10.0, 60.0, 60.0);
        let inf = BoundingBox::new(10.0, 10.0, f32::INFINITY, 60.0);
        assert_eq!(valid.iou(&nan), 0.0);
        assert_eq!(valid.iou(&inf), 0.0);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let point = BoundingBox::new(5.0, 5.0, 5.0, 5.0);
        assert_eq!(point.iou(&point), 0.0);
    }

    #[test]
    fn test_from_center_and_dimensions() {
        let bbox = BoundingBox::from_center(50.0, 40.0, 20.0, 10.0);
        assert_eq!(bbox.left, 40.0);
        assert_eq!(bbox.top, 35.0);
        assert_eq!(bbox.width(), 20.0);
        assert_eq!(bbox.height(), 10.0);
        assert_eq!(bbox.area(), 200.0);
        assert_eq!(bbox.center_x(), 50.0);
        assert_eq!(bbox.center_y(), 40.0);
    }

    #[test]
    fn test_clamp_to_image() {
        let bbox = BoundingBox::new(-10.0, -5.0, 700.0, 500.0).clamp_to(640.0, 480.0);
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_clamp_outside_becomes_degenerate() {
        let bbox = BoundingBox::new(700.0, 10.0, 800.0, 50.0).clamp_to(640.0, 480.0);
        assert!(bbox.is_degenerate());
    }

    #[test]
    fn test_negative_size_is_degenerate() {
        let bbox = BoundingBox::new(10.0, 10.0, 5.0, 20.0);
        assert!(bbox.is_degenerate());
        assert_eq!(bbox.width(), 0.0);
        assert_eq!(bbox.area(), 0.0);
    }
}
