use crate::bbox::{BBox, Ltwh};
use nalgebra as na;

/// Non-vertical line `y = intercept + slope * x` in normalized frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub slope: f32,
    pub intercept: f32,
}

impl Boundary {
    /// Line through two endpoints, `None` when the segment is vertical or not finite.
    pub fn through(p0: na::Point2<f32>, p1: na::Point2<f32>) -> Option<Self> {
        let dx = p1.x - p0.x;
        if dx.abs() < f32::EPSILON {
            return None;
        }

        let slope = (p1.y - p0.y) / dx;
        let intercept = p0.y - p0.x * slope;

        if !slope.is_finite() || !intercept.is_finite() {
            return None;
        }

        Some(Self { slope, intercept })
    }

    #[inline]
    pub fn y_at(&self, x: f32) -> f32 {
        self.intercept + self.slope * x
    }

    #[inline]
    pub fn is_above(&self, bbox: &BBox<Ltwh>) -> bool {
        let c = bbox.center();
        c.y < self.y_at(c.x)
    }
}

/// `true` when the box center has a smaller `y` than the line at the same `x`.
#[inline]
pub fn center_above_line(bbox: &BBox<Ltwh>, y_intercept: f32, slope: f32) -> bool {
    let c = bbox.center();
    c.y < y_intercept + slope * c.x
}

#[inline]
pub fn iou(a: &BBox<Ltwh>, b: &BBox<Ltwh>) -> f32 {
    a.iou(b)
}

#[inline]
pub fn contains_mutually(a: &BBox<Ltwh>, b: &BBox<Ltwh>) -> bool {
    a.contains_mutually(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn centered(cx: f32, cy: f32) -> BBox<Ltwh> {
        BBox::ltwh(cx - 0.05, cy - 0.05, 0.1, 0.1)
    }

    #[test]
    fn test_boundary_through() {
        let b = Boundary::through(na::Point2::new(0.0, 0.7), na::Point2::new(1.0, 0.4)).unwrap();
        assert_relative_eq!(b.slope, -0.3, epsilon = 1e-6);
        assert_relative_eq!(b.intercept, 0.7, epsilon = 1e-6);
        assert_relative_eq!(b.y_at(0.5), 0.55, epsilon = 1e-6);
    }

    #[test]
    fn test_boundary_offset_origin() {
        let b = Boundary::through(na::Point2::new(0.2, 0.2), na::Point2::new(0.6, 0.6)).unwrap();
        assert_relative_eq!(b.slope, 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.intercept, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vertical_boundary_rejected() {
        assert!(Boundary::through(na::Point2::new(0.5, 0.0), na::Point2::new(0.5, 1.0)).is_none());
    }

    #[test]
    fn test_center_above_line() {
        // horizontal line at y = 0.5
        assert!(center_above_line(&centered(0.3, 0.2), 0.5, 0.0));
        assert!(!center_above_line(&centered(0.3, 0.8), 0.5, 0.0));

        // sloped line y = 0.9 - 0.8x, at x = 0.5 the line sits at 0.5
        assert!(center_above_line(&centered(0.5, 0.45), 0.9, -0.8));
        assert!(!center_above_line(&centered(0.5, 0.95), 0.9, -0.8));
    }

    #[test]
    fn test_boundary_agrees_with_free_fn() {
        let b = Boundary::through(na::Point2::new(0.0, 0.9), na::Point2::new(1.0, 0.1)).unwrap();
        for &(cx, cy) in &[(0.5, 0.45), (0.5, 0.95), (0.1, 0.2), (0.9, 0.9)] {
            let bbox = centered(cx, cy);
            assert_eq!(b.is_above(&bbox), center_above_line(&bbox, b.intercept, b.slope));
        }
    }

    #[test]
    fn test_on_line_is_not_above() {
        assert!(!center_above_line(&BBox::ltwh(0.25, 0.25, 0.5, 0.5), 0.5, 0.0));
    }
}
