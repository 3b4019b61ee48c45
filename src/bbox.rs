use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug + Copy {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// Axis-aligned box in normalized frame coordinates, origin top-left, `y` growing downward.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(bound = "", from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

// Serialized form carries no format tag; the type parameter decides how it is read.
impl<F: BBoxFormat> From<[f32; 4]> for BBox<F> {
    fn from(slice: [f32; 4]) -> Self {
        BBox(slice, PhantomData)
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        BBox([left, top, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            self.left() + self.width() / 2.0,
            self.top() + self.height() / 2.0,
        )
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }

    #[inline]
    pub fn iou(&self, other: &BBox<Ltwh>) -> f32 {
        self.as_ltrb().iou(&other.as_ltrb())
    }

    #[inline]
    pub fn contains_mutually(&self, other: &BBox<Ltwh>) -> bool {
        self.as_ltrb().contains_mutually(&other.as_ltrb())
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom], PhantomData)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        (self.right() - self.left()).max(0.0) * (self.bottom() - self.top()).max(0.0)
    }

    /// Intersection over union, `0.0` for disjoint or degenerate boxes.
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let i_w = self.right().min(other.right()) - self.left().max(other.left());
        let i_h = self.bottom().min(other.bottom()) - self.top().max(other.top());

        if i_w <= 0.0 || i_h <= 0.0 {
            return 0.0;
        }

        let i_area = i_w * i_h;
        let union = self.area() + other.area() - i_area;

        if union <= 0.0 {
            0.0
        } else {
            (i_area / union).clamp(0.0, 1.0)
        }
    }

    /// `true` if `other` lies fully inside `self` on both axes.
    #[inline]
    pub fn contains(&self, other: &BBox<Ltrb>) -> bool {
        self.left() <= other.left()
            && self.right() >= other.right()
            && self.top() <= other.top()
            && self.bottom() >= other.bottom()
    }

    // IoU under-detects a track box that fully encloses a shrunk detection, so
    // containment in either direction also counts as overlap.
    #[inline]
    pub fn contains_mutually(&self, other: &BBox<Ltrb>) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] + v.0[0], v.0[3] + v.0[1]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            PhantomData,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_iou_identical() {
        let a = BBox::ltwh(0.1, 0.1, 0.2, 0.2);
        assert_relative_eq!(a.iou(&a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BBox::ltwh(0.0, 0.0, 0.1, 0.1);
        let b = BBox::ltwh(0.5, 0.5, 0.1, 0.1);
        assert_eq!(a.iou(&b), 0.0);

        // touching edges share no area
        let c = BBox::ltwh(0.1, 0.0, 0.1, 0.1);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_iou_half_shift() {
        let a = BBox::ltwh(0.0, 0.0, 0.2, 0.2);
        let b = BBox::ltwh(0.1, 0.0, 0.2, 0.2);
        // intersection 0.02, union 0.06
        assert_relative_eq!(a.iou(&b), 1.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_contains_mutually() {
        let outer = BBox::ltwh(0.1, 0.1, 0.4, 0.4);
        let inner = BBox::ltwh(0.2, 0.2, 0.1, 0.1);
        let aside = BBox::ltwh(0.45, 0.2, 0.1, 0.1);

        assert!(outer.contains_mutually(&inner));
        assert!(inner.contains_mutually(&outer));
        assert!(!outer.contains_mutually(&aside));
        assert!(outer.iou(&inner) < 0.5);
    }

    #[test]
    fn test_center() {
        let b = BBox::ltwh(0.1, 0.2, 0.4, 0.2);
        let c = b.center();
        assert_relative_eq!(c.x, 0.3, epsilon = 1e-6);
        assert_relative_eq!(c.y, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_ltrb_roundtrip_keeps_coordinates() {
        let b = BBox::ltwh(0.25, 0.5, 0.25, 0.125);
        let r = b.as_ltrb();
        assert_eq!(r.as_slice(), &[0.25, 0.5, 0.5, 0.625]);
        assert_eq!(r.as_ltwh(), b);
    }

    fn any_box() -> impl Strategy<Value = BBox<Ltwh>> {
        (0.0f32..0.9, 0.0f32..0.9, 0.01f32..0.5, 0.01f32..0.5)
            .prop_map(|(l, t, w, h)| BBox::ltwh(l, t, w, h))
    }

    proptest! {
        #[test]
        fn test_iou_bounded_and_symmetric(a in any_box(), b in any_box()) {
            let ab = a.iou(&b);
            let ba = b.iou(&a);
            prop_assert!((0.0..=1.0).contains(&ab));
            prop_assert!((ab - ba).abs() < 1e-6);
        }
    }
}
