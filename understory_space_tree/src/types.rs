// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

/// A point in 2D.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Point2D<T> {
    /// Horizontal coordinate.
    pub x: T,
    /// Vertical coordinate.
    pub y: T,
}

impl<T> Point2D<T> {
    /// Create a new point.
    #[inline(always)]
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in 2D.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Aabb2D<T> {
    /// Minimum x (left)
    pub min_x: T,
    /// Minimum y (top)
    pub min_y: T,
    /// Maximum x (right)
    pub max_x: T,
    /// Maximum y (bottom)
    pub max_y: T,
}

impl<T> Aabb2D<T> {
    /// Create a new AABB from min/max corners.
    #[inline(always)]
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Copy + PartialOrd> Aabb2D<T> {
    /// Whether this AABB contains the point. Edges are inclusive.
    #[inline]
    pub fn contains_point(&self, x: T, y: T) -> bool {
        self.min_x <= x && self.min_y <= y && x <= self.max_x && y <= self.max_y
    }

    /// The point inside this AABB closest to `(x, y)`.
    ///
    /// Points already inside the box are returned unchanged.
    #[inline]
    pub fn clamp_point(&self, x: T, y: T) -> Point2D<T> {
        Point2D::new(
            min_t(max_t(x, self.min_x), self.max_x),
            min_t(max_t(y, self.min_y), self.max_y),
        )
    }
}

impl<T: Scalar> Aabb2D<T> {
    /// One of the four equal quadrants of this AABB.
    ///
    /// Bit 0 of `i` selects the right half, bit 1 the bottom half. Each child
    /// edge is either an edge of `self` or the shared midpoint, so the four
    /// quadrants tile `self` without gaps.
    #[inline]
    pub fn quadrant(&self, i: usize) -> Self {
        let mid_x = T::mid(self.min_x, self.max_x);
        let mid_y = T::mid(self.min_y, self.max_y);
        let (min_x, max_x) = if i & 1 == 0 {
            (self.min_x, mid_x)
        } else {
            (mid_x, self.max_x)
        };
        let (min_y, max_y) = if (i >> 1) & 1 == 0 {
            (self.min_y, mid_y)
        } else {
            (mid_y, self.max_y)
        };
        Self::new(min_x, min_y, max_x, max_y)
    }
}

/// Numeric scalar abstraction for the default Euclidean geometry.
///
/// Squared distances are computed in an associated widened accumulator type
/// (e.g., f32→f64, i64→i128) so that they neither lose precision nor overflow.
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type suitable for squared distances.
    type Acc: Copy
        + PartialOrd
        + core::ops::Add<Output = Self::Acc>
        + core::ops::Sub<Output = Self::Acc>
        + core::ops::Mul<Output = Self::Acc>
        + Debug;

    /// Midpoint between a and b (used for subdivision).
    fn mid(a: Self, b: Self) -> Self;

    /// Convert a scalar to the accumulator type.
    fn widen(v: Self) -> Self::Acc;
}

impl Scalar for f32 {
    type Acc = f64;

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        f64::from(v)
    }
}

impl Scalar for f64 {
    type Acc = Self;

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }

    #[inline(always)]
    fn widen(v: Self) -> Self::Acc {
        v
    }
}

impl Scalar for i64 {
    type Acc = i128;

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        // Average without overflow: (a & b) + ((a ^ b) >> 1)
        (a & b) + ((a ^ b) >> 1)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        i128::from(v)
    }
}

/// Helper alias for the widened accumulator type `Scalar::Acc` associated with a `T: Scalar`.
pub type ScalarAcc<T> = <T as Scalar>::Acc;

/// Items that have a position in 2D.
///
/// This is what the default [`Euclidean`][crate::Euclidean] geometry needs
/// from an item: it measures and partitions by position only.
pub trait Located {
    /// Coordinate type.
    type Scalar: Scalar;

    /// The item's current position.
    fn position(&self) -> Point2D<Self::Scalar>;
}

impl<T: Scalar> Located for Point2D<T> {
    type Scalar = T;

    #[inline(always)]
    fn position(&self) -> Self {
        *self
    }
}

/// Squared distance between two points, in the widened accumulator type.
#[inline]
pub fn distance_squared<T: Scalar>(a: Point2D<T>, b: Point2D<T>) -> ScalarAcc<T> {
    let dx = T::widen(a.x) - T::widen(b.x);
    let dy = T::widen(a.y) - T::widen(b.y);
    dx * dx + dy * dy
}

#[cfg(feature = "kurbo")]
mod kurbo_interop {
    use super::{Aabb2D, Located, Point2D};

    impl Located for kurbo::Point {
        type Scalar = f64;

        #[inline]
        fn position(&self) -> Point2D<f64> {
            Point2D::new(self.x, self.y)
        }
    }

    impl From<kurbo::Point> for Point2D<f64> {
        fn from(p: kurbo::Point) -> Self {
            Self::new(p.x, p.y)
        }
    }

    impl From<kurbo::Rect> for Aabb2D<f64> {
        /// Converts using the rectangle's normalized (min/max ordered) corners.
        fn from(r: kurbo::Rect) -> Self {
            let r = r.abs();
            Self::new(r.x0, r.y0, r.x1, r.y1)
        }
    }
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}
