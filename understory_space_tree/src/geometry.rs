// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry trait for spatial tree partitioning and metrics.

use core::fmt::Debug;

use crate::types::{Aabb2D, Located, ScalarAcc, distance_squared};

/// Geometry and metric strategy used by [`SpaceTree`][crate::SpaceTree].
///
/// Implementations must be pure and total: the tree calls these functions
/// during every descent and query and never expects them to fail.
///
/// Two contracts are not checked at runtime and are the implementor's
/// responsibility:
///
/// - **Admissibility**: [`min_distance`][Geometry::min_distance] must never
///   exceed [`distance`][Geometry::distance] from the same item to anything
///   contained in the bounds. A larger value silently breaks nearest-neighbor
///   pruning.
/// - **Partition completeness**: for every item contained in `bounds`, at
///   least one of the [`fan_out`][Geometry::fan_out] regions produced by
///   [`subdivide`][Geometry::subdivide] must contain it. Regions may share
///   edges (the first matching child in index order wins) but must not
///   otherwise overlap.
pub trait Geometry<D> {
    /// Region type for tree nodes.
    type Bounds: Copy + Debug;

    /// Distance type. Only ordering is required.
    type Distance: Copy + PartialOrd + Debug;

    /// Distance between two items.
    fn distance(&self, a: &D, b: &D) -> Self::Distance;

    /// Whether `item` lies within `bounds`.
    fn contains(&self, item: &D, bounds: &Self::Bounds) -> bool;

    /// Lower bound on the distance from `item` to anything inside `bounds`.
    fn min_distance(&self, item: &D, bounds: &Self::Bounds) -> Self::Distance;

    /// Region of child `child` (in `0..fan_out`) of a node covering `bounds`.
    fn subdivide(&self, bounds: &Self::Bounds, child: usize) -> Self::Bounds;

    /// Number of children produced when a region is subdivided.
    fn fan_out(&self) -> usize;
}

/// Default geometry: squared Euclidean distance over 2D positions with
/// quadrant subdivision (a quadtree).
///
/// Works for any item implementing [`Located`]. Distances are squared and
/// computed in the scalar's widened accumulator type, which preserves order
/// and avoids a square root.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Euclidean;

impl<D: Located> Geometry<D> for Euclidean {
    type Bounds = Aabb2D<D::Scalar>;
    type Distance = ScalarAcc<D::Scalar>;

    #[inline]
    fn distance(&self, a: &D, b: &D) -> Self::Distance {
        distance_squared(a.position(), b.position())
    }

    #[inline]
    fn contains(&self, item: &D, bounds: &Self::Bounds) -> bool {
        let p = item.position();
        bounds.contains_point(p.x, p.y)
    }

    #[inline]
    fn min_distance(&self, item: &D, bounds: &Self::Bounds) -> Self::Distance {
        let p = item.position();
        distance_squared(p, bounds.clamp_point(p.x, p.y))
    }

    #[inline]
    fn subdivide(&self, bounds: &Self::Bounds, child: usize) -> Self::Bounds {
        bounds.quadrant(child)
    }

    #[inline(always)]
    fn fan_out(&self) -> usize {
        4
    }
}
