// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Space Tree: a generic in-memory spatial tree with nearest-neighbor queries.
//!
//! - Insert, remove, and re-position items; each item gets a stable generational [`Key`].
//! - Query the `k` nearest items to any probe with a best-first branch-and-bound search.
//! - Rebuild after bulk movement with [`SpaceTree::reindex`], which keeps the learned
//!   partition and only re-slots items.
//!
//! The tree is generic over the item type and a pluggable [`Geometry`] that supplies the
//! metric (`distance`), region membership (`contains`), an admissible lower bound to a
//! region (`min_distance`), and the partition of a region into children (`subdivide`).
//! The default [`Euclidean`] geometry is a quadtree over anything that is [`Located`] in 2D,
//! using squared distances in a widened accumulator (f32→f64, f64→f64, i64→i128).
//!
//! Leaves hold up to `capacity` items and subdivide when they overflow; branches collapse back
//! into a leaf when removals leave them with `capacity` items or fewer. A reverse index from
//! key to leaf makes removal and update independent of tree size. Subdivision stops at
//! [`SpaceTreeConfig::max_depth`], so many coincident items end up sharing one over-full leaf
//! instead of recursing forever.
//!
//! ## Features
//!
//! - `kurbo`: implements [`Located`] for `kurbo::Point` and converts `kurbo::Rect` into
//!   [`Aabb2D<f64>`].
//!
//! # Example
//!
//! ```rust
//! use understory_space_tree::{Aabb2D, Point2D, SpaceTree};
//!
//! let mut tree: SpaceTree<Point2D<f32>> =
//!     SpaceTree::new(2, Aabb2D::new(-1.0, -1.0, 1.0, 1.0)).unwrap();
//! let keys = tree.initialize([
//!     Point2D::new(0.0, 0.0),
//!     Point2D::new(0.1, 0.0),
//!     Point2D::new(0.9, 0.9),
//! ]);
//!
//! // Three items with capacity 2: the root has subdivided.
//! assert_eq!(tree.is_leaf(tree.root()), Some(false));
//!
//! let near = tree.nearest_k(&Point2D::new(0.05, 0.0), 2);
//! assert_eq!(near.len(), 2);
//! assert!(near[0].distance <= near[1].distance);
//!
//! // Move every item, then rebuild once.
//! for (_, p) in tree.iter_mut() {
//!     p.x = -p.x;
//! }
//! tree.reindex();
//! let hit = tree.nearest_one(&Point2D::new(-0.9, 0.9)).unwrap();
//! assert_eq!(hit.key, keys[2]);
//! ```
//!
//! A custom geometry changes what "near" means without touching the tree. Here a
//! split of a 1D interval into eight equal slices:
//!
//! ```rust
//! use understory_space_tree::{Geometry, SpaceTree, SpaceTreeConfig};
//!
//! #[derive(Debug)]
//! struct Line;
//!
//! impl Geometry<f64> for Line {
//!     type Bounds = (f64, f64);
//!     type Distance = f64;
//!
//!     fn distance(&self, a: &f64, b: &f64) -> f64 {
//!         (a - b).abs()
//!     }
//!     fn contains(&self, x: &f64, b: &(f64, f64)) -> bool {
//!         b.0 <= *x && *x <= b.1
//!     }
//!     fn min_distance(&self, x: &f64, b: &(f64, f64)) -> f64 {
//!         (b.0 - x).max(x - b.1).max(0.0)
//!     }
//!     fn subdivide(&self, b: &(f64, f64), i: usize) -> (f64, f64) {
//!         let w = (b.1 - b.0) / 8.0;
//!         let lo = if i == 0 { b.0 } else { b.0 + w * i as f64 };
//!         let hi = if i == 7 { b.1 } else { b.0 + w * (i + 1) as f64 };
//!         (lo, hi)
//!     }
//!     fn fan_out(&self) -> usize {
//!         8
//!     }
//! }
//!
//! let config = SpaceTreeConfig::new(1).with_fan_out(8);
//! let mut tree: SpaceTree<f64, Line> =
//!     SpaceTree::with_geometry(config, (0.0, 80.0), Line).unwrap();
//! for x in [3.0, 17.5, 42.0, 44.0, 79.0] {
//!     tree.insert(x);
//! }
//! let hit = tree.nearest_one(&45.0).unwrap();
//! assert_eq!(tree.get(hit.key), Some(&44.0));
//! ```
//!
//! ### Concurrency
//!
//! All mutation takes `&mut self` and all queries take `&self`. Positions may be computed in
//! parallel elsewhere, but must be written back before the next [`SpaceTree::update`] or
//! [`SpaceTree::reindex`].
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Incomparable distances are
//! treated as ties.

#![no_std]

extern crate alloc;

mod config;
mod geometry;
mod nearest;
mod node;
mod tree;
mod types;

pub use config::{ConfigError, SpaceTreeConfig};
pub use geometry::{Euclidean, Geometry};
pub use nearest::Neighbor;
pub use node::NodeId;
pub use tree::{Key, SpaceTree};
pub use types::{Aabb2D, Located, Point2D, Scalar, ScalarAcc, distance_squared};
