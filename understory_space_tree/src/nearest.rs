// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Best-first k-nearest-neighbor search.
//!
//! The search keeps two heaps: a bounded max-heap of the best `k` items seen
//! so far, and a min-heap frontier of unexplored nodes keyed by their
//! [`min_distance`][crate::Geometry::min_distance] lower bound. Nodes are
//! expanded closest-bound first; as soon as the closest remaining bound is no
//! better than the current `k`-th best distance, nothing left in the frontier
//! can improve the result and the search stops.

use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::{Ordering, Reverse};

use crate::geometry::Geometry;
use crate::node::{NodeId, NodeKind};
use crate::tree::{Key, SpaceTree};

/// An item returned by a nearest-neighbor query.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Neighbor<T> {
    /// The item's key.
    pub key: Key,
    /// Distance from the query, as measured by the geometry.
    pub distance: T,
}

/// Heap entry ordered by distance only.
#[derive(Copy, Clone, Debug)]
struct Ranked<T, V> {
    distance: T,
    value: V,
}

impl<T: PartialOrd, V> PartialEq for Ranked<T, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: PartialOrd, V> Eq for Ranked<T, V> {}

impl<T: PartialOrd, V> PartialOrd for Ranked<T, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: PartialOrd, V> Ord for Ranked<T, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Incomparable distances (NaN) are treated as ties.
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// The best `k` items seen so far.
struct Candidates<T> {
    heap: BinaryHeap<Ranked<T, Key>>,
    k: usize,
    /// Distance of the `k`-th best candidate; `None` (unbounded) until `k`
    /// candidates are known.
    worst: Option<T>,
}

impl<T: Copy + PartialOrd> Candidates<T> {
    fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            worst: None,
        }
    }

    /// Whether a region whose lower bound is `bound` may still hold a better item.
    fn admits_bound(&self, bound: T) -> bool {
        self.worst.is_none_or(|w| bound < w)
    }

    fn offer(&mut self, distance: T, key: Key) {
        if self.worst.is_some_and(|w| distance > w) {
            return;
        }
        self.heap.push(Ranked {
            distance,
            value: key,
        });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
        if self.heap.len() == self.k {
            self.worst = self.heap.peek().map(|r| r.distance);
        }
    }

    fn into_sorted(self) -> Vec<Neighbor<T>> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| Neighbor {
                key: r.value,
                distance: r.distance,
            })
            .collect()
    }
}

impl<D, G: Geometry<D>> SpaceTree<D, G> {
    /// The item closest to `query`, or `None` if the tree is empty.
    pub fn nearest_one(&self, query: &D) -> Option<Neighbor<G::Distance>> {
        self.nearest_k(query, 1).first().copied()
    }

    /// Up to `k` items closest to `query`, in ascending order of distance.
    ///
    /// Fewer than `k` results are returned when the tree holds fewer items.
    /// Items at equal distance are returned in an unspecified order.
    pub fn nearest_k(&self, query: &D, k: usize) -> Vec<Neighbor<G::Distance>> {
        self.nearest_k_where(query, k, |_, _| true)
    }

    /// Like [`nearest_k`][Self::nearest_k], but only items for which
    /// `filter(key, item)` returns `true` are considered.
    ///
    /// A common use is excluding the query item itself:
    ///
    /// ```rust
    /// use understory_space_tree::{Aabb2D, Point2D, SpaceTree};
    ///
    /// let mut tree: SpaceTree<Point2D<i64>> =
    ///     SpaceTree::new(4, Aabb2D::new(0, 0, 100, 100)).unwrap();
    /// let me = tree.insert(Point2D::new(10, 10));
    /// let other = tree.insert(Point2D::new(20, 10));
    ///
    /// let query = *tree.get(me).unwrap();
    /// let hits = tree.nearest_k_where(&query, 1, |key, _| key != me);
    /// assert_eq!(hits[0].key, other);
    /// assert_eq!(hits[0].distance, 100);
    /// ```
    pub fn nearest_k_where<F>(
        &self,
        query: &D,
        k: usize,
        mut filter: F,
    ) -> Vec<Neighbor<G::Distance>>
    where
        F: FnMut(Key, &D) -> bool,
    {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let mut best = Candidates::new(k);
        let mut offer_all = |keys: &[Key], best: &mut Candidates<G::Distance>| {
            for &key in keys {
                let item = self.item(key);
                if filter(key, item) {
                    best.offer(self.geometry.distance(query, item), key);
                }
            }
        };

        offer_all(self.outside.as_slice(), &mut best);

        let root = self.nodes.node(self.root);
        let mut frontier: BinaryHeap<Reverse<Ranked<G::Distance, NodeId>>> = BinaryHeap::new();
        frontier.push(Reverse(Ranked {
            distance: self.geometry.min_distance(query, &root.bounds),
            value: self.root,
        }));

        while let Some(Reverse(Ranked {
            distance: bound,
            value: id,
        })) = frontier.pop()
        {
            if !best.admits_bound(bound) {
                break;
            }
            match &self.nodes.node(id).kind {
                NodeKind::Branch { children, .. } => {
                    for &child in children {
                        let node = self.nodes.node(child);
                        if node.len() == 0 {
                            continue;
                        }
                        let bound = self.geometry.min_distance(query, &node.bounds);
                        if best.admits_bound(bound) {
                            frontier.push(Reverse(Ranked {
                                distance: bound,
                                value: child,
                            }));
                        }
                    }
                }
                NodeKind::Leaf(items) => offer_all(items.as_slice(), &mut best),
            }
        }

        best.into_sorted()
    }
}
