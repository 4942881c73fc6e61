// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Space tree basics: insert, nearest queries, update, remove.
//!
//! Run:
//! - `cargo run -p understory_examples --example space_tree_basics`
//!
//! Set `RUST_LOG=debug` to watch leaves subdivide and collapse.

use kurbo::{Point, Rect};
use tracing_subscriber::EnvFilter;
use understory_space_tree::{Aabb2D, SpaceTree};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let bounds: Aabb2D<f64> = Rect::new(-1.0, -1.0, 1.0, 1.0).into();
    let mut tree: SpaceTree<Point> = SpaceTree::new(2, bounds).unwrap();

    let origin = tree.insert(Point::new(0.0, 0.0));
    let right = tree.insert(Point::new(0.1, 0.0));
    let corner = tree.insert(Point::new(0.9, 0.9));
    println!(
        "3 items, capacity 2: root is a leaf? {:?}, {} nodes",
        tree.is_leaf(tree.root()),
        tree.node_count()
    );

    let hit = tree.nearest_one(&Point::ZERO).unwrap();
    assert_eq!(hit.key, origin);
    println!("nearest to origin: {:?} at squared distance {}", tree.get(hit.key), hit.distance);

    for n in tree.nearest_k(&Point::new(0.5, 0.5), 3) {
        println!("  {:?} -> {:.3}", tree.get(n.key).unwrap(), n.distance);
    }

    // Move one item and tell the tree.
    *tree.get_mut(corner).unwrap() = Point::new(-0.8, 0.7);
    tree.update(corner);
    let hit = tree.nearest_one(&Point::new(-1.0, 1.0)).unwrap();
    assert_eq!(hit.key, corner);

    // Removal collapses the now-sparse branch.
    tree.remove(right);
    println!(
        "after remove: {} items, root is a leaf? {:?}",
        tree.len(),
        tree.is_leaf(tree.root())
    );
    println!("{tree:?}");
}
