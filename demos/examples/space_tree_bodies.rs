// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A toy body simulation driven by a space tree.
//!
//! Each tick advances every body independently, then calls
//! [`SpaceTree::reindex`] once instead of updating bodies one by one. Contacts
//! are found with a filtered nearest-neighbor query under a custom geometry
//! that measures the gap between body surfaces.
//!
//! Run:
//! - `cargo run -p understory_examples --example space_tree_bodies`

use std::collections::HashSet;

use kurbo::{Point, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;
use understory_space_tree::{Aabb2D, Geometry, Key, Located, Point2D, SpaceTree, SpaceTreeConfig};

const BODIES: usize = 2_000;
const TICKS: usize = 20;
const DT: f64 = 0.01;

#[derive(Clone, Copy, Debug)]
struct Body {
    position: Point,
    velocity: Vec2,
    radius: f64,
}

impl Located for Body {
    type Scalar = f64;

    fn position(&self) -> Point2D<f64> {
        self.position.into()
    }
}

/// Surface-to-surface gap between bodies, partitioned by center position.
#[derive(Clone, Copy, Debug)]
struct BodyGeometry {
    /// Largest radius of any body in the tree. Keeps `min_distance` a lower
    /// bound for every body a region may hold.
    max_radius: f64,
}

impl Geometry<Body> for BodyGeometry {
    type Bounds = Aabb2D<f64>;
    type Distance = f64;

    fn distance(&self, a: &Body, b: &Body) -> f64 {
        (a.position.distance(b.position) - a.radius - b.radius).max(0.0)
    }

    fn contains(&self, item: &Body, bounds: &Aabb2D<f64>) -> bool {
        bounds.contains_point(item.position.x, item.position.y)
    }

    fn min_distance(&self, item: &Body, bounds: &Aabb2D<f64>) -> f64 {
        let p = item.position;
        let c = bounds.clamp_point(p.x, p.y);
        (p.distance(Point::new(c.x, c.y)) - item.radius - self.max_radius).max(0.0)
    }

    fn subdivide(&self, bounds: &Aabb2D<f64>, child: usize) -> Aabb2D<f64> {
        bounds.quadrant(child)
    }

    fn fan_out(&self) -> usize {
        4
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let max_radius = 0.01;
    let geometry = BodyGeometry { max_radius };
    let mut tree = SpaceTree::with_geometry(
        SpaceTreeConfig::new(4),
        Aabb2D::new(-1.0, -1.0, 1.0, 1.0),
        geometry,
    )
    .unwrap();

    let bodies = (0..BODIES).map(|_| Body {
        position: Point::new(rng.gen_range(-0.9..0.9), rng.gen_range(-0.9..0.9)),
        velocity: Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)),
        radius: rng.gen_range(0.002..max_radius),
    });
    tree.initialize(bodies);
    tracing::info!(bodies = tree.len(), nodes = tree.node_count(), "initialized");

    for tick in 0..TICKS {
        step(&mut tree);
        let contacts = resolve_contacts(&mut tree);
        tracing::info!(
            tick,
            contacts,
            nodes = tree.node_count(),
            depth = tree.depth(),
            "stepped"
        );
    }
}

/// Advance every body, bounce off the walls, then rebuild the tree once.
fn step(tree: &mut SpaceTree<Body, BodyGeometry>) {
    for (_, body) in tree.iter_mut() {
        body.position += body.velocity * DT;
        if body.position.x.abs() > 1.0 {
            body.velocity.x = -body.velocity.x;
            body.position.x = body.position.x.clamp(-1.0, 1.0);
        }
        if body.position.y.abs() > 1.0 {
            body.velocity.y = -body.velocity.y;
            body.position.y = body.position.y.clamp(-1.0, 1.0);
        }
    }
    tree.reindex();
}

/// Find touching pairs and exchange their velocities. Returns the number of
/// pairs resolved.
fn resolve_contacts(tree: &mut SpaceTree<Body, BodyGeometry>) -> usize {
    let mut pairs: Vec<(Key, Key)> = Vec::new();
    let mut paired: HashSet<Key> = HashSet::new();
    for (key, body) in tree.iter() {
        let Some(other) = tree
            .nearest_k_where(body, 1, |k, _| k != key)
            .first()
            .copied()
        else {
            continue;
        };
        // A body takes part in at most one exchange per tick.
        if other.distance == 0.0 && !paired.contains(&key) && !paired.contains(&other.key) {
            paired.insert(key);
            paired.insert(other.key);
            pairs.push((key, other.key));
        }
    }
    for &(a, b) in &pairs {
        let (Some(va), Some(vb)) = (
            tree.get(a).map(|body| body.velocity),
            tree.get(b).map(|body| body.velocity),
        ) else {
            continue;
        };
        if let Some(body) = tree.get_mut(a) {
            body.velocity = vb;
        }
        if let Some(body) = tree.get_mut(b) {
            body.velocity = va;
        }
    }
    pairs.len()
}
