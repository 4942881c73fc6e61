// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `SpaceTree` API: item storage, insertion, removal, and rebuilds.

use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;

use crate::config::{ConfigError, SpaceTreeConfig};
use crate::geometry::{Euclidean, Geometry};
use crate::node::{NodeArena, NodeId, NodeKind};
use crate::types::{Aabb2D, Located};

/// Generational handle for items.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(u32, u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Item slots are addressed with 32-bit indices."
    )]
    pub(crate) const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Where an indexed item currently lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Location {
    Leaf(NodeId),
    /// Not contained by the root bounds; slot in the overflow list.
    Outside(usize),
}

/// A spatial tree over items of type `D`, partitioned by the geometry `G`.
///
/// The tree owns its items and hands out generational [`Key`]s. Two items at
/// the same position are distinct entries with distinct keys.
///
/// Nodes are leaves holding up to `capacity` item keys, or branches with
/// exactly `fan_out` children covering the regions produced by
/// [`Geometry::subdivide`]. A leaf that overflows subdivides; a branch whose
/// subtree shrinks to `capacity` items or fewer collapses back into a leaf.
/// A reverse index maps every key to its current leaf, so removals and
/// updates never search the tree.
///
/// Positions are read from the items themselves. After changing an item
/// through [`get_mut`][Self::get_mut] or [`iter_mut`][Self::iter_mut], call
/// [`update`][Self::update] for that item or [`reindex`][Self::reindex] for
/// all of them before querying again; until then the item stays in its old
/// leaf and nearest-neighbor pruning may skip it.
///
/// Items outside the root bounds are accepted and kept in an overflow list
/// that every query scans.
///
/// ## Example
///
/// ```rust
/// use understory_space_tree::{Aabb2D, Point2D, SpaceTree};
///
/// let mut tree: SpaceTree<Point2D<f64>> =
///     SpaceTree::new(2, Aabb2D::new(-1.0, -1.0, 1.0, 1.0)).unwrap();
/// let a = tree.insert(Point2D::new(0.0, 0.0));
/// let _b = tree.insert(Point2D::new(0.1, 0.0));
/// let _c = tree.insert(Point2D::new(0.9, 0.9));
///
/// let hit = tree.nearest_one(&Point2D::new(0.01, 0.0)).unwrap();
/// assert_eq!(hit.key, a);
///
/// // Move `a` and tell the tree about it.
/// *tree.get_mut(a).unwrap() = Point2D::new(-0.9, -0.9);
/// assert!(tree.update(a));
/// assert_eq!(tree.nearest_one(&Point2D::new(-1.0, -1.0)).unwrap().key, a);
/// ```
pub struct SpaceTree<D, G: Geometry<D> = Euclidean> {
    pub(crate) geometry: G,
    pub(crate) config: SpaceTreeConfig,
    pub(crate) root_bounds: G::Bounds,
    /// item slots
    pub(crate) entries: Vec<Option<D>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    pub(crate) nodes: NodeArena<G::Bounds>,
    pub(crate) root: NodeId,
    locations: HashMap<Key, Location>,
    pub(crate) outside: Vec<Key>,
}

impl<D, G: Geometry<D> + Debug> Debug for SpaceTree<D, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpaceTree")
            .field("geometry", &self.geometry)
            .field("config", &self.config)
            .field("root_bounds", &self.root_bounds)
            .field("items", &self.len())
            .field("outside", &self.outside.len())
            .field("nodes", &self.nodes.live())
            .finish_non_exhaustive()
    }
}

impl<D: Located> SpaceTree<D, Euclidean> {
    /// Create an empty quadtree over `root_bounds` with the given leaf
    /// capacity and the default [`Euclidean`] geometry.
    ///
    /// Fails if `capacity` is zero.
    pub fn new(capacity: usize, root_bounds: Aabb2D<D::Scalar>) -> Result<Self, ConfigError> {
        Self::with_geometry(SpaceTreeConfig::new(capacity), root_bounds, Euclidean)
    }
}

impl<D, G: Geometry<D>> SpaceTree<D, G> {
    /// Create an empty tree with an explicit configuration and geometry.
    ///
    /// Fails if the configuration is invalid or its fan-out does not match
    /// [`Geometry::fan_out`].
    pub fn with_geometry(
        config: SpaceTreeConfig,
        root_bounds: G::Bounds,
        geometry: G,
    ) -> Result<Self, ConfigError> {
        config.validate(geometry.fan_out())?;
        let mut nodes = NodeArena::new();
        let root = nodes.reset_to_leaf(root_bounds);
        Ok(Self {
            geometry,
            config,
            root_bounds,
            entries: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            nodes,
            root,
            locations: HashMap::new(),
            outside: Vec::new(),
        })
    }

    /// The tree's configuration.
    pub fn config(&self) -> SpaceTreeConfig {
        self.config
    }

    /// The tree's geometry.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Region covered by the root node.
    pub fn root_bounds(&self) -> G::Bounds {
        self.root_bounds
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Reserve space for at least `n` more items.
    pub fn reserve(&mut self, n: usize) {
        self.entries.reserve(n);
        self.generations.reserve(n);
        self.locations.reserve(n);
    }

    /// Whether `key` refers to an indexed item.
    pub fn contains_key(&self, key: Key) -> bool {
        self.locations.contains_key(&key)
    }

    /// Borrow an item.
    pub fn get(&self, key: Key) -> Option<&D> {
        if *self.generations.get(key.idx())? != key.1 {
            return None;
        }
        self.entries.get(key.idx())?.as_ref()
    }

    /// Mutably borrow an item.
    ///
    /// If the change moves the item, follow up with [`update`][Self::update]
    /// or [`reindex`][Self::reindex].
    pub fn get_mut(&mut self, key: Key) -> Option<&mut D> {
        if *self.generations.get(key.idx())? != key.1 {
            return None;
        }
        self.entries.get_mut(key.idx())?.as_mut()
    }

    /// Iterate over all items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &D)> + '_ {
        self.entries
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(i, (e, &g))| e.as_ref().map(|d| (Key::new(i, g), d)))
    }

    /// Mutably iterate over all items in slot order.
    ///
    /// This is the bulk counterpart of [`get_mut`][Self::get_mut]: move
    /// everything, then call [`reindex`][Self::reindex] once.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Key, &mut D)> + '_ {
        self.entries
            .iter_mut()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(i, (e, &g))| e.as_mut().map(|d| (Key::new(i, g), d)))
    }

    /// Insert an item and return its key.
    pub fn insert(&mut self, item: D) -> Key {
        let key = if let Some(idx) = self.free_list.pop() {
            self.entries[idx] = Some(item);
            Key::new(idx, self.generations[idx])
        } else {
            self.entries.push(Some(item));
            self.generations.push(1);
            Key::new(self.entries.len() - 1, 1)
        };
        self.place(key);
        key
    }

    /// Remove an item and return it, or `None` if `key` is not indexed.
    ///
    /// If this leaves an ancestor branch with `capacity` items or fewer, the
    /// highest such ancestor collapses into a single leaf.
    pub fn remove(&mut self, key: Key) -> Option<D> {
        self.detach(key)?;
        let item = self.entries[key.idx()].take();
        self.generations[key.idx()] = self.generations[key.idx()].wrapping_add(1);
        self.free_list.push(key.idx());
        item
    }

    /// Re-position an item after its data changed.
    ///
    /// Equivalent to removing the item and inserting it again from the root,
    /// except that its key is preserved. Returns `false` if `key` is not
    /// indexed.
    pub fn update(&mut self, key: Key) -> bool {
        if self.detach(key).is_none() {
            return false;
        }
        self.place(key);
        true
    }

    /// Replace an item's data and re-position it.
    ///
    /// Returns `false` (dropping `item`) if `key` is not indexed.
    pub fn update_with(&mut self, key: Key, item: D) -> bool {
        let Some(slot) = self.get_mut(key) else {
            return false;
        };
        *slot = item;
        self.update(key)
    }

    /// Re-position every item, reusing the current node layout.
    ///
    /// Every leaf is emptied and every branch count zeroed, but no node is
    /// discarded; then all items are inserted again from the root. Use this
    /// after moving many items through [`iter_mut`][Self::iter_mut].
    pub fn reindex(&mut self) {
        self.nodes.clear_items(self.root);
        self.outside.clear();
        self.locations.clear();
        let keys: Vec<Key> = self.iter().map(|(k, _)| k).collect();
        tracing::debug!(items = keys.len(), nodes = self.nodes.live(), "reindexing");
        for key in keys {
            self.place(key);
        }
    }

    /// Replace the contents of the tree with `items`, starting from a single
    /// root leaf. Previously issued keys become invalid.
    ///
    /// Returns the new keys in input order.
    pub fn initialize<I: IntoIterator<Item = D>>(&mut self, items: I) -> Vec<Key> {
        self.clear();
        let keys: Vec<Key> = items.into_iter().map(|item| self.insert(item)).collect();
        tracing::debug!(
            items = keys.len(),
            nodes = self.nodes.live(),
            "initialized tree"
        );
        keys
    }

    /// Remove every item and discard all nodes but a fresh root leaf.
    pub fn clear(&mut self) {
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            if entry.take().is_some() {
                self.generations[idx] = self.generations[idx].wrapping_add(1);
            }
        }
        self.free_list.clear();
        self.free_list.extend((0..self.entries.len()).rev());
        self.locations.clear();
        self.outside.clear();
        self.root = self.nodes.reset_to_leaf(self.root_bounds);
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The leaf currently holding `key`.
    ///
    /// Returns `None` if the key is not indexed or the item lies outside the
    /// root bounds.
    pub fn leaf_of(&self, key: Key) -> Option<NodeId> {
        match self.locations.get(&key)? {
            Location::Leaf(id) => Some(*id),
            Location::Outside(_) => None,
        }
    }

    /// Whether `node` is a leaf, or `None` for a stale id.
    pub fn is_leaf(&self, node: NodeId) -> Option<bool> {
        Some(matches!(self.nodes.get(node)?.kind, NodeKind::Leaf(_)))
    }

    /// Region covered by `node`.
    pub fn node_bounds(&self, node: NodeId) -> Option<G::Bounds> {
        Some(self.nodes.get(node)?.bounds)
    }

    /// Number of items stored at or below `node`.
    pub fn subtree_len(&self, node: NodeId) -> Option<usize> {
        Some(self.nodes.get(node)?.len())
    }

    /// Parent of `node`, or `None` for the root or a stale id.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    /// Number of live nodes (leaves and branches).
    pub fn node_count(&self) -> usize {
        self.nodes.live()
    }

    /// Depth of the deepest node; a lone root leaf has depth 0.
    pub fn depth(&self) -> u16 {
        self.nodes.max_depth(self.root)
    }

    /// Number of items lying outside the root bounds.
    pub fn outside_len(&self) -> usize {
        self.outside.len()
    }

    pub(crate) fn item(&self, key: Key) -> &D {
        slot_item(&self.entries, key)
    }

    /// Place an unlocated key, starting at the root.
    fn place(&mut self, key: Key) {
        let item = slot_item(&self.entries, key);
        if !self.geometry.contains(item, &self.root_bounds) {
            tracing::debug!(key = ?key, "item lies outside the root bounds");
            self.locations.insert(key, Location::Outside(self.outside.len()));
            self.outside.push(key);
            return;
        }
        self.place_from(key, self.root);
    }

    /// Descend from `start` to a leaf with room for `key`, subdividing full
    /// leaves along the way, and return that leaf.
    fn place_from(&mut self, key: Key, start: NodeId) -> NodeId {
        let entries = &self.entries;
        let item = slot_item(entries, key);
        let capacity = self.config.capacity;
        let max_depth = self.config.max_depth;
        let mut id = start;
        loop {
            let node = self.nodes.node_mut(id);
            match &mut node.kind {
                NodeKind::Branch { len, .. } => {
                    *len += 1;
                    id = self.nodes.choose_child(id, item, &self.geometry);
                }
                NodeKind::Leaf(items) => {
                    if items.len() < capacity || node.depth >= max_depth {
                        if items.len() >= capacity {
                            tracing::debug!(
                                node = ?id,
                                depth = node.depth,
                                items = items.len() + 1,
                                "leaf at max depth accepts item over capacity"
                            );
                        }
                        items.push(key);
                        self.locations.insert(key, Location::Leaf(id));
                        return id;
                    }
                    self.nodes
                        .subdivide(id, &self.geometry, |k| slot_item(entries, k));
                    let locations = &mut self.locations;
                    self.nodes.visit_items(id, |k, leaf| {
                        locations.insert(k, Location::Leaf(leaf));
                    });
                }
            }
        }
    }

    /// Take `key` out of the structure (but not out of the item slab).
    ///
    /// Returns `None` if `key` is not indexed.
    fn detach(&mut self, key: Key) -> Option<()> {
        let leaf = match self.locations.remove(&key)? {
            Location::Outside(pos) => {
                debug_assert_eq!(self.outside.get(pos), Some(&key), "overflow slot");
                self.outside.swap_remove(pos);
                if let Some(&moved) = self.outside.get(pos) {
                    self.locations.insert(moved, Location::Outside(pos));
                }
                return Some(());
            }
            Location::Leaf(leaf) => leaf,
        };

        let node = self.nodes.node_mut(leaf);
        let NodeKind::Leaf(items) = &mut node.kind else {
            unreachable!("space tree invariant violated: reverse index points at a branch");
        };
        let pos = items
            .iter()
            .position(|&k| k == key)
            .expect("space tree invariant violated: key missing from its leaf");
        items.swap_remove(pos);

        // Walk to the root, shrinking counts, and remember the highest branch
        // that no longer needs to be one.
        let capacity = self.config.capacity;
        let mut collapse_at = None;
        let mut parent = node.parent;
        while let Some(id) = parent {
            let node = self.nodes.node_mut(id);
            if let NodeKind::Branch { len, .. } = &mut node.kind {
                *len -= 1;
                if *len <= capacity {
                    collapse_at = Some(id);
                }
            }
            parent = node.parent;
        }

        let Some(id) = collapse_at else {
            return Some(());
        };
        self.nodes.collapse(id);
        let locations = &mut self.locations;
        self.nodes.visit_items(id, |k, leaf| {
            locations.insert(k, Location::Leaf(leaf));
        });
        Some(())
    }
}

pub(crate) fn slot_item<D>(entries: &[Option<D>], key: Key) -> &D {
    entries
        .get(key.idx())
        .and_then(Option::as_ref)
        .expect("space tree invariant violated: key refers to a vacant slot")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Point2D;
    use alloc::vec;

    type P = Point2D<f64>;

    pub(crate) fn unit_tree(capacity: usize) -> SpaceTree<P> {
        SpaceTree::new(capacity, Aabb2D::new(-1.0, -1.0, 1.0, 1.0)).unwrap()
    }

    /// Check every structural invariant of the tree.
    pub(crate) fn assert_consistent<D, G: Geometry<D>>(tree: &SpaceTree<D, G>) {
        let mut stack = vec![tree.root];
        let mut seen = 0;
        while let Some(id) = stack.pop() {
            let node = tree.nodes.node(id);
            match &node.kind {
                NodeKind::Leaf(items) => {
                    assert!(
                        items.len() <= tree.config.capacity || node.depth >= tree.config.max_depth,
                        "leaf {id:?} over capacity above max depth"
                    );
                    for &k in items {
                        assert_eq!(
                            tree.locations.get(&k),
                            Some(&Location::Leaf(id)),
                            "stale reverse entry for {k:?}"
                        );
                        seen += 1;
                    }
                }
                NodeKind::Branch { children, len } => {
                    assert_eq!(children.len(), tree.config.fan_out, "fan-out");
                    let sum: usize = children.iter().map(|&c| tree.nodes.node(c).len()).sum();
                    assert_eq!(*len, sum, "branch {id:?} count");
                    for &c in children {
                        assert_eq!(tree.nodes.node(c).parent, Some(id), "parent link");
                    }
                    stack.extend(children.iter().copied());
                }
            }
        }
        for (i, &k) in tree.outside.iter().enumerate() {
            assert_eq!(tree.locations.get(&k), Some(&Location::Outside(i)), "overflow slot");
        }
        assert_eq!(seen + tree.outside.len(), tree.len(), "reverse index size");
        assert_eq!(tree.iter().count(), tree.len(), "slab size");
    }

    #[test]
    fn construction_rejects_bad_config() {
        let bounds = Aabb2D::new(-1.0, -1.0, 1.0, 1.0);
        assert_eq!(
            SpaceTree::<P>::new(0, bounds).err(),
            Some(ConfigError::ZeroCapacity)
        );
        assert_eq!(
            SpaceTree::<P>::with_geometry(SpaceTreeConfig::new(2).with_fan_out(8), bounds, Euclidean)
                .err(),
            Some(ConfigError::FanOutMismatch {
                configured: 8,
                geometry: 4
            })
        );
    }

    #[test]
    fn third_insert_subdivides_root() {
        let mut tree = unit_tree(2);
        let a = tree.insert(P::new(0.0, 0.0));
        tree.insert(P::new(0.1, 0.0));
        assert_eq!(tree.is_leaf(tree.root()), Some(true));
        tree.insert(P::new(0.9, 0.9));
        assert_eq!(tree.is_leaf(tree.root()), Some(false));
        assert_eq!(tree.subtree_len(tree.root()), Some(3));
        assert_consistent(&tree);

        let hit = tree.nearest_one(&P::new(0.0, 0.0)).unwrap();
        assert_eq!(hit.key, a);
        assert_eq!(hit.distance, 0.0);
        assert_eq!(tree.get(hit.key), Some(&P::new(0.0, 0.0)));
    }

    #[test]
    fn coincident_items_stop_at_max_depth() {
        let mut tree = unit_tree(2);
        let keys: Vec<Key> = (0..5).map(|_| tree.insert(P::new(0.0, 0.0))).collect();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.depth(), tree.config().max_depth);
        let leaf = tree.leaf_of(keys[0]).unwrap();
        for &k in &keys {
            assert_eq!(tree.leaf_of(k), Some(leaf), "all share one leaf");
        }
        assert_eq!(tree.subtree_len(leaf), Some(5));
        assert_consistent(&tree);

        let all = tree.nearest_k(&P::new(0.0, 0.0), 10);
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|n| n.distance == 0.0));
    }

    #[test]
    fn shallow_max_depth_caps_the_cascade() {
        let config = SpaceTreeConfig::new(1).with_max_depth(3);
        let mut tree: SpaceTree<P> =
            SpaceTree::with_geometry(config, Aabb2D::new(-1.0, -1.0, 1.0, 1.0), Euclidean)
                .unwrap();
        for _ in 0..4 {
            tree.insert(P::new(0.5, 0.5));
        }
        assert_eq!(tree.depth(), 3);
        assert_consistent(&tree);
    }

    #[test]
    fn remove_collapses_highest_underfull_ancestor() {
        let mut tree = unit_tree(2);
        let a = tree.insert(P::new(-0.5, -0.5));
        let b = tree.insert(P::new(0.5, 0.5));
        let c = tree.insert(P::new(0.6, 0.6));
        let d = tree.insert(P::new(0.7, 0.7));
        assert!(tree.depth() >= 2);
        let nodes_before = tree.node_count();

        assert_eq!(tree.remove(c), Some(P::new(0.6, 0.6)));
        // Three items remain, more than capacity: the root stays a branch but
        // the crowded quadrant folds back into a leaf.
        assert_eq!(tree.is_leaf(tree.root()), Some(false));
        assert!(tree.node_count() < nodes_before);
        assert_eq!(tree.leaf_of(b), tree.leaf_of(d));
        assert_consistent(&tree);

        assert!(tree.remove(d).is_some());
        assert_eq!(tree.is_leaf(tree.root()), Some(true));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.leaf_of(a), Some(tree.root()));
        assert_eq!(tree.leaf_of(b), Some(tree.root()));
        assert_consistent(&tree);
    }

    #[test]
    fn remove_unknown_or_stale_key_is_not_found() {
        let mut tree = unit_tree(2);
        let a = tree.insert(P::new(0.0, 0.0));
        assert!(tree.remove(a).is_some());
        assert!(tree.remove(a).is_none());
        assert!(!tree.update(a));
        assert!(!tree.contains_key(a));
        assert!(tree.get(a).is_none());

        // The slot is reused under a new generation.
        let b = tree.insert(P::new(0.5, 0.5));
        assert_ne!(a, b);
        assert!(tree.get(a).is_none());
        assert!(tree.nearest_k(&P::new(0.0, 0.0), 4).iter().all(|n| n.key != a));
        assert_consistent(&tree);
    }

    #[test]
    fn update_moves_item_to_new_leaf() {
        let mut tree = unit_tree(1);
        let a = tree.insert(P::new(-0.5, -0.5));
        let b = tree.insert(P::new(0.5, 0.5));
        let old_leaf = tree.leaf_of(a).unwrap();

        *tree.get_mut(a).unwrap() = P::new(0.55, 0.55);
        assert!(tree.update(a));
        assert_ne!(tree.leaf_of(a), Some(old_leaf));
        assert_consistent(&tree);

        let near = tree.nearest_k(&P::new(0.55, 0.55), 2);
        assert_eq!(near[0].key, a);
        assert_eq!(near[1].key, b);
        assert_eq!(tree.nearest_one(&P::new(-0.5, -0.5)).unwrap().key, b);

        assert!(tree.update_with(b, P::new(-0.9, 0.9)));
        assert_eq!(tree.nearest_one(&P::new(-1.0, 1.0)).unwrap().key, b);
        assert_consistent(&tree);
    }

    #[test]
    fn reindex_follows_bulk_moves_and_keeps_layout() {
        let mut tree = unit_tree(2);
        let keys: Vec<Key> = (0..20)
            .map(|i| {
                let t = f64::from(i) / 20.0;
                tree.insert(P::new(t - 0.5, 0.5 - t))
            })
            .collect();
        let nodes = tree.node_count();
        for (_, p) in tree.iter_mut() {
            p.x = -p.x;
        }
        tree.reindex();
        assert!(tree.node_count() >= nodes, "reindex never discards nodes");
        assert_eq!(tree.len(), keys.len());
        assert_consistent(&tree);

        // No two points are equidistant from this query.
        let before = tree.nearest_k(&P::new(0.31, 0.1), 20);
        tree.reindex();
        let after = tree.nearest_k(&P::new(0.31, 0.1), 20);
        assert_eq!(before, after, "reindex is idempotent");
    }

    #[test]
    fn initialize_replaces_contents() {
        let mut tree = unit_tree(2);
        let old = tree.insert(P::new(0.0, 0.0));
        let keys = tree.initialize(vec![P::new(0.1, 0.1), P::new(-0.1, -0.1), P::new(0.2, 0.9)]);
        assert_eq!(keys.len(), 3);
        assert_eq!(tree.len(), 3);
        assert!(!tree.contains_key(old));
        assert_eq!(tree.get(keys[2]), Some(&P::new(0.2, 0.9)));
        assert_consistent(&tree);

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.nearest_one(&P::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn items_outside_root_bounds_are_still_found() {
        let mut tree = unit_tree(1);
        let inside = tree.insert(P::new(0.5, 0.5));
        let far = tree.insert(P::new(5.0, 5.0));
        assert_eq!(tree.outside_len(), 1);
        assert_eq!(tree.leaf_of(far), None);
        assert_eq!(tree.nearest_one(&P::new(4.0, 4.0)).unwrap().key, far);
        assert_consistent(&tree);

        // Moving back inside takes it out of the overflow list.
        assert!(tree.update_with(far, P::new(-0.5, -0.5)));
        assert_eq!(tree.outside_len(), 0);
        assert!(tree.leaf_of(far).is_some());
        assert_eq!(tree.nearest_one(&P::new(0.6, 0.6)).unwrap().key, inside);
        assert!(tree.remove(far).is_some());
        assert_consistent(&tree);
    }

    #[test]
    fn overflow_removal_keeps_slots_in_step() {
        let mut tree = unit_tree(2);
        let far: Vec<Key> = [3.0, 4.0, 5.0, 6.0]
            .into_iter()
            .map(|x| tree.insert(P::new(x, x)))
            .collect();
        assert_eq!(tree.outside_len(), 4);

        // Removing the first slot moves the last key into it.
        assert_eq!(tree.remove(far[0]), Some(P::new(3.0, 3.0)));
        assert_consistent(&tree);
        assert!(tree.update_with(far[3], P::new(0.5, 0.5)));
        assert_eq!(tree.outside_len(), 2);
        assert!(tree.leaf_of(far[3]).is_some());
        assert_consistent(&tree);

        assert!(tree.remove(far[2]).is_some());
        assert!(tree.remove(far[1]).is_some());
        assert_eq!(tree.outside_len(), 0);
        assert_eq!(tree.nearest_one(&P::new(9.0, 9.0)).unwrap().key, far[3]);
        assert_consistent(&tree);
    }

    /// Halves an interval but leaves its middle tenth to neither child.
    #[derive(Debug)]
    struct GappedLine {
        /// Bounds are widened by this much when measuring, which covers the
        /// largest gap an item can be pushed across.
        pad: f64,
    }

    impl Geometry<f64> for GappedLine {
        type Bounds = (f64, f64);
        type Distance = f64;

        fn distance(&self, a: &f64, b: &f64) -> f64 {
            (a - b).abs()
        }

        fn contains(&self, x: &f64, b: &(f64, f64)) -> bool {
            b.0 <= *x && *x <= b.1
        }

        fn min_distance(&self, x: &f64, b: &(f64, f64)) -> f64 {
            (b.0 - self.pad - x).max(x - b.1 - self.pad).max(0.0)
        }

        fn subdivide(&self, b: &(f64, f64), i: usize) -> (f64, f64) {
            let w = b.1 - b.0;
            let mid = b.0 + w / 2.0;
            if i == 0 {
                (b.0, mid - 0.05 * w)
            } else {
                (mid + 0.05 * w, b.1)
            }
        }

        fn fan_out(&self) -> usize {
            2
        }
    }

    fn gapped_tree(capacity: usize) -> SpaceTree<f64, GappedLine> {
        let config = SpaceTreeConfig::new(capacity).with_fan_out(2);
        SpaceTree::with_geometry(config, (0.0, 100.0), GappedLine { pad: 5.0 }).unwrap()
    }

    #[test]
    fn items_in_a_partition_gap_go_to_the_closest_child() {
        let mut tree = gapped_tree(2);
        tree.insert(10.0);
        tree.insert(90.0);
        // The root gap is (45, 55).
        let left = tree.insert(48.0);
        let right = tree.insert(52.0);
        assert_eq!(tree.is_leaf(tree.root()), Some(false));
        assert_consistent(&tree);

        let leaf = tree.leaf_of(left).unwrap();
        assert_eq!(tree.node_bounds(leaf), Some((0.0, 45.0)));
        assert_eq!(tree.parent(leaf), Some(tree.root()));
        let leaf = tree.leaf_of(right).unwrap();
        assert_eq!(tree.node_bounds(leaf), Some((55.0, 100.0)));

        let hit = tree.nearest_one(&49.5).unwrap();
        assert_eq!(hit.key, left);
        assert_eq!(hit.distance, 1.5);
        let hit = tree.nearest_one(&51.0).unwrap();
        assert_eq!(hit.key, right);
    }

    #[test]
    fn gapped_partition_still_answers_like_a_linear_scan() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(17);
        let items: Vec<f64> = (0..300).map(|_| rng.gen_range(0.0..=100.0)).collect();
        for capacity in [1, 3] {
            let mut tree = gapped_tree(capacity);
            tree.initialize(items.iter().copied());
            assert_consistent(&tree);
            for _ in 0..100 {
                let query = rng.gen_range(-10.0..110.0);
                let want = tree
                    .iter()
                    .map(|(_, x)| (x - query).abs())
                    .fold(f64::INFINITY, f64::min);
                let got = tree.nearest_one(&query).unwrap();
                assert_eq!(got.distance, want, "capacity {capacity}, query {query}");
            }
        }
    }
}
