// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node storage: a flat generational arena of leaves and branches.

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::geometry::Geometry;
use crate::tree::Key;

/// Identifier for a node in a [`SpaceTree`][crate::SpaceTree] (generational).
///
/// Node ids are invalidated when their subtree is collapsed or the tree is
/// rebuilt; a stale id never resolves to a different node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Node slots are addressed with 32-bit indices."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

pub(crate) type LeafItems = SmallVec<[Key; 8]>;
pub(crate) type Children = SmallVec<[NodeId; 4]>;

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Leaf(LeafItems),
    Branch {
        children: Children,
        /// Number of items in the whole subtree.
        len: usize,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Node<B> {
    pub(crate) bounds: B,
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: u16,
    pub(crate) kind: NodeKind,
}

impl<B> Node<B> {
    fn leaf(bounds: B, parent: Option<NodeId>, depth: u16) -> Self {
        Self {
            bounds,
            parent,
            depth,
            kind: NodeKind::Leaf(LeafItems::new()),
        }
    }

    /// Items held directly by a leaf, or the subtree count of a branch.
    pub(crate) fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(items) => items.len(),
            NodeKind::Branch { len, .. } => *len,
        }
    }
}

#[derive(Debug)]
pub(crate) struct NodeArena<B> {
    slots: Vec<Option<Node<B>>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl<B: Copy> NodeArena<B> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Drop every node and allocate a single empty leaf as the new root.
    pub(crate) fn reset_to_leaf(&mut self, bounds: B) -> NodeId {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.generations[idx] = self.generations[idx].wrapping_add(1);
            }
        }
        self.free_list.clear();
        self.free_list.extend((0..self.slots.len()).rev());
        self.alloc(Node::leaf(bounds, None, 0))
    }

    fn alloc(&mut self, node: Node<B>) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(node);
            NodeId::new(idx, self.generations[idx])
        } else {
            self.slots.push(Some(node));
            self.generations.push(1);
            NodeId::new(self.slots.len() - 1, 1)
        }
    }

    fn free(&mut self, id: NodeId) -> Option<Node<B>> {
        let node = self.slots.get_mut(id.idx())?.take()?;
        self.generations[id.idx()] = self.generations[id.idx()].wrapping_add(1);
        self.free_list.push(id.idx());
        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<B>> {
        if *self.generations.get(id.idx())? != id.1 {
            return None;
        }
        self.slots.get(id.idx())?.as_ref()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<B> {
        self.get(id)
            .expect("space tree invariant violated: dangling node id")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<B> {
        debug_assert_eq!(
            self.generations.get(id.idx()).copied(),
            Some(id.1),
            "stale node id"
        );
        self.slots
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .expect("space tree invariant violated: dangling node id")
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Pick the child of branch `id` that should hold `item`.
    ///
    /// The first child (in index order) whose bounds contain the item wins.
    /// If none does, the geometry has a gap in its partition; the child with
    /// the smallest `min_distance` is used instead.
    pub(crate) fn choose_child<D, G>(&self, id: NodeId, item: &D, geometry: &G) -> NodeId
    where
        G: Geometry<D, Bounds = B>,
    {
        let NodeKind::Branch { children, .. } = &self.node(id).kind else {
            unreachable!("space tree invariant violated: choose_child called on a leaf");
        };
        if let Some(&child) = children
            .iter()
            .find(|&&c| geometry.contains(item, &self.node(c).bounds))
        {
            return child;
        }
        tracing::warn!(
            node = ?id,
            "no child region contains the item; geometry partition has a gap"
        );
        let mut best = children[0];
        let mut best_dist = geometry.min_distance(item, &self.node(best).bounds);
        for &c in &children[1..] {
            let d = geometry.min_distance(item, &self.node(c).bounds);
            if d < best_dist {
                best = c;
                best_dist = d;
            }
        }
        best
    }

    /// Convert leaf `id` into a branch with `fan_out` fresh leaf children,
    /// moving each of its items into the first child that contains it.
    ///
    /// The caller must re-register the moved items in its reverse index.
    pub(crate) fn subdivide<'a, D: 'a, G, F>(&mut self, id: NodeId, geometry: &G, item: F)
    where
        G: Geometry<D, Bounds = B>,
        F: Fn(Key) -> &'a D,
    {
        let node = self.node_mut(id);
        let NodeKind::Leaf(items) = &mut node.kind else {
            unreachable!("space tree invariant violated: subdivide called on a branch");
        };
        let items = core::mem::take(items);
        let bounds = node.bounds;
        let depth = node.depth + 1;
        let len = items.len();

        let mut children = Children::new();
        for i in 0..geometry.fan_out() {
            let child_bounds = geometry.subdivide(&bounds, i);
            children.push(self.alloc(Node::leaf(child_bounds, Some(id), depth)));
        }
        self.node_mut(id).kind = NodeKind::Branch { children, len };

        for key in items {
            let child = self.choose_child(id, item(key), geometry);
            match &mut self.node_mut(child).kind {
                NodeKind::Leaf(child_items) => child_items.push(key),
                NodeKind::Branch { .. } => {
                    unreachable!("space tree invariant violated: fresh child is a branch")
                }
            }
        }
        tracing::debug!(node = ?id, depth = depth - 1, items = len, "subdivided leaf");
    }

    /// Fold the whole subtree of branch `id` back into a single leaf holding
    /// every item of the subtree. No capacity check is made.
    ///
    /// The caller must re-register the gathered items in its reverse index.
    pub(crate) fn collapse(&mut self, id: NodeId) {
        let NodeKind::Branch { children, .. } = &mut self.node_mut(id).kind else {
            return;
        };
        let mut stack: Vec<NodeId> = core::mem::take(children).into_vec();
        let mut gathered = LeafItems::new();
        let mut freed = 0_usize;
        while let Some(next) = stack.pop() {
            let node = self
                .free(next)
                .expect("space tree invariant violated: dangling child id");
            freed += 1;
            match node.kind {
                NodeKind::Leaf(items) => gathered.extend(items),
                NodeKind::Branch { children, .. } => stack.extend(children),
            }
        }
        tracing::debug!(node = ?id, items = gathered.len(), freed, "collapsed branch");
        self.node_mut(id).kind = NodeKind::Leaf(gathered);
    }

    /// Empty every leaf and zero every branch count below (and including)
    /// `root`, keeping the shape of the tree.
    pub(crate) fn clear_items(&mut self, root: NodeId) {
        let mut stack = Vec::from([root]);
        while let Some(id) = stack.pop() {
            match &mut self.node_mut(id).kind {
                NodeKind::Leaf(items) => items.clear(),
                NodeKind::Branch { children, len } => {
                    *len = 0;
                    stack.extend(children.iter().copied());
                }
            }
        }
    }

    /// Visit every `(key, leaf)` pair in the subtree of `root`.
    pub(crate) fn visit_items<F: FnMut(Key, NodeId)>(&self, root: NodeId, mut f: F) {
        let mut stack = Vec::from([root]);
        while let Some(id) = stack.pop() {
            match &self.node(id).kind {
                NodeKind::Leaf(items) => {
                    for &key in items {
                        f(key, id);
                    }
                }
                NodeKind::Branch { children, .. } => stack.extend(children.iter().copied()),
            }
        }
    }

    /// Depth of the deepest node in the subtree of `root`.
    pub(crate) fn max_depth(&self, root: NodeId) -> u16 {
        let mut deepest = 0;
        let mut stack = Vec::from([root]);
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            deepest = deepest.max(node.depth);
            if let NodeKind::Branch { children, .. } = &node.kind {
                stack.extend(children.iter().copied());
            }
        }
        deepest
    }
}
