// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed R-tree backend built with sort-tile-recursive (STR) bulk loading.

use alloc::vec::Vec;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::backend::Backend;
use crate::types::{Aabb2D, Scalar, cmp_scalar};

type ChildList = SmallVec<[u32; 8]>;

#[derive(Clone, Debug)]
enum Children {
    /// Leaf node: slot numbers.
    Slots(ChildList),
    /// Interior node: indices into `RTree::nodes`.
    Nodes(ChildList),
}

#[derive(Clone, Debug)]
struct Node<T> {
    bounds: Aabb2D<T>,
    children: Children,
}

/// Configuration for building [`RTree`]s.
///
/// A recorder keeps one factory and builds a fresh tree for every finished
/// recording.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RTreeFactory {
    node_capacity: usize,
}

impl RTreeFactory {
    /// Node capacity used by [`RTreeFactory::default`].
    pub const DEFAULT_NODE_CAPACITY: usize = 8;

    /// Create a factory with the given maximum number of children per node.
    ///
    /// Capacities below 2 are clamped to 2.
    pub fn new(node_capacity: usize) -> Self {
        Self {
            node_capacity: node_capacity.max(2),
        }
    }

    /// Maximum number of children per node.
    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    /// Build a committed tree from `(slot, aabb)` entries.
    pub fn build<T: Scalar>(
        &self,
        entries: impl IntoIterator<Item = (usize, Aabb2D<T>)>,
    ) -> RTree<T> {
        let mut tree = RTree::with_node_capacity(self.node_capacity);
        for (slot, aabb) in entries {
            tree.insert(slot, aabb);
        }
        tree.commit();
        tree
    }
}

impl Default for RTreeFactory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NODE_CAPACITY)
    }
}

/// Packed bounding-region tree.
///
/// Edits only touch the flat entry table and mark the tree stale; the node
/// hierarchy is rebuilt on [`Backend::commit`]. Queries against a stale tree
/// scan the entry table so results never lag behind edits.
#[derive(Clone)]
pub struct RTree<T: Scalar> {
    entries: Vec<Option<Aabb2D<T>>>,
    live: usize,
    nodes: Vec<Node<T>>,
    root: Option<u32>,
    node_capacity: usize,
    stale: bool,
}

impl<T: Scalar> Default for RTree<T> {
    fn default() -> Self {
        Self::with_node_capacity(RTreeFactory::DEFAULT_NODE_CAPACITY)
    }
}

impl<T: Scalar> Debug for RTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("alive", &self.live)
            .field("nodes", &self.nodes.len())
            .field("height", &self.height())
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

impl<T: Scalar> RTree<T> {
    /// Create an empty tree whose nodes hold at most `node_capacity` children.
    pub fn with_node_capacity(node_capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            live: 0,
            nodes: Vec::new(),
            root: None,
            node_capacity: node_capacity.max(2),
            stale: false,
        }
    }

    /// Returns `true` if edits happened since the last commit.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of node levels, 0 for an empty or stale tree.
    pub fn height(&self) -> usize {
        let Some(mut idx) = self.root else {
            return 0;
        };
        if self.stale {
            return 0;
        }
        let mut height = 1;
        while let Children::Nodes(children) = &self.nodes[idx as usize].children {
            height += 1;
            idx = children[0];
        }
        height
    }

    /// Union of every indexed box, if any.
    pub fn bounds(&self) -> Option<Aabb2D<T>> {
        if !self.stale {
            return self.root.map(|r| self.nodes[r as usize].bounds);
        }
        self.entries
            .iter()
            .flatten()
            .filter(|a| !a.is_empty())
            .copied()
            .reduce(|acc, a| acc.union(&a))
    }

    fn rebuild(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.stale = false;

        let mut level: Vec<(Aabb2D<T>, u32)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| match e {
                Some(a) if !a.is_empty() => u32::try_from(slot).ok().map(|s| (*a, s)),
                _ => None,
            })
            .collect();
        if level.is_empty() {
            return;
        }

        let mut leaf = true;
        loop {
            level = self.pack_level(level, leaf);
            leaf = false;
            if level.len() == 1 {
                break;
            }
        }
        self.root = Some(level[0].1);
    }

    /// Group `items` into nodes of at most `node_capacity` children, tiling
    /// first by center X and then by center Y within each vertical slice.
    fn pack_level(
        &mut self,
        mut items: Vec<(Aabb2D<T>, u32)>,
        leaf: bool,
    ) -> Vec<(Aabb2D<T>, u32)> {
        let cap = self.node_capacity;
        let node_count = items.len().div_ceil(cap);
        let mut slices = 1;
        while slices * slices < node_count {
            slices += 1;
        }
        let slice_len = slices * cap;

        items.sort_by(|a, b| cmp_scalar(&a.0.center_key_x(), &b.0.center_key_x()));

        let mut parents = Vec::with_capacity(node_count);
        for slice in items.chunks_mut(slice_len) {
            slice.sort_by(|a, b| cmp_scalar(&a.0.center_key_y(), &b.0.center_key_y()));
            for group in slice.chunks(cap) {
                let bounds = group
                    .iter()
                    .skip(1)
                    .fold(group[0].0, |acc, (a, _)| acc.union(a));
                let ids: ChildList = group.iter().map(|(_, id)| *id).collect();
                let children = if leaf {
                    Children::Slots(ids)
                } else {
                    Children::Nodes(ids)
                };
                let idx = u32::try_from(self.nodes.len())
                    .expect("RTree: too many nodes for u32 node index");
                self.nodes.push(Node { bounds, children });
                parents.push((bounds, idx));
            }
        }
        parents
    }

    fn visit_nodes<F>(&self, mut node_test: impl FnMut(&Aabb2D<T>) -> bool, mut f: F)
    where
        F: FnMut(usize, &Aabb2D<T>),
    {
        let Some(root) = self.root else {
            return;
        };
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if !node_test(&node.bounds) {
                continue;
            }
            match &node.children {
                Children::Nodes(children) => stack.extend(children.iter().copied()),
                Children::Slots(slots) => {
                    for &slot in slots {
                        let slot = slot as usize;
                        if let Some(Some(a)) = self.entries.get(slot) {
                            f(slot, a);
                        }
                    }
                }
            }
        }
    }
}

impl<T: Scalar> Backend<T> for RTree<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        if self.entries[slot].replace(aabb).is_none() {
            self.live += 1;
        }
        self.stale = true;
    }

    fn update(&mut self, slot: usize, aabb: Aabb2D<T>) {
        if let Some(Some(e)) = self.entries.get_mut(slot) {
            *e = aabb;
            self.stale = true;
        }
    }

    fn remove(&mut self, slot: usize) {
        if let Some(e) = self.entries.get_mut(slot)
            && e.take().is_some()
        {
            self.live -= 1;
            self.stale = true;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.nodes.clear();
        self.root = None;
        self.live = 0;
        self.stale = false;
    }

    fn commit(&mut self) {
        if self.stale {
            self.rebuild();
        }
    }

    fn len(&self) -> usize {
        self.live
    }

    fn visit_point<F: FnMut(usize)>(&self, x: T, y: T, mut f: F) {
        if self.stale {
            for (i, e) in self.entries.iter().enumerate() {
                if let Some(a) = e
                    && a.contains_point(x, y)
                {
                    f(i);
                }
            }
            return;
        }
        self.visit_nodes(
            |b| b.contains_point(x, y),
            |slot, a| {
                if a.contains_point(x, y) {
                    f(slot);
                }
            },
        );
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Aabb2D<T>, mut f: F) {
        if self.stale {
            for (i, e) in self.entries.iter().enumerate() {
                if let Some(a) = e
                    && a.intersects(&rect)
                {
                    f(i);
                }
            }
            return;
        }
        self.visit_nodes(
            |b| b.intersects(&rect),
            |slot, a| {
                if a.intersects(&rect) {
                    f(slot);
                }
            },
        );
    }
}
