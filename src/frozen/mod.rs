//! The frozen k-d tree.
//!
//! "Frozen" refers to the balancing discipline, not the contents: the tree
//! accepts insertions and erasures at any time, but never restructures on
//! its own. Load it, call [`FrozenKDTree::rebalance`], and query; a
//! workload of frequent mutation is better served by
//! [`RelaxedKDTree`][crate::RelaxedKDTree].
//!
//! The tree maintains the strict invariant: at every node, the left
//! subtree orders strictly before the node's key at the discriminating
//! dimension, and the right subtree does not order before it. Duplicate
//! coordinates are admitted and descend to the right.

use crate::compare::{BoxCompare, KeyCompare};
use crate::error::{KdIndexError, Result};
use crate::iter::{
    BoxIter, BoxMode, DistLimit, EqualIter, IntervalMode, Iter, MappingIter, NeighborIter,
    RangeIter,
};
use crate::metric::DistanceMetric;
use crate::node::{KdNode, NodeId, PlainNode};
use crate::predicate::{EqualKey, Invariant};
use crate::rank::{DynRank, Rank};
use crate::tree::CoreTree;


/// A k-d tree balanced only on demand.
///
/// Keys live in k-dimensional space; all ordering flows through a
/// [`KeyCompare`] evaluated per dimension. Handles ([`NodeId`]) returned by
/// [`insert`][Self::insert] and [`find`][Self::find] address elements for
/// as long as they live, across any restructuring.
///
/// ```
/// use kd_index::{FrozenKDTree, IndexLess};
///
/// let mut tree = FrozenKDTree::with_dimension(2, IndexLess).unwrap();
/// tree.insert([3, 6]).unwrap();
/// tree.insert([13, 15]).unwrap();
/// tree.insert([9, 1]).unwrap();
/// tree.rebalance();
///
/// // Results come out in pre-order of the balanced tree.
/// let inside: Vec<_> = tree.range([0, 0], [10, 10]).collect();
/// assert_eq!(inside, vec![&[9, 1], &[3, 6]]);
/// ```
#[derive(Debug)]
pub struct FrozenKDTree<K, C = crate::compare::IndexLess, R = DynRank> {
    core: CoreTree<PlainNode<K>, C, R>,
}

impl<K, C, R> FrozenKDTree<K, C, R>
where
    C: KeyCompare<K>,
    R: Rank + Default,
{
    /// Create an empty tree with a compile-time rank.
    ///
    /// The rank type's dimension must be strictly positive.
    pub fn new(compare: C) -> Self {
        let rank = R::default();
        assert!(rank.dimension() > 0, "rank must be strictly positive");
        FrozenKDTree {
            core: CoreTree::new(rank, compare, Invariant::Strict),
        }
    }
}

impl<K, C> FrozenKDTree<K, C, DynRank>
where
    C: KeyCompare<K>,
{
    /// Create an empty tree with a runtime rank.
    ///
    /// ## Errors
    ///
    /// - If `dimension` is zero.
    pub fn with_dimension(dimension: usize, compare: C) -> Result<Self> {
        let rank = DynRank::new(dimension)?;
        Ok(FrozenKDTree {
            core: CoreTree::new(rank, compare, Invariant::Strict),
        })
    }
}

impl<K, C, R> FrozenKDTree<K, C, R>
where
    C: KeyCompare<K>,
    R: Rank,
{
    /// Number of elements.
    pub fn len(&self) -> usize {
        self.core.arena.len()
    }

    /// `true` when the tree holds no element.
    pub fn is_empty(&self) -> bool {
        self.core.arena.is_empty()
    }

    /// Number of coordinate dimensions.
    pub fn dimension(&self) -> usize {
        self.core.dimension()
    }

    /// Handle of the first in-order element; [`end`][Self::end] when the
    /// tree is empty.
    pub fn begin(&self) -> NodeId {
        self.core.arena.leftmost()
    }

    /// The past-the-end handle, usable as the `last` argument of
    /// [`erase_range`][Self::erase_range].
    pub fn end(&self) -> NodeId {
        NodeId::HEADER
    }

    /// The key addressed by `id`, if it is live.
    pub fn get(&self, id: NodeId) -> Option<&K> {
        self.core.arena.get(id).map(KdNode::key)
    }

    /// Insert a key; duplicates are admitted unconditionally.
    ///
    /// No rebalancing happens; the expected depth stays logarithmic for
    /// random input and degrades toward linear for sorted input.
    ///
    /// ## Errors
    ///
    /// - If node allocation fails; the tree is left untouched.
    pub fn insert(&mut self, key: K) -> Result<NodeId> {
        let (id, _) = self.core.insert_node(key)?;
        Ok(id)
    }

    /// Remove the element addressed by `id` and return its key.
    ///
    /// Other handles stay valid: erasure relinks nodes and never moves a
    /// key between slots.
    ///
    /// ## Errors
    ///
    /// - If `id` does not address a live element.
    pub fn erase(&mut self, id: NodeId) -> Result<K> {
        self.core.check_handle(id)?;
        let dim = self.core.arena.node_dim(id, self.dimension());
        self.core.extract_node(id, dim);
        let key = self.core.arena.release(id).into_key();
        self.core.refresh_extremes();
        Ok(key)
    }

    /// Remove the in-order interval `[first, last)` and return how many
    /// elements were removed. `last` may be [`end`][Self::end].
    ///
    /// ## Errors
    ///
    /// - If either handle is dead, or `last` is not reachable from
    ///   `first`; nothing is removed.
    pub fn erase_range(&mut self, first: NodeId, last: NodeId) -> Result<usize> {
        let ids = self.collect_range(first, last)?;
        let rank = self.dimension();
        for &id in &ids {
            let dim = self.core.arena.node_dim(id, rank);
            self.core.extract_node(id, dim);
            self.core.arena.release(id);
        }
        self.core.refresh_extremes();
        Ok(ids.len())
    }

    fn collect_range(&self, first: NodeId, last: NodeId) -> Result<Vec<NodeId>> {
        if !last.is_header() {
            self.core.check_handle(last)?;
        }
        if first == last {
            return Ok(Vec::new());
        }
        self.core.check_handle(first)?;
        let mut ids = Vec::new();
        let mut walk = first;
        while walk != last {
            if walk.is_header() {
                return Err(KdIndexError::InvalidIterator);
            }
            ids.push(walk);
            walk = self.core.arena.inorder_next(walk);
        }
        Ok(ids)
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.core.arena.clear();
    }

    /// Exchange the contents of two trees.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Relink the tree into a perfectly balanced shape: every subtree
    /// splits at its median along the discriminating dimension, so depths
    /// differ by at most one.
    ///
    /// Handles stay valid; only links move.
    pub fn rebalance(&mut self) {
        if self.core.arena.is_empty() {
            return;
        }
        let mut ids = self.core.collect_inorder();
        let root = self.core.rebuild_balanced(&mut ids, NodeId::HEADER, 0);
        self.core.arena.set_root(root);
        self.core.refresh_extremes();
    }

    /// First element whose key is coordinate-equal to `key` and compares
    /// equal to it.
    pub fn find(&self, key: &K) -> Option<NodeId>
    where
        K: PartialEq,
    {
        self.find_if(key, |stored| stored == key)
    }

    /// First element coordinate-equal to `key` that satisfies `pred`.
    pub fn find_if(&self, key: &K, mut pred: impl FnMut(&K) -> bool) -> Option<NodeId> {
        if self.core.arena.is_empty() {
            return None;
        }
        let walk = self.core.walk();
        let equal = EqualKey { model: key };
        let mut pos = walk.preorder_minimum(&equal, self.core.arena.root(), 0);
        while !pos.0.is_header() {
            if pred(self.core.arena.key(pos.0)) {
                return Some(pos.0);
            }
            pos = walk.preorder_increment(&equal, pos.0, pos.1);
        }
        None
    }

    /// All keys coordinate-equal to `model`.
    pub fn equal_range(&self, model: K) -> EqualIter<'_, PlainNode<K>, C, R> {
        EqualIter::new(&self.core, model)
    }

    /// All keys inside the half-open box `[lower, upper)`.
    pub fn range(&self, lower: K, upper: K) -> RangeIter<'_, PlainNode<K>, C, R> {
        RangeIter::new(&self.core, lower, upper, IntervalMode::HalfOpen)
    }

    /// All keys inside the closed box `[lower, upper]`.
    pub fn range_closed(&self, lower: K, upper: K) -> RangeIter<'_, PlainNode<K>, C, R> {
        RangeIter::new(&self.core, lower, upper, IntervalMode::Closed)
    }

    /// All keys inside the open box `(lower, upper)`.
    pub fn range_open(&self, lower: K, upper: K) -> RangeIter<'_, PlainNode<K>, C, R> {
        RangeIter::new(&self.core, lower, upper, IntervalMode::Open)
    }

    /// All box keys intersecting the query box, under the low/high key
    /// layout (dimensions `0..rank/2` low, `rank/2..rank` high).
    ///
    /// ## Errors
    ///
    /// - If the rank is odd; box keys pair a low and a high coordinate per
    ///   axis.
    pub fn overlapping(&self, query: K) -> Result<BoxIter<'_, PlainNode<K>, C, R>>
    where
        C: BoxCompare<K>,
    {
        self.check_box_rank()?;
        Ok(BoxIter::new(&self.core, query, BoxMode::Overlap))
    }

    /// All box keys contained in the query box; layout as
    /// [`overlapping`][Self::overlapping].
    ///
    /// ## Errors
    ///
    /// - If the rank is odd.
    pub fn enclosed(&self, query: K) -> Result<BoxIter<'_, PlainNode<K>, C, R>>
    where
        C: BoxCompare<K>,
    {
        self.check_box_rank()?;
        Ok(BoxIter::new(&self.core, query, BoxMode::Enclose))
    }

    fn check_box_rank(&self) -> Result<()> {
        if self.dimension() % 2 != 0 {
            return Err(KdIndexError::InvalidRank);
        }
        Ok(())
    }

    /// All keys in ascending order of their coordinate at `dim`.
    ///
    /// ## Errors
    ///
    /// - If `dim` is outside `0..rank`.
    pub fn mapping_iter(&self, dim: usize) -> Result<MappingIter<'_, PlainNode<K>, C, R>> {
        self.core.check_dim(dim)?;
        Ok(MappingIter::new(&self.core, dim))
    }

    /// Mapping traversal starting at the first key whose coordinate at
    /// `dim` is not below `bound`'s.
    ///
    /// ## Errors
    ///
    /// - If `dim` is outside `0..rank`.
    pub fn lower_bound_mapping(
        &self,
        dim: usize,
        bound: &K,
    ) -> Result<MappingIter<'_, PlainNode<K>, C, R>> {
        self.core.check_dim(dim)?;
        Ok(MappingIter::from_lower_bound(&self.core, dim, bound))
    }

    /// Mapping traversal starting at the first key whose coordinate at
    /// `dim` is strictly above `bound`'s.
    ///
    /// ## Errors
    ///
    /// - If `dim` is outside `0..rank`.
    pub fn upper_bound_mapping(
        &self,
        dim: usize,
        bound: &K,
    ) -> Result<MappingIter<'_, PlainNode<K>, C, R>> {
        self.core.check_dim(dim)?;
        Ok(MappingIter::from_upper_bound(&self.core, dim, bound))
    }

    /// All keys in ascending order of `metric` distance from `origin`;
    /// distance ties come out in pre-order of the tree.
    pub fn neighbors<M>(&self, origin: K, metric: M) -> NeighborIter<'_, PlainNode<K>, C, R, M>
    where
        M: DistanceMetric<K>,
    {
        NeighborIter::new(&self.core, origin, metric, DistLimit::None)
    }

    /// Neighbor traversal starting at the first key at distance at least
    /// `min_distance` from `origin`.
    pub fn neighbors_from<M>(
        &self,
        origin: K,
        metric: M,
        min_distance: M::Distance,
    ) -> NeighborIter<'_, PlainNode<K>, C, R, M>
    where
        M: DistanceMetric<K>,
    {
        NeighborIter::new(&self.core, origin, metric, DistLimit::AtLeast(min_distance))
    }

    /// In-order traversal of every key, leftmost to rightmost.
    pub fn iter(&self) -> Iter<'_, PlainNode<K>, C, R> {
        Iter::new(&self.core)
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &CoreTree<PlainNode<K>, C, R> {
        &self.core
    }
}

impl<K, C, R> FrozenKDTree<K, C, R>
where
    K: Clone,
    C: KeyCompare<K> + Clone,
    R: Rank,
{
    /// Copy another tree's elements into a new, perfectly balanced tree.
    ///
    /// ## Errors
    ///
    /// - If node allocation fails.
    pub fn rebalanced_from(other: &Self) -> Result<Self> {
        let mut tree = FrozenKDTree {
            core: CoreTree::new(other.core.rank, other.core.compare.clone(), Invariant::Strict),
        };
        for key in other.iter() {
            tree.core.insert_node(key.clone())?;
        }
        tree.rebalance();
        Ok(tree)
    }
}
