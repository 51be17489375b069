//! The relaxed k-d tree.
//!
//! A weight-balanced variant built for workloads of frequent insertion and
//! erasure. Every node carries the size of its subtree; after each
//! mutation the tree walks the touched chain bottom-up, and wherever the
//! [`BalancingPolicy`] reports a child too heavy, it rotates: the extreme
//! node of the heavy side along the discriminating dimension is promoted
//! into the split position, and the displaced node is re-inserted on the
//! lighter side. Rotation repeats until the policy is satisfied at every
//! touched node, so the policy predicate holds tree-wide after every
//! operation.
//!
//! The tree maintains the relaxed invariant: equivalent coordinates may
//! sit on either side of a split, which is what lets a promoted node
//! carry equivalents across without re-checking them.

use crate::compare::{BoxCompare, KeyCompare};
use crate::error::{KdIndexError, Result};
use crate::iter::{
    BoxIter, BoxMode, DistLimit, EqualIter, IntervalMode, Iter, MappingIter, NeighborIter,
    RangeIter,
};
use crate::metric::DistanceMetric;
use crate::node::{KdNode, NodeId, WeightedNode};
use crate::predicate::{EqualKey, Invariant};
use crate::rank::{incr_dim, DynRank, Rank};
use crate::tree::{CoreTree, LowerLimit, UpperLimit};

mod policy;

#[cfg(test)]
mod test;

pub use policy::{BalancingPolicy, LooseBalancing, TightBalancing};

/// A self-balancing k-d tree with per-node subtree weights.
///
/// Same query surface as [`FrozenKDTree`][crate::FrozenKDTree], but
/// insertion and erasure keep the tree balanced under the chosen policy,
/// so no explicit rebalancing step exists or is needed.
///
/// ```
/// use kd_index::{LooseBalancing, RelaxedKDTree, IndexLess};
///
/// let mut tree =
///     RelaxedKDTree::with_dimension(2, IndexLess, LooseBalancing::default()).unwrap();
/// for x in 0..64 {
///     tree.insert([x, 0]).unwrap();
/// }
/// // Ascending input, yet the tree stays balanced and queryable.
/// let mut nearest = tree.neighbors([10, 0], kd_index::ManhattanDistance);
/// assert_eq!(nearest.next(), Some((0, &[10, 0])));
/// let (distance, _) = nearest.next().unwrap();
/// assert_eq!(distance, 1);
/// ```
#[derive(Debug)]
pub struct RelaxedKDTree<K, C = crate::compare::IndexLess, R = DynRank, P = LooseBalancing> {
    core: CoreTree<WeightedNode<K>, C, R>,
    policy: P,
}

impl<K, C, R, P> RelaxedKDTree<K, C, R, P>
where
    C: KeyCompare<K>,
    R: Rank + Default,
    P: BalancingPolicy,
{
    /// Create an empty tree with a compile-time rank.
    ///
    /// The rank type's dimension must be strictly positive.
    pub fn new(compare: C, policy: P) -> Self {
        let rank = R::default();
        assert!(rank.dimension() > 0, "rank must be strictly positive");
        RelaxedKDTree {
            core: CoreTree::new(rank, compare, Invariant::Relaxed),
            policy,
        }
    }
}

impl<K, C, P> RelaxedKDTree<K, C, DynRank, P>
where
    C: KeyCompare<K>,
    P: BalancingPolicy,
{
    /// Create an empty tree with a runtime rank.
    ///
    /// ## Errors
    ///
    /// - If `dimension` is zero.
    pub fn with_dimension(dimension: usize, compare: C, policy: P) -> Result<Self> {
        let rank = DynRank::new(dimension)?;
        Ok(RelaxedKDTree {
            core: CoreTree::new(rank, compare, Invariant::Relaxed),
            policy,
        })
    }
}

impl<K, C, R, P> RelaxedKDTree<K, C, R, P>
where
    C: KeyCompare<K>,
    R: Rank,
    P: BalancingPolicy,
{
    /// Number of elements. Equal to the root's weight.
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
    /// Amortized logarithmic: a single insertion may trigger a chain of
    /// local rotations on its way up.
    ///
    /// ## Errors
    ///
    /// - If node allocation fails; the tree is left untouched.
    pub fn insert(&mut self, key: K) -> Result<NodeId> {
        let (id, _) = self.core.insert_node(key)?;
        let parent = self.core.arena.parent(id);
        self.restore_chain(parent, NodeId::HEADER);
        self.core.refresh_extremes();
        Ok(id)
    }

    /// Remove the element addressed by `id`; returns its key and the
    /// handle of the element that followed it in pre-order (the header
    /// handle when it was the last).
    ///
    /// ## Errors
    ///
    /// - If `id` does not address a live element.
    pub fn erase(&mut self, id: NodeId) -> Result<(K, NodeId)> {
        self.core.check_handle(id)?;
        let successor = self.core.arena.preorder_next(id);
        let dim = self.core.arena.node_dim(id, self.dimension());
        let resume = self.core.extract_node(id, dim);
        let key = self.core.arena.release(id).into_key();
        self.restore_chain(resume, NodeId::HEADER);
        self.core.refresh_extremes();
        Ok((key, successor))
    }

    /// Remove the in-order interval `[first, last)` and return how many
    /// elements were removed. `last` may be [`end`][Self::end].
    ///
    /// ## Errors
    ///
    /// - If either handle is dead, or `last` is not reachable from
    ///   `first`; nothing is removed.
    pub fn erase_range(&mut self, first: NodeId, last: NodeId) -> Result<usize> {
        if !last.is_header() {
            self.core.check_handle(last)?;
        }
        if first == last {
            return Ok(0);
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
        let count = ids.len();
        for id in ids {
            self.erase(id)?;
        }
        Ok(count)
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.core.arena.clear();
    }

    /// Exchange the contents of two trees.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
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
    pub fn equal_range(&self, model: K) -> EqualIter<'_, WeightedNode<K>, C, R> {
        EqualIter::new(&self.core, model)
    }

    /// All keys inside the half-open box `[lower, upper)`.
    pub fn range(&self, lower: K, upper: K) -> RangeIter<'_, WeightedNode<K>, C, R> {
        RangeIter::new(&self.core, lower, upper, IntervalMode::HalfOpen)
    }

    /// All keys inside the closed box `[lower, upper]`.
    pub fn range_closed(&self, lower: K, upper: K) -> RangeIter<'_, WeightedNode<K>, C, R> {
        RangeIter::new(&self.core, lower, upper, IntervalMode::Closed)
    }

    /// All keys inside the open box `(lower, upper)`.
    pub fn range_open(&self, lower: K, upper: K) -> RangeIter<'_, WeightedNode<K>, C, R> {
        RangeIter::new(&self.core, lower, upper, IntervalMode::Open)
    }

    /// All box keys intersecting the query box, under the low/high key
    /// layout (dimensions `0..rank/2` low, `rank/2..rank` high).
    ///
    /// ## Errors
    ///
    /// - If the rank is odd.
    pub fn overlapping(&self, query: K) -> Result<BoxIter<'_, WeightedNode<K>, C, R>>
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
    pub fn enclosed(&self, query: K) -> Result<BoxIter<'_, WeightedNode<K>, C, R>>
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
    pub fn mapping_iter(&self, dim: usize) -> Result<MappingIter<'_, WeightedNode<K>, C, R>> {
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
    ) -> Result<MappingIter<'_, WeightedNode<K>, C, R>> {
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
    ) -> Result<MappingIter<'_, WeightedNode<K>, C, R>> {
        self.core.check_dim(dim)?;
        Ok(MappingIter::from_upper_bound(&self.core, dim, bound))
    }

    /// All keys in ascending order of `metric` distance from `origin`;
    /// distance ties come out in pre-order of the tree.
    pub fn neighbors<M>(&self, origin: K, metric: M) -> NeighborIter<'_, WeightedNode<K>, C, R, M>
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
    ) -> NeighborIter<'_, WeightedNode<K>, C, R, M>
    where
        M: DistanceMetric<K>,
    {
        NeighborIter::new(&self.core, origin, metric, DistLimit::AtLeast(min_distance))
    }

    /// In-order traversal of every key, leftmost to rightmost.
    pub fn iter(&self) -> Iter<'_, WeightedNode<K>, C, R> {
        Iter::new(&self.core)
    }

    // Balancing.

    /// Walk from `from` up to `stop` (exclusive), restoring the policy at
    /// every position.
    fn restore_chain(&mut self, from: NodeId, stop: NodeId) {
        let rank = self.core.dimension();
        let mut cur = from;
        while cur != stop && !cur.is_header() {
            let dim = self.core.arena.node_dim(cur, rank);
            let settled = self.rebalance_position(cur, dim);
            cur = self.core.arena.parent(settled);
        }
    }

    /// Rotate at `node` until the policy accepts its weight split.
    /// Returns the node now occupying the position.
    fn rebalance_position(&mut self, node: NodeId, dim: usize) -> NodeId {
        let mut top = node;
        while self.tripped(top) {
            top = self.promote_demote(top, dim);
        }
        top
    }

    fn tripped(&self, node: NodeId) -> bool {
        let arena = &self.core.arena;
        let heavier = arena
            .weight_of(arena.left(node))
            .max(arena.weight_of(arena.right(node)));
        self.policy.imbalanced(arena.node(node).weight(), heavier)
    }

    /// One rotation: promote the extreme of the heavy side along `dim`
    /// into `node`'s position, then re-insert `node` on the lighter side.
    /// Each rotation moves exactly one node across the split, so the
    /// enclosing loop terminates.
    fn promote_demote(&mut self, node: NodeId, dim: usize) -> NodeId {
        let rank = self.core.dimension();
        let left = self.core.arena.left(node);
        let right = self.core.arena.right(node);
        let heavy_right = self.core.arena.weight_of(right) > self.core.arena.weight_of(left);

        let (promoted, promoted_dim) = if heavy_right {
            self.core
                .bounded_minimum_along(right, incr_dim(rank, dim), dim, LowerLimit::None)
                .expect("the heavy subtree is non-empty")
        } else {
            self.core
                .bounded_maximum_along(left, incr_dim(rank, dim), dim, UpperLimit::None)
                .expect("the heavy subtree is non-empty")
        };

        let mut resume = self.core.extract_node(promoted, promoted_dim);

        // The promoted node steps into the split position.
        let parent = self.core.arena.parent(node);
        let node_left = self.core.arena.left(node);
        let node_right = self.core.arena.right(node);
        let node_weight = self.core.arena.node(node).weight();
        self.core.replace_child(parent, node, promoted);
        self.core.arena.set_parent(promoted, parent);
        self.core.arena.set_left(promoted, node_left);
        if !node_left.is_nil() {
            self.core.arena.set_parent(node_left, promoted);
        }
        self.core.arena.set_right(promoted, node_right);
        if !node_right.is_nil() {
            self.core.arena.set_parent(node_right, promoted);
        }
        self.core.arena.node_mut(promoted).set_weight(node_weight);

        // The displaced node leaves the tree until its re-insertion.
        let links = self.core.arena.node_mut(node).links_mut();
        links.parent = NodeId::HEADER;
        links.left = NodeId::NIL;
        links.right = NodeId::NIL;

        // Settle the extraction path before the demoted node re-enters.
        if resume == node {
            resume = promoted;
        }
        self.restore_chain(resume, promoted);

        // The demoted node re-enters on the side the extreme did not come
        // from; its key never orders past the promoted split, so the
        // relaxed invariant holds on that side.
        self.core.reattach_node(node, promoted, dim, !heavy_right);
        let reentry = self.core.arena.parent(node);
        self.restore_chain(reentry, promoted);

        promoted
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &CoreTree<WeightedNode<K>, C, R> {
        &self.core
    }

    #[cfg(test)]
    pub(crate) fn policy(&self) -> &P {
        &self.policy
    }
}
