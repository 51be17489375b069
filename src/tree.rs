//! Structural machinery shared by both container families.
//!
//! `CoreTree` bundles the arena with the comparator, the rank and the
//! invariant tag, and implements everything that does not depend on
//! weights or balancing: the insertion descent, the position swap used to
//! relink nodes, the extraction splice that removes a node by repeatedly
//! swapping it toward a leaf, and the pruned extreme-along-one-dimension
//! scans that both erasure and the mapping iterator are built on.

use tinyvec::TinyVec;

use crate::compare::{equivalent_at, KeyCompare};
use crate::error::{KdIndexError, Result};
use crate::node::{Arena, KdNode, NodeId};
use crate::predicate::Invariant;
use crate::preorder::Walk;
use crate::rank::{incr_dim, Rank};

/// Marker on the node shape: `true` when the shape stores a live weight.
/// Lets the shared paths skip the weight walks entirely for plain nodes.
pub(crate) trait MaybeWeighted {
    const WEIGHTED: bool;
}

impl<K> MaybeWeighted for crate::node::PlainNode<K> {
    const WEIGHTED: bool = false;
}

impl<K> MaybeWeighted for crate::node::WeightedNode<K> {
    const WEIGHTED: bool = true;
}

/// Inclusive or exclusive lower limit for the bounded minimum scan.
#[derive(Clone, Copy)]
pub(crate) enum LowerLimit<'q, K> {
    None,
    /// Smallest coordinate not below the limit.
    Inclusive(&'q K),
    /// Smallest coordinate strictly above the limit.
    Exclusive(&'q K),
}

/// Exclusive upper limit for the bounded maximum scan.
#[derive(Clone, Copy)]
pub(crate) enum UpperLimit<'q, K> {
    None,
    /// Largest coordinate strictly below the limit.
    Exclusive(&'q K),
}

#[derive(Debug)]
pub(crate) struct CoreTree<N, C, R> {
    pub(crate) arena: Arena<N>,
    pub(crate) compare: C,
    pub(crate) rank: R,
    pub(crate) invariant: Invariant,
}

impl<N, C, R> CoreTree<N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
{
    pub(crate) fn new(rank: R, compare: C, invariant: Invariant) -> Self {
        CoreTree {
            arena: Arena::new(),
            compare,
            rank,
            invariant,
        }
    }

    #[inline]
    pub(crate) fn dimension(&self) -> usize {
        self.rank.dimension()
    }

    #[inline]
    pub(crate) fn walk(&self) -> Walk<'_, N, C> {
        Walk {
            arena: &self.arena,
            cmp: &self.compare,
            invariant: self.invariant,
            rank: self.dimension(),
        }
    }

    pub(crate) fn check_dim(&self, dim: usize) -> Result<()> {
        if dim >= self.dimension() {
            return Err(KdIndexError::InvalidDimension {
                dim,
                rank: self.dimension(),
            });
        }
        Ok(())
    }

    pub(crate) fn check_handle(&self, id: NodeId) -> Result<()> {
        if self.arena.get(id).is_none() {
            return Err(KdIndexError::InvalidIterator);
        }
        Ok(())
    }

    /// Insert a key, descending by the comparator; non-less keys go right,
    /// which is where both invariant modes admit equivalents.
    ///
    /// Returns the new handle and its discriminating dimension.
    pub(crate) fn insert_node(&mut self, key: N::Key) -> Result<(NodeId, usize)> {
        let rank = self.dimension();
        if self.arena.is_empty() {
            let id = self.arena.allocate(key, NodeId::HEADER)?;
            self.arena.set_root(id);
            self.arena.set_leftmost(id);
            self.arena.set_rightmost(id);
            return Ok((id, 0));
        }
        let id = self.arena.allocate(key, NodeId::HEADER)?;
        let mut cur = self.arena.root();
        let mut dim = 0;
        loop {
            let goes_left = self
                .compare
                .less(dim, self.arena.key(id), self.arena.key(cur));
            let child = if goes_left {
                self.arena.left(cur)
            } else {
                self.arena.right(cur)
            };
            if child.is_nil() {
                if goes_left {
                    self.arena.set_left(cur, id);
                    if cur == self.arena.leftmost() {
                        self.arena.set_leftmost(id);
                    }
                } else {
                    self.arena.set_right(cur, id);
                    if cur == self.arena.rightmost() {
                        self.arena.set_rightmost(id);
                    }
                }
                self.arena.set_parent(id, cur);
                break;
            }
            cur = child;
            dim = incr_dim(rank, dim);
        }
        if N::WEIGHTED {
            self.shift_weights_above(id, 1);
        }
        Ok((id, incr_dim(rank, dim)))
    }

    /// Re-attach a detached node under `at`, entering on a forced side and
    /// descending normally below it. Weight bookkeeping runs all the way to
    /// the root, matching the extraction that detached the node.
    pub(crate) fn reattach_node(
        &mut self,
        id: NodeId,
        at: NodeId,
        at_dim: usize,
        enter_right: bool,
    ) {
        let rank = self.dimension();
        if N::WEIGHTED {
            self.arena.node_mut(id).set_weight(1);
        }
        let mut cur = at;
        let mut dim = at_dim;
        let mut forced = Some(enter_right);
        loop {
            let goes_left = match forced.take() {
                Some(right) => !right,
                None => self
                    .compare
                    .less(dim, self.arena.key(id), self.arena.key(cur)),
            };
            let child = if goes_left {
                self.arena.left(cur)
            } else {
                self.arena.right(cur)
            };
            if child.is_nil() {
                if goes_left {
                    self.arena.set_left(cur, id);
                } else {
                    self.arena.set_right(cur, id);
                }
                self.arena.set_parent(id, cur);
                break;
            }
            cur = child;
            dim = incr_dim(rank, dim);
        }
        if N::WEIGHTED {
            self.shift_weights_above(id, 1);
        }
    }

    /// Add `delta` to the weight of every ancestor position of `id`.
    pub(crate) fn shift_weights_above(&mut self, id: NodeId, delta: i64) {
        let mut walk = self.arena.parent(id);
        while !walk.is_header() {
            let weight = (self.arena.node(walk).weight() as i64 + delta) as u32;
            self.arena.node_mut(walk).set_weight(weight);
            walk = self.arena.parent(walk);
        }
    }

    /// Point `parent`'s link at `new_child` where it pointed at
    /// `old_child`; the header's child link is the root.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old_child: NodeId, new_child: NodeId) {
        if parent.is_header() {
            self.arena.set_root(new_child);
        } else if self.arena.left(parent) == old_child {
            self.arena.set_left(parent, new_child);
        } else {
            self.arena.set_right(parent, new_child);
        }
    }

    /// Exchange the structural positions of two live nodes, `b` lying in
    /// `a`'s subtree. Handles keep addressing their keys; position weights
    /// travel with the positions.
    fn swap_positions(&mut self, a: NodeId, b: NodeId) {
        debug_assert_ne!(a, b);
        let (a_parent, a_left, a_right) = (
            self.arena.parent(a),
            self.arena.left(a),
            self.arena.right(a),
        );
        let (b_parent, b_left, b_right) = (
            self.arena.parent(b),
            self.arena.left(b),
            self.arena.right(b),
        );
        debug_assert_ne!(a_parent, b, "swap operand order is top-down");

        if N::WEIGHTED {
            let wa = self.arena.node(a).weight();
            let wb = self.arena.node(b).weight();
            self.arena.node_mut(a).set_weight(wb);
            self.arena.node_mut(b).set_weight(wa);
        }

        self.replace_child(a_parent, a, b);
        self.arena.set_parent(b, a_parent);

        if b_parent == a {
            // `b` steps into its parent's place; `a` becomes its child on
            // the side `b` occupied.
            if a_left == b {
                self.arena.set_left(b, a);
                self.arena.set_right(b, a_right);
                if !a_right.is_nil() {
                    self.arena.set_parent(a_right, b);
                }
            } else {
                self.arena.set_right(b, a);
                self.arena.set_left(b, a_left);
                if !a_left.is_nil() {
                    self.arena.set_parent(a_left, b);
                }
            }
            self.arena.set_parent(a, b);
        } else {
            self.arena.set_left(b, a_left);
            if !a_left.is_nil() {
                self.arena.set_parent(a_left, b);
            }
            self.arena.set_right(b, a_right);
            if !a_right.is_nil() {
                self.arena.set_parent(a_right, b);
            }
            self.replace_child(b_parent, b, a);
            self.arena.set_parent(a, b_parent);
        }

        self.arena.set_left(a, b_left);
        if !b_left.is_nil() {
            self.arena.set_parent(b_left, a);
        }
        self.arena.set_right(a, b_right);
        if !b_right.is_nil() {
            self.arena.set_parent(b_right, a);
        }
    }

    /// Splice `id` out of the tree by swapping it toward a leaf, replacing
    /// it at each step with the extreme of a subtree along its
    /// discriminating dimension. The slot stays live and detached; callers
    /// release it or re-attach it.
    ///
    /// Returns the parent of the position the final unlink happened at,
    /// which is where a balancing pass resumes from. Header extremes
    /// (`leftmost`/`rightmost`) are the caller's to fix.
    pub(crate) fn extract_node(&mut self, mut id: NodeId, mut dim: usize) -> NodeId {
        let rank = self.dimension();
        loop {
            let left = self.arena.left(id);
            let right = self.arena.right(id);
            let (candidate, candidate_dim) = if !right.is_nil() {
                self.bounded_minimum_along(right, incr_dim(rank, dim), dim, LowerLimit::None)
                    .expect("non-empty subtree has a minimum")
            } else if !left.is_nil() {
                match self.invariant {
                    Invariant::Strict => {
                        // Promoting the left maximum would strand
                        // equivalent coordinates on the left of the new
                        // split; promote the left minimum instead and move
                        // the remaining subtree to the right side, where
                        // greater-or-equivalent keys belong.
                        let found = self
                            .bounded_minimum_along(left, incr_dim(rank, dim), dim, LowerLimit::None)
                            .expect("non-empty subtree has a minimum");
                        self.arena.set_right(id, left);
                        self.arena.set_left(id, NodeId::NIL);
                        found
                    }
                    Invariant::Relaxed => self
                        .bounded_maximum_along(left, incr_dim(rank, dim), dim, UpperLimit::None)
                        .expect("non-empty subtree has a maximum"),
                }
            } else {
                let parent = self.arena.parent(id);
                self.replace_child(parent, id, NodeId::NIL);
                if N::WEIGHTED {
                    self.shift_weights_above(id, -1);
                }
                let links = self.arena.node_mut(id).links_mut();
                links.parent = NodeId::HEADER;
                links.left = NodeId::NIL;
                links.right = NodeId::NIL;
                return parent;
            };
            self.swap_positions(id, candidate);
            dim = candidate_dim;
        }
    }

    /// Smallest coordinate at `dim` within the subtree rooted at `start`,
    /// subject to a lower limit; ties resolve to the first node in
    /// pre-order. `None` when no node passes the limit.
    pub(crate) fn bounded_minimum_along(
        &self,
        start: NodeId,
        start_dim: usize,
        dim: usize,
        limit: LowerLimit<'_, N::Key>,
    ) -> Option<(NodeId, usize)> {
        let rank = self.dimension();
        let arena = &self.arena;
        let cmp = &self.compare;
        // A split at `dim` bounds its left subtree above by its own key,
        // so a key failing the limit also rules out its left subtree.
        let passes = |key: &N::Key| match limit {
            LowerLimit::None => true,
            LowerLimit::Inclusive(bound) => !cmp.less(dim, key, bound),
            LowerLimit::Exclusive(bound) => cmp.less(dim, bound, key),
        };

        let mut best: Option<(NodeId, usize)> = None;
        let mut stack: TinyVec<[(NodeId, usize); 32]> = TinyVec::new();
        stack.push((start, start_dim));
        while let Some((node, node_dim)) = stack.pop() {
            let key = arena.key(node);
            let improves = match best {
                None => passes(key),
                Some((found, _)) => passes(key) && cmp.less(dim, key, arena.key(found)),
            };
            if improves {
                best = Some((node, node_dim));
            }

            // Push right below left so the left subtree pops first,
            // keeping the scan in pre-order.
            let right = arena.right(node);
            if !right.is_nil() {
                let beats_best = match best {
                    None => true,
                    Some((found, _)) => cmp.less(dim, key, arena.key(found)),
                };
                if node_dim != dim || beats_best {
                    stack.push((right, incr_dim(rank, node_dim)));
                }
            }
            let left = arena.left(node);
            if !left.is_nil() && (node_dim != dim || passes(key)) {
                stack.push((left, incr_dim(rank, node_dim)));
            }
        }
        best
    }

    /// Largest coordinate at `dim` within the subtree rooted at `start`,
    /// subject to an upper limit; ties resolve to the last node in
    /// pre-order. `None` when no node passes the limit.
    pub(crate) fn bounded_maximum_along(
        &self,
        start: NodeId,
        start_dim: usize,
        dim: usize,
        limit: UpperLimit<'_, N::Key>,
    ) -> Option<(NodeId, usize)> {
        let rank = self.dimension();
        let arena = &self.arena;
        let cmp = &self.compare;
        let passes = |key: &N::Key| match limit {
            UpperLimit::None => true,
            UpperLimit::Exclusive(bound) => cmp.less(dim, key, bound),
        };

        let mut best: Option<(NodeId, usize)> = None;
        let mut stack: TinyVec<[(NodeId, usize); 32]> = TinyVec::new();
        stack.push((start, start_dim));
        while let Some((node, node_dim)) = stack.pop() {
            let key = arena.key(node);
            let improves = match best {
                None => passes(key),
                // Non-strict, so a tie hands the spot to the later node.
                Some((found, _)) => passes(key) && !cmp.less(dim, key, arena.key(found)),
            };
            if improves {
                best = Some((node, node_dim));
            }

            let right = arena.right(node);
            if !right.is_nil() {
                let right_viable = match limit {
                    UpperLimit::None => true,
                    UpperLimit::Exclusive(bound) => cmp.less(dim, key, bound),
                };
                if node_dim != dim || right_viable {
                    stack.push((right, incr_dim(rank, node_dim)));
                }
            }
            let left = arena.left(node);
            if !left.is_nil() {
                let beats_best = match best {
                    None => true,
                    Some((found, _)) => !cmp.less(dim, key, arena.key(found)),
                };
                if node_dim != dim || beats_best {
                    stack.push((left, incr_dim(rank, node_dim)));
                }
            }
        }
        best
    }

    /// Relink the nodes listed in `ids` into a perfectly balanced subtree
    /// discriminating on `dim`, returning its root. Medians shift to the
    /// head of their equal run so the strict left subtree stays strict.
    pub(crate) fn rebuild_balanced(
        &mut self,
        ids: &mut [NodeId],
        parent: NodeId,
        dim: usize,
    ) -> NodeId {
        if ids.is_empty() {
            return NodeId::NIL;
        }
        let rank = self.dimension();
        {
            let arena = &self.arena;
            let cmp = &self.compare;
            ids.sort_by(|&a, &b| {
                let (ka, kb) = (arena.key(a), arena.key(b));
                if cmp.less(dim, ka, kb) {
                    std::cmp::Ordering::Less
                } else if cmp.less(dim, kb, ka) {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            });
        }
        let mut mid = ids.len() / 2;
        if self.invariant == Invariant::Strict {
            // The strict left subtree must order strictly before its split,
            // so the median backs up to the head of its equal run.
            while mid > 0 {
                let (prev, here) = (self.arena.key(ids[mid - 1]), self.arena.key(ids[mid]));
                if equivalent_at(&self.compare, dim, prev, here) {
                    mid -= 1;
                } else {
                    break;
                }
            }
        }
        let root = ids[mid];
        let total = ids.len();
        let (front, rest) = ids.split_at_mut(mid);
        let (_, back) = rest.split_at_mut(1);
        let left = self.rebuild_balanced(front, root, incr_dim(rank, dim));
        let right = self.rebuild_balanced(back, root, incr_dim(rank, dim));
        self.arena.set_parent(root, parent);
        self.arena.set_left(root, left);
        self.arena.set_right(root, right);
        if N::WEIGHTED {
            self.arena.node_mut(root).set_weight(total as u32);
        }
        root
    }

    /// Reset the header extremes from the current structure.
    pub(crate) fn refresh_extremes(&mut self) {
        let root = self.arena.root();
        if root.is_header() {
            self.arena.set_leftmost(NodeId::HEADER);
            self.arena.set_rightmost(NodeId::HEADER);
        } else {
            let leftmost = self.arena.subtree_minimum(root);
            let rightmost = self.arena.subtree_maximum(root);
            self.arena.set_leftmost(leftmost);
            self.arena.set_rightmost(rightmost);
        }
    }

    /// Handles of every live node, in in-order.
    pub(crate) fn collect_inorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.arena.len());
        let mut walk = self.arena.leftmost();
        while !walk.is_header() {
            out.push(walk);
            walk = self.arena.inorder_next(walk);
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod check {
    //! Structural auditors used across the container tests.

    use super::*;

    /// Assert every structural invariant: parent links, the split
    /// invariant in the tree's mode, the weight equation, header extremes
    /// and the slab count.
    pub(crate) fn assert_tree_valid<N, C, R>(core: &CoreTree<N, C, R>)
    where
        N: KdNode + MaybeWeighted,
        C: KeyCompare<N::Key>,
        R: Rank,
    {
        let root = core.arena.root();
        if root.is_header() {
            assert_eq!(core.arena.len(), 0);
            assert!(core.arena.leftmost().is_header());
            assert!(core.arena.rightmost().is_header());
            return;
        }
        assert!(core.arena.parent(root).is_header());
        let counted = audit_subtree(core, root, 0);
        assert_eq!(counted, core.arena.len(), "slab count matches the tree");
        assert_eq!(
            core.arena.leftmost(),
            core.arena.subtree_minimum(root),
            "leftmost is the left spine end"
        );
        assert_eq!(
            core.arena.rightmost(),
            core.arena.subtree_maximum(root),
            "rightmost is the right spine end"
        );
    }

    fn audit_subtree<N, C, R>(core: &CoreTree<N, C, R>, node: NodeId, dim: usize) -> usize
    where
        N: KdNode + MaybeWeighted,
        C: KeyCompare<N::Key>,
        R: Rank,
    {
        let rank = core.dimension();
        let mut count = 1;
        let left = core.arena.left(node);
        if !left.is_nil() {
            assert_eq!(core.arena.parent(left), node);
            assert_descendants(core, left, node, dim, true);
            count += audit_subtree(core, left, incr_dim(rank, dim));
        }
        let right = core.arena.right(node);
        if !right.is_nil() {
            assert_eq!(core.arena.parent(right), node);
            assert_descendants(core, right, node, dim, false);
            count += audit_subtree(core, right, incr_dim(rank, dim));
        }
        if N::WEIGHTED {
            let expected = 1 + core.arena.weight_of(left) + core.arena.weight_of(right);
            assert_eq!(
                core.arena.node(node).weight(),
                expected,
                "weight equation holds"
            );
        }
        count
    }

    fn assert_descendants<N, C, R>(
        core: &CoreTree<N, C, R>,
        subtree: NodeId,
        split: NodeId,
        dim: usize,
        is_left: bool,
    ) where
        N: KdNode + MaybeWeighted,
        C: KeyCompare<N::Key>,
        R: Rank,
    {
        let split_key = core.arena.key(split);
        let mut stack = vec![subtree];
        while let Some(node) = stack.pop() {
            let key = core.arena.key(node);
            if is_left {
                match core.invariant {
                    Invariant::Strict => assert!(
                        core.compare.less(dim, key, split_key),
                        "strict left subtree orders strictly before the split"
                    ),
                    Invariant::Relaxed => assert!(
                        !core.compare.less(dim, split_key, key),
                        "relaxed left subtree never orders after the split"
                    ),
                }
            } else {
                assert!(
                    !core.compare.less(dim, key, split_key),
                    "right subtree never orders before the split"
                );
            }
            let left = core.arena.left(node);
            if !left.is_nil() {
                stack.push(left);
            }
            let right = core.arena.right(node);
            if !right.is_nil() {
                stack.push(right);
            }
        }
    }
}
