//! The predicate-filtered pre-order walk.
//!
//! One traversal serves every spatial iterator. It enumerates, in pre-order
//! (node, left, right), the subset of nodes whose keys match a
//! [`TraversalPredicate`], descending only into subtrees the predicate
//! cannot rule out. The discriminating dimension is carried alongside the
//! handle: descending one level increments it modulo rank, ascending
//! decrements it, so climbing from the root leaves the header paired with
//! dimension `rank - 1`, the dimension of every end value.

use crate::compare::KeyCompare;
use crate::node::{Arena, KdNode, NodeId};
use crate::predicate::{Invariant, TraversalPredicate};
use crate::rank::{decr_dim, incr_dim};

/// Walk context threaded through the four traversal entry points.
pub(crate) struct Walk<'a, N, C> {
    pub(crate) arena: &'a Arena<N>,
    pub(crate) cmp: &'a C,
    pub(crate) invariant: Invariant,
    pub(crate) rank: usize,
}

impl<N: KdNode, C: KeyCompare<N::Key>> Walk<'_, N, C> {
    #[inline]
    fn left_ok<P: TraversalPredicate<N::Key, C>>(&self, pred: &P, node: NodeId, dim: usize) -> bool {
        pred.descend_left(self.cmp, self.invariant, dim, self.arena.key(node))
    }

    #[inline]
    fn right_ok<P: TraversalPredicate<N::Key, C>>(&self, pred: &P, node: NodeId, dim: usize) -> bool {
        pred.descend_right(self.cmp, dim, self.arena.key(node))
    }

    #[inline]
    fn matches<P: TraversalPredicate<N::Key, C>>(&self, pred: &P, node: NodeId) -> bool {
        pred.matches(self.cmp, self.rank, self.arena.key(node))
    }

    /// First matching node at or after `(node, dim)` in pre-order; the
    /// header when no node matches.
    pub(crate) fn preorder_minimum<P>(&self, pred: &P, node: NodeId, dim: usize) -> (NodeId, usize)
    where
        P: TraversalPredicate<N::Key, C>,
    {
        if self.matches(pred, node) {
            return (node, dim);
        }
        self.preorder_increment(pred, node, dim)
    }

    /// Last matching node of the subtree rooted at `(node, dim)`; the
    /// header when no node matches.
    pub(crate) fn preorder_maximum<P>(
        &self,
        pred: &P,
        mut node: NodeId,
        mut dim: usize,
    ) -> (NodeId, usize)
    where
        P: TraversalPredicate<N::Key, C>,
    {
        // Dive to the last node the predicate lets the walk reach.
        loop {
            let right = self.arena.right(node);
            if !right.is_nil() && self.right_ok(pred, node, dim) {
                node = right;
                dim = incr_dim(self.rank, dim);
                continue;
            }
            let left = self.arena.left(node);
            if !left.is_nil() && self.left_ok(pred, node, dim) {
                node = left;
                dim = incr_dim(self.rank, dim);
                continue;
            }
            break;
        }
        if self.matches(pred, node) {
            return (node, dim);
        }
        self.preorder_decrement(pred, node, dim)
    }

    /// Next matching node after `(node, dim)` in pre-order; the header when
    /// the walk is exhausted.
    pub(crate) fn preorder_increment<P>(
        &self,
        pred: &P,
        mut node: NodeId,
        mut dim: usize,
    ) -> (NodeId, usize)
    where
        P: TraversalPredicate<N::Key, C>,
    {
        loop {
            let left = self.arena.left(node);
            let right = self.arena.right(node);
            if !left.is_nil() && self.left_ok(pred, node, dim) {
                node = left;
                dim = incr_dim(self.rank, dim);
            } else if !right.is_nil() && self.right_ok(pred, node, dim) {
                node = right;
                dim = incr_dim(self.rank, dim);
            } else {
                // Climb until a right sibling subtree opens up.
                let mut prev = node;
                node = self.arena.parent(node);
                dim = decr_dim(self.rank, dim);
                while !node.is_header()
                    && (prev == self.arena.right(node)
                        || self.arena.right(node).is_nil()
                        || !self.right_ok(pred, node, dim))
                {
                    prev = node;
                    node = self.arena.parent(node);
                    dim = decr_dim(self.rank, dim);
                }
                if node.is_header() {
                    return (node, dim);
                }
                node = self.arena.right(node);
                dim = incr_dim(self.rank, dim);
            }
            if self.matches(pred, node) {
                return (node, dim);
            }
        }
    }

    /// Previous matching node before `(node, dim)` in pre-order. From the
    /// header this is the last matching node of the whole tree; the header
    /// when nothing precedes.
    pub(crate) fn preorder_decrement<P>(
        &self,
        pred: &P,
        mut node: NodeId,
        mut dim: usize,
    ) -> (NodeId, usize)
    where
        P: TraversalPredicate<N::Key, C>,
    {
        if node.is_header() {
            let root = self.arena.root();
            if root.is_header() {
                return (node, dim);
            }
            return self.preorder_maximum(pred, root, 0);
        }
        loop {
            let prev = node;
            node = self.arena.parent(node);
            dim = decr_dim(self.rank, dim);
            if node.is_header() {
                return (node, dim);
            }
            if prev == self.arena.right(node) {
                let left = self.arena.left(node);
                if !left.is_nil() && self.left_ok(pred, node, dim) {
                    // The predecessor is the deepest reachable node of the
                    // left sibling subtree.
                    node = left;
                    dim = incr_dim(self.rank, dim);
                    loop {
                        let right = self.arena.right(node);
                        if !right.is_nil() && self.right_ok(pred, node, dim) {
                            node = right;
                            dim = incr_dim(self.rank, dim);
                            continue;
                        }
                        let deeper_left = self.arena.left(node);
                        if !deeper_left.is_nil() && self.left_ok(pred, node, dim) {
                            node = deeper_left;
                            dim = incr_dim(self.rank, dim);
                            continue;
                        }
                        break;
                    }
                }
            }
            if self.matches(pred, node) {
                return (node, dim);
            }
        }
    }
}
