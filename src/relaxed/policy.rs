//! Balancing policies.
//!
//! A policy is a pure predicate over subtree weights: given the weight of
//! a node's subtree and the weight of its heavier child's subtree, it
//! decides whether the node must be rebalanced. The tree consults it after
//! every insertion and erasure, bottom-up along the touched chain.

use crate::error::{KdIndexError, Result};

/// Decides when a subtree's weight distribution demands rebalancing.
pub trait BalancingPolicy {
    /// `true` when a child subtree of `child_weight` is too heavy for a
    /// node whose subtree weighs `parent_weight` (the node itself
    /// included).
    fn imbalanced(&self, parent_weight: u32, child_weight: u32) -> bool;
}

/// Tolerates small subtrees entirely, and otherwise a heavier child
/// outweighing the rest of the subtree by at most one.
///
/// The size threshold under which imbalance is ignored is a parameter;
/// lower values keep the tree tighter at the cost of more rebalancing
/// near the leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LooseBalancing {
    threshold: u32,
}

impl LooseBalancing {
    /// A loose policy ignoring imbalance in subtrees lighter than
    /// `threshold`.
    ///
    /// ## Errors
    ///
    /// - If `threshold` is zero.
    pub fn new(threshold: u32) -> Result<Self> {
        if threshold == 0 {
            return Err(KdIndexError::InvalidPolicy);
        }
        Ok(LooseBalancing { threshold })
    }
}

impl Default for LooseBalancing {
    fn default() -> Self {
        LooseBalancing { threshold: 4 }
    }
}

impl BalancingPolicy for LooseBalancing {
    #[inline]
    fn imbalanced(&self, parent_weight: u32, child_weight: u32) -> bool {
        child_weight >= self.threshold && child_weight > parent_weight - child_weight + 1
    }
}

/// Caps the heavier child at a fixed fraction of its subtree.
///
/// `alpha` must lie strictly between ½ and 1; smaller values bound the
/// depth more tightly (≤ log₂(n) / log₂(1/α)) and rebalance more often.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TightBalancing {
    alpha: f64,
}

impl TightBalancing {
    /// A tight policy with the given fraction.
    ///
    /// ## Errors
    ///
    /// - If `alpha` is outside the open interval (½, 1).
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.5 && alpha < 1.0) {
            return Err(KdIndexError::InvalidPolicy);
        }
        Ok(TightBalancing { alpha })
    }
}

impl Default for TightBalancing {
    fn default() -> Self {
        TightBalancing { alpha: 0.7 }
    }
}

impl BalancingPolicy for TightBalancing {
    #[inline]
    fn imbalanced(&self, parent_weight: u32, child_weight: u32) -> bool {
        child_weight as f64 > self.alpha * parent_weight as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_ignores_small_subtrees() {
        let policy = LooseBalancing::default();
        // Three nodes hanging in a chain are still below the threshold.
        assert!(!policy.imbalanced(4, 3));
        assert!(policy.imbalanced(5, 4));
        assert!(!policy.imbalanced(9, 5));
        assert!(policy.imbalanced(9, 6));
    }

    #[test]
    fn tight_caps_the_heavy_fraction() {
        let policy = TightBalancing::default();
        assert!(!policy.imbalanced(10, 7));
        assert!(policy.imbalanced(10, 8));
        assert!(policy.imbalanced(4, 3));
    }

    #[test]
    fn constructors_reject_out_of_range_parameters() {
        assert_eq!(
            LooseBalancing::new(0).unwrap_err(),
            KdIndexError::InvalidPolicy
        );
        assert_eq!(LooseBalancing::new(2).unwrap().threshold, 2);
        assert_eq!(
            TightBalancing::new(0.5).unwrap_err(),
            KdIndexError::InvalidPolicy
        );
        assert_eq!(
            TightBalancing::new(1.0).unwrap_err(),
            KdIndexError::InvalidPolicy
        );
        assert_eq!(TightBalancing::new(0.6).unwrap().alpha, 0.6);
    }
}
