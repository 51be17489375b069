//! Distance metrics for nearest-neighbor queries.
//!
//! A [`DistanceMetric`] turns a key pair into a non-negative, totally
//! ordered scalar, and additionally measures the distance from an origin to
//! the axis-aligned plane through a key. The plane form is what lets the
//! neighbor iterator prune: a subtree on the far side of a split may be
//! skipped exactly when the plane distance already exceeds the best known
//! distance.

use std::ops::Index;

use num_traits::{Float, Num};

/// A distance over keys, together with its point-to-plane form.
///
/// The contract binding the two forms: for any keys `o`, `k` and any `x`
/// strictly on the far side of `k`'s plane along `dim` as seen from `o`,
/// `distance(o, x) >= distance_to_plane(dim, o, k)`. Both
/// [`ManhattanDistance`] and the Euclidean metrics satisfy it.
pub trait DistanceMetric<K> {
    /// The scalar produced by this metric. Float `NaN` is not supported and
    /// may panic inside ordered queues.
    type Distance: Copy + PartialOrd;

    /// Distance between two keys across `rank` dimensions.
    fn distance(&self, rank: usize, origin: &K, key: &K) -> Self::Distance;

    /// Distance from `origin` to the axis-aligned plane through `key`
    /// along `dim`.
    fn distance_to_plane(&self, dim: usize, origin: &K, key: &K) -> Self::Distance;
}

/// Absolute difference that also works for unsigned coordinates.
#[inline]
fn axis_gap<S: Num + PartialOrd + Copy>(a: S, b: S) -> S {
    if a < b {
        b - a
    } else {
        a - b
    }
}

/// Taxicab distance: the sum of per-axis gaps.
///
/// Exact for integer coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanDistance;

impl<K, S> DistanceMetric<K> for ManhattanDistance
where
    K: Index<usize, Output = S>,
    S: Num + PartialOrd + Copy,
{
    type Distance = S;

    #[inline]
    fn distance(&self, rank: usize, origin: &K, key: &K) -> S {
        let mut total = S::zero();
        for dim in 0..rank {
            total = total + axis_gap(origin[dim], key[dim]);
        }
        total
    }

    #[inline]
    fn distance_to_plane(&self, dim: usize, origin: &K, key: &K) -> S {
        axis_gap(origin[dim], key[dim])
    }
}

/// Squared straight-line distance.
///
/// Orders identically to Euclidean distance while staying exact over
/// integer coordinates; prefer it whenever the magnitude itself is not
/// needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclideanDistance;

impl<K, S> DistanceMetric<K> for SquaredEuclideanDistance
where
    K: Index<usize, Output = S>,
    S: Num + PartialOrd + Copy,
{
    type Distance = S;

    #[inline]
    fn distance(&self, rank: usize, origin: &K, key: &K) -> S {
        let mut total = S::zero();
        for dim in 0..rank {
            let gap = axis_gap(origin[dim], key[dim]);
            total = total + gap * gap;
        }
        total
    }

    #[inline]
    fn distance_to_plane(&self, dim: usize, origin: &K, key: &K) -> S {
        let gap = axis_gap(origin[dim], key[dim]);
        gap * gap
    }
}

/// Straight-line distance over floating-point coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl<K, S> DistanceMetric<K> for EuclideanDistance
where
    K: Index<usize, Output = S>,
    S: Float,
{
    type Distance = S;

    #[inline]
    fn distance(&self, rank: usize, origin: &K, key: &K) -> S {
        let mut total = S::zero();
        for dim in 0..rank {
            let gap = origin[dim] - key[dim];
            total = total + gap * gap;
        }
        total.sqrt()
    }

    #[inline]
    fn distance_to_plane(&self, dim: usize, origin: &K, key: &K) -> S {
        (origin[dim] - key[dim]).abs()
    }
}
