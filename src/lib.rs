//! Dynamic k-dimensional point indexes.
//!
//! Associative containers keyed by points in k-dimensional space, with
//! spatial iterators for exact-match, orthogonal-range, per-dimension
//! ordered and nearest-neighbor traversal.
//!
//! ## Containers
//!
//! Use [`FrozenKDTree`] when the workload loads data, calls
//! [`rebalance`][FrozenKDTree::rebalance], and then mostly queries. Use
//! [`RelaxedKDTree`] when insertions and erasures keep coming: it carries
//! per-node subtree weights and rebalances itself under a pluggable
//! [`BalancingPolicy`].
//!
//! Keys are opaque to the trees. All ordering flows through a
//! [`KeyCompare`] evaluated per dimension: [`IndexLess`] covers keys
//! indexable by dimension, and [`FnCompare`] adapts a closure. Distances
//! for neighbor queries flow through a [`DistanceMetric`].
//!
//! ## Queries
//!
//! Both containers expose the same query surface: `find`/`find_if`,
//! `equal_range`, `range` (half-open, closed, open), `overlapping` and
//! `enclosed` for box keys, `mapping_iter`/`lower_bound_mapping`/
//! `upper_bound_mapping` for ordered traversal along one dimension, and
//! `neighbors` for nearest-first traversal.
//!
//! ## Example
//!
//! ```
//! use kd_index::{FrozenKDTree, IndexLess, ManhattanDistance};
//!
//! let mut tree = FrozenKDTree::with_dimension(2, IndexLess)?;
//! for point in [[3, 6], [17, 15], [13, 15], [6, 12], [9, 1], [2, 7], [10, 19]] {
//!     tree.insert(point)?;
//! }
//! assert_eq!(tree.len(), 7);
//!
//! let found = tree.find(&[13, 15]).unwrap();
//! assert_eq!(tree.get(found), Some(&[13, 15]));
//!
//! // Orthogonal range query over the half-open box [(0, 0), (10, 15)).
//! assert_eq!(tree.range([0, 0], [10, 15]).count(), 4);
//!
//! // Nearest neighbor under the taxicab metric.
//! let (distance, nearest) = tree.neighbors([10, 10], ManhattanDistance).next().unwrap();
//! assert_eq!((distance, nearest), (6, &[6, 12]));
//! # Ok::<(), kd_index::KdIndexError>(())
//! ```

mod compare;
mod error;
mod frozen;
pub mod iter;
pub mod metric;
mod node;
mod predicate;
mod preorder;
mod rank;
mod relaxed;
mod tree;

pub use compare::{BoxCompare, FnCompare, IndexLess, KeyCompare};
pub use error::{KdIndexError, Result};
pub use frozen::FrozenKDTree;
pub use metric::{DistanceMetric, EuclideanDistance, ManhattanDistance, SquaredEuclideanDistance};
pub use node::{KdNode, NodeId, PlainNode, WeightedNode};
pub use rank::{ConstRank, DynRank, Rank};
pub use relaxed::{BalancingPolicy, LooseBalancing, RelaxedKDTree, TightBalancing};
