use tinyvec::TinyVec;

use crate::compare::KeyCompare;
use crate::metric::DistanceMetric;
use crate::node::{KdNode, NodeId};
use crate::predicate::NeighborShell;
use crate::rank::{incr_dim, Rank};
use crate::tree::{CoreTree, MaybeWeighted};

/// Lower limit on the distances a scan may report.
#[derive(Clone, Copy)]
pub(crate) enum DistLimit<D> {
    None,
    AtLeast(D),
    Above(D),
}

/// Iterates every key in ascending order of its distance from an origin.
///
/// The traversal order is total: ascending distance, ties resolved by
/// pre-order position in the underlying tree. Stepping first exhausts the
/// pre-order run of keys tied with the current distance (pruning by the
/// splitting-plane distance), then rescans best-first for the smallest
/// strictly greater distance.
pub struct NeighborIter<'a, N: KdNode, C, R, M: DistanceMetric<N::Key>> {
    core: &'a CoreTree<N, C, R>,
    origin: N::Key,
    metric: M,
    front: Option<(NodeId, usize, M::Distance)>,
}

impl<'a, N, C, R, M> NeighborIter<'a, N, C, R, M>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
    M: DistanceMetric<N::Key>,
{
    pub(crate) fn new(
        core: &'a CoreTree<N, C, R>,
        origin: N::Key,
        metric: M,
        start: DistLimit<M::Distance>,
    ) -> Self {
        let front = nearest(core, &origin, &metric, start);
        NeighborIter {
            core,
            origin,
            metric,
            front,
        }
    }

    /// The origin distances are measured from.
    pub fn origin(&self) -> &N::Key {
        &self.origin
    }
}

impl<'a, N, C, R, M> Iterator for NeighborIter<'a, N, C, R, M>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
    M: DistanceMetric<N::Key>,
{
    type Item = (M::Distance, &'a N::Key);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, dim, distance) = self.front?;
        let core = self.core;
        let key = core.arena.key(id);
        let pred = NeighborShell {
            origin: &self.origin,
            metric: &self.metric,
            shell: distance,
        };
        let stepped = core.walk().preorder_increment(&pred, id, dim);
        self.front = if !stepped.0.is_header() {
            Some((stepped.0, stepped.1, distance))
        } else {
            nearest(core, &self.origin, &self.metric, DistLimit::Above(distance))
        };
        Some((distance, key))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.core.arena.len()))
    }
}

/// Best-first scan for the node nearest to `origin` among those passing
/// `limit`; ties resolve to the first node in pre-order. Subtrees are
/// pruned when the splitting plane already lies farther than the best
/// known distance.
fn nearest<N, C, R, M>(
    core: &CoreTree<N, C, R>,
    origin: &N::Key,
    metric: &M,
    limit: DistLimit<M::Distance>,
) -> Option<(NodeId, usize, M::Distance)>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
    M: DistanceMetric<N::Key>,
{
    let root = core.arena.root();
    if root.is_header() {
        return None;
    }
    let rank = core.dimension();
    let cmp = &core.compare;

    let mut best: Option<(NodeId, usize, M::Distance)> = None;
    let mut stack: TinyVec<[(NodeId, usize); 32]> = TinyVec::new();
    stack.push((root, 0));
    while let Some((node, dim)) = stack.pop() {
        let key = core.arena.key(node);
        let distance = metric.distance(rank, origin, key);
        let passes = match limit {
            DistLimit::None => true,
            DistLimit::AtLeast(bound) => distance >= bound,
            DistLimit::Above(bound) => distance > bound,
        };
        if passes
            && best
                .as_ref()
                .map_or(true, |&(_, _, found)| distance < found)
        {
            best = Some((node, dim, distance));
        }

        // Push right below left so the left subtree pops first, keeping
        // the scan in pre-order.
        let right = core.arena.right(node);
        if !right.is_nil() {
            let viable = match best {
                None => true,
                Some((_, _, found)) => {
                    !cmp.less(dim, origin, key)
                        || metric.distance_to_plane(dim, origin, key) < found
                }
            };
            if viable {
                stack.push((right, incr_dim(rank, dim)));
            }
        }
        let left = core.arena.left(node);
        if !left.is_nil() {
            let viable = match best {
                None => true,
                Some((_, _, found)) => {
                    !cmp.less(dim, key, origin)
                        || metric.distance_to_plane(dim, origin, key) < found
                }
            };
            if viable {
                stack.push((left, incr_dim(rank, dim)));
            }
        }
    }
    best
}
