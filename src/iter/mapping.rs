use crate::compare::KeyCompare;
use crate::node::{KdNode, NodeId};
use crate::predicate::EquivalentAt;
use crate::rank::Rank;
use crate::tree::{CoreTree, LowerLimit, MaybeWeighted, UpperLimit};

/// Iterates every key in ascending order of its coordinate at one chosen
/// dimension.
///
/// The traversal order is total: ascending coordinate at the mapping
/// dimension, ties resolved by pre-order position in the underlying tree.
/// Stepping first exhausts the pre-order run of keys tied with the current
/// one, then rescans for the smallest strictly greater coordinate.
#[derive(Debug)]
pub struct MappingIter<'a, N: KdNode, C, R> {
    core: &'a CoreTree<N, C, R>,
    map_dim: usize,
    front: (NodeId, usize),
    back: (NodeId, usize),
}

impl<'a, N, C, R> MappingIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
{
    /// Full traversal, starting from the dimension minimum.
    pub(crate) fn new(core: &'a CoreTree<N, C, R>, map_dim: usize) -> Self {
        Self::with_limit(core, map_dim, LowerLimit::None)
    }

    /// Traversal starting at the first key not below `bound`.
    pub(crate) fn from_lower_bound(
        core: &'a CoreTree<N, C, R>,
        map_dim: usize,
        bound: &N::Key,
    ) -> Self {
        Self::with_limit(core, map_dim, LowerLimit::Inclusive(bound))
    }

    /// Traversal starting at the first key strictly above `bound`.
    pub(crate) fn from_upper_bound(
        core: &'a CoreTree<N, C, R>,
        map_dim: usize,
        bound: &N::Key,
    ) -> Self {
        Self::with_limit(core, map_dim, LowerLimit::Exclusive(bound))
    }

    fn with_limit(
        core: &'a CoreTree<N, C, R>,
        map_dim: usize,
        limit: LowerLimit<'_, N::Key>,
    ) -> Self {
        let end = (NodeId::HEADER, core.dimension() - 1);
        let front = if core.arena.is_empty() {
            end
        } else {
            core.bounded_minimum_along(core.arena.root(), 0, map_dim, limit)
                .unwrap_or(end)
        };
        MappingIter {
            core,
            map_dim,
            front,
            back: end,
        }
    }

    /// The dimension this iterator orders by.
    pub fn mapping_dimension(&self) -> usize {
        self.map_dim
    }

    fn advance(&self, from: (NodeId, usize)) -> (NodeId, usize) {
        let core = self.core;
        let end = (NodeId::HEADER, core.dimension() - 1);
        let model = core.arena.key(from.0);
        let pred = EquivalentAt {
            map_dim: self.map_dim,
            model,
        };
        let stepped = core.walk().preorder_increment(&pred, from.0, from.1);
        if !stepped.0.is_header() {
            return stepped;
        }
        core.bounded_minimum_along(
            core.arena.root(),
            0,
            self.map_dim,
            LowerLimit::Exclusive(model),
        )
        .unwrap_or(end)
    }

    fn retreat(&self, from: (NodeId, usize)) -> (NodeId, usize) {
        let core = self.core;
        let end = (NodeId::HEADER, core.dimension() - 1);
        if from.0.is_header() {
            return core
                .bounded_maximum_along(core.arena.root(), 0, self.map_dim, UpperLimit::None)
                .unwrap_or(end);
        }
        let model = core.arena.key(from.0);
        let pred = EquivalentAt {
            map_dim: self.map_dim,
            model,
        };
        let stepped = core.walk().preorder_decrement(&pred, from.0, from.1);
        if !stepped.0.is_header() {
            return stepped;
        }
        core.bounded_maximum_along(
            core.arena.root(),
            0,
            self.map_dim,
            UpperLimit::Exclusive(model),
        )
        .unwrap_or(end)
    }
}

impl<'a, N, C, R> Iterator for MappingIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
{
    type Item = &'a N::Key;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let core = self.core;
        let id = self.front.0;
        self.front = self.advance(self.front);
        Some(core.arena.key(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.core.arena.len()))
    }
}

impl<'a, N, C, R> DoubleEndedIterator for MappingIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let core = self.core;
        self.back = self.retreat(self.back);
        Some(core.arena.key(self.back.0))
    }
}
