use crate::compare::KeyCompare;
use crate::node::{KdNode, NodeId};
use crate::predicate::EqualKey;
use crate::rank::Rank;
use crate::tree::{CoreTree, MaybeWeighted};

/// Iterates every key coordinate-equal to a model key, in pre-order of the
/// underlying tree.
pub struct EqualIter<'a, N: KdNode, C, R> {
    core: &'a CoreTree<N, C, R>,
    model: N::Key,
    front: (NodeId, usize),
    back: (NodeId, usize),
}

impl<'a, N, C, R> EqualIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
{
    pub(crate) fn new(core: &'a CoreTree<N, C, R>, model: N::Key) -> Self {
        let end = (NodeId::HEADER, core.dimension() - 1);
        let front = if core.arena.is_empty() {
            end
        } else {
            let pred = EqualKey { model: &model };
            core.walk().preorder_minimum(&pred, core.arena.root(), 0)
        };
        EqualIter {
            core,
            model,
            front,
            back: end,
        }
    }

    /// The key all yielded elements compare equal to.
    pub fn model(&self) -> &N::Key {
        &self.model
    }
}

impl<'a, N, C, R> Iterator for EqualIter<'a, N, C, R>
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
        let (id, dim) = self.front;
        let pred = EqualKey { model: &self.model };
        self.front = core.walk().preorder_increment(&pred, id, dim);
        Some(core.arena.key(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.core.arena.len()))
    }
}

impl<'a, N, C, R> DoubleEndedIterator for EqualIter<'a, N, C, R>
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
        let pred = EqualKey { model: &self.model };
        self.back = core.walk().preorder_decrement(&pred, self.back.0, self.back.1);
        Some(core.arena.key(self.back.0))
    }
}
