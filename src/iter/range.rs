use crate::compare::{BoxCompare, KeyCompare};
use crate::node::{KdNode, NodeId};
use crate::predicate::{ClosedBounds, EncloseBounds, HalfOpenBounds, OpenBounds, OverlapBounds};
use crate::rank::Rank;
use crate::tree::{CoreTree, MaybeWeighted};

/// Which edges of the interval box are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntervalMode {
    /// `[lower, upper)`
    HalfOpen,
    /// `[lower, upper]`
    Closed,
    /// `(lower, upper)`
    Open,
}

/// Iterates every key inside an axis-aligned box, in pre-order of the
/// underlying tree.
pub struct RangeIter<'a, N: KdNode, C, R> {
    core: &'a CoreTree<N, C, R>,
    lower: N::Key,
    upper: N::Key,
    mode: IntervalMode,
    front: (NodeId, usize),
    back: (NodeId, usize),
}

impl<'a, N, C, R> RangeIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: KeyCompare<N::Key>,
    R: Rank,
{
    pub(crate) fn new(
        core: &'a CoreTree<N, C, R>,
        lower: N::Key,
        upper: N::Key,
        mode: IntervalMode,
    ) -> Self {
        let end = (NodeId::HEADER, core.dimension() - 1);
        let mut iter = RangeIter {
            core,
            lower,
            upper,
            mode,
            front: end,
            back: end,
        };
        if !core.arena.is_empty() {
            let start = (core.arena.root(), 0);
            iter.front = iter.seek(start, Seek::First);
        }
        iter
    }

    fn seek(&self, from: (NodeId, usize), direction: Seek) -> (NodeId, usize) {
        let walk = self.core.walk();
        match self.mode {
            IntervalMode::HalfOpen => {
                let pred = HalfOpenBounds {
                    lower: &self.lower,
                    upper: &self.upper,
                };
                direction.step(&walk, &pred, from)
            }
            IntervalMode::Closed => {
                let pred = ClosedBounds {
                    lower: &self.lower,
                    upper: &self.upper,
                };
                direction.step(&walk, &pred, from)
            }
            IntervalMode::Open => {
                let pred = OpenBounds {
                    lower: &self.lower,
                    upper: &self.upper,
                };
                direction.step(&walk, &pred, from)
            }
        }
    }
}

impl<'a, N, C, R> Iterator for RangeIter<'a, N, C, R>
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
        self.front = self.seek(self.front, Seek::Next);
        Some(core.arena.key(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.core.arena.len()))
    }
}

impl<'a, N, C, R> DoubleEndedIterator for RangeIter<'a, N, C, R>
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
        self.back = self.seek(self.back, Seek::Previous);
        Some(core.arena.key(self.back.0))
    }
}

/// Whether a stored box must intersect or fit inside the query box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoxMode {
    Overlap,
    Enclose,
}

/// Iterates box keys intersecting or contained in a query box, in
/// pre-order of the underlying tree.
///
/// Box keys use the low/high layout: for a tree of rank `2h`, dimensions
/// `0..h` are the low coordinates and `h..2h` the high coordinates.
#[derive(Debug)]
pub struct BoxIter<'a, N: KdNode, C, R> {
    core: &'a CoreTree<N, C, R>,
    query: N::Key,
    mode: BoxMode,
    front: (NodeId, usize),
    back: (NodeId, usize),
}

impl<'a, N, C, R> BoxIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: BoxCompare<N::Key>,
    R: Rank,
{
    pub(crate) fn new(core: &'a CoreTree<N, C, R>, query: N::Key, mode: BoxMode) -> Self {
        let end = (NodeId::HEADER, core.dimension() - 1);
        let mut iter = BoxIter {
            core,
            query,
            mode,
            front: end,
            back: end,
        };
        if !core.arena.is_empty() {
            let start = (core.arena.root(), 0);
            iter.front = iter.seek(start, Seek::First);
        }
        iter
    }

    fn seek(&self, from: (NodeId, usize), direction: Seek) -> (NodeId, usize) {
        let walk = self.core.walk();
        let half = self.core.dimension() / 2;
        match self.mode {
            BoxMode::Overlap => {
                let pred = OverlapBounds {
                    query: &self.query,
                    half,
                };
                direction.step(&walk, &pred, from)
            }
            BoxMode::Enclose => {
                let pred = EncloseBounds {
                    query: &self.query,
                    half,
                };
                direction.step(&walk, &pred, from)
            }
        }
    }
}

impl<'a, N, C, R> Iterator for BoxIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: BoxCompare<N::Key>,
    R: Rank,
{
    type Item = &'a N::Key;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let core = self.core;
        let id = self.front.0;
        self.front = self.seek(self.front, Seek::Next);
        Some(core.arena.key(id))
    }
}

impl<'a, N, C, R> DoubleEndedIterator for BoxIter<'a, N, C, R>
where
    N: KdNode + MaybeWeighted,
    C: BoxCompare<N::Key>,
    R: Rank,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front.0 == self.back.0 {
            return None;
        }
        let core = self.core;
        self.back = self.seek(self.back, Seek::Previous);
        Some(core.arena.key(self.back.0))
    }
}

/// The three walk entries a filtered iterator needs.
#[derive(Clone, Copy)]
enum Seek {
    First,
    Next,
    Previous,
}

impl Seek {
    fn step<N, C, P>(
        self,
        walk: &crate::preorder::Walk<'_, N, C>,
        pred: &P,
        from: (NodeId, usize),
    ) -> (NodeId, usize)
    where
        N: KdNode,
        C: KeyCompare<N::Key>,
        P: crate::predicate::TraversalPredicate<N::Key, C>,
    {
        match self {
            Seek::First => walk.preorder_minimum(pred, from.0, from.1),
            Seek::Next => walk.preorder_increment(pred, from.0, from.1),
            Seek::Previous => walk.preorder_decrement(pred, from.0, from.1),
        }
    }
}
