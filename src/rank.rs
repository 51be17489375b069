use crate::error::{KdIndexError, Result};

/// The number of coordinate dimensions a tree discriminates on.
///
/// A rank is either fixed at compile time ([`ConstRank`], which occupies no
/// storage) or carried as a runtime value ([`DynRank`]). Dimension indices
/// run `0..dimension()`.
pub trait Rank: Copy {
    /// The magnitude of the rank. Always strictly positive.
    fn dimension(&self) -> usize;
}

/// A rank fixed at compile time.
///
/// `R` must be strictly positive; this is enforced where trees are
/// constructed, since zero is reserved for runtime-rank selection in
/// container shells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstRank<const R: usize>;

impl<const R: usize> Rank for ConstRank<R> {
    #[inline]
    fn dimension(&self) -> usize {
        R
    }
}

/// A rank determined at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynRank(usize);

impl DynRank {
    /// Create a runtime rank.
    ///
    /// ## Errors
    ///
    /// - If `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(KdIndexError::InvalidRank);
        }
        Ok(Self(dimension))
    }
}

impl Rank for DynRank {
    #[inline]
    fn dimension(&self) -> usize {
        self.0
    }
}

/// Next discriminating dimension when descending one level.
#[inline]
pub(crate) fn incr_dim(rank: usize, dim: usize) -> usize {
    let next = dim + 1;
    if next == rank {
        0
    } else {
        next
    }
}

/// Previous discriminating dimension when ascending one level.
#[inline]
pub(crate) fn decr_dim(rank: usize, dim: usize) -> usize {
    if dim == 0 {
        rank - 1
    } else {
        dim - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dyn_rank_rejects_zero() {
        assert_eq!(DynRank::new(0).unwrap_err(), KdIndexError::InvalidRank);
        assert_eq!(DynRank::new(3).unwrap().dimension(), 3);
    }

    #[test]
    fn dim_arithmetic_wraps() {
        assert_eq!(incr_dim(3, 0), 1);
        assert_eq!(incr_dim(3, 2), 0);
        assert_eq!(decr_dim(3, 0), 2);
        assert_eq!(decr_dim(3, 1), 0);
    }
}
