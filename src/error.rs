use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum KdIndexError {
    /// A runtime rank of zero was supplied at construction.
    #[error("Rank must be strictly positive.")]
    InvalidRank,

    /// A balancing policy was constructed with an out-of-range parameter.
    #[error("Balancing policy parameter is out of range.")]
    InvalidPolicy,

    /// A query referenced a dimension outside `0..rank`.
    #[error("Dimension {dim} is out of range for rank {rank}.")]
    InvalidDimension { dim: usize, rank: usize },

    /// Node allocation failed.
    #[error("Out of memory while allocating a node.")]
    OutOfMemory,

    /// A handle did not address a live element of this tree.
    #[error("Handle does not address a live element.")]
    InvalidIterator,
}

pub type Result<T> = std::result::Result<T, KdIndexError>;
