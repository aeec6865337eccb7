//! Error types for the sequence memory engine.
//!
//! All fallible operations return [`Result`], whose error type groups into three
//! families: configuration errors (raised once, at construction), range errors
//! (bad column/cell/segment indices, never corrupt state), and consistency errors
//! (invariant violations found by the optional per-step synapse check).

use thiserror::Error;

/// The main error type for sequence memory operations.
#[derive(Error, Debug)]
pub enum SeqMemError {
    /// A configuration parameter is invalid
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Column index out of bounds
    #[error("Column index out of range: index {index}, length {length}")]
    ColumnOutOfRange {
        /// The column index that was requested
        index: usize,
        /// Number of columns
        length: usize,
    },

    /// Cell index out of bounds
    #[error("Cell index out of range: index {index}, length {length}")]
    CellOutOfRange {
        /// The cell index that was requested
        index: usize,
        /// Cells per column
        length: usize,
    },

    /// Segment index out of bounds for a given cell
    #[error("Segment index out of range: cell ({column}, {cell}) has {length} segments, got {index}")]
    SegmentOutOfRange {
        /// Column of the cell
        column: usize,
        /// Cell within the column
        cell: usize,
        /// The segment index that was requested
        index: usize,
        /// Number of segments on the cell
        length: usize,
    },

    /// The learned structure violates an invariant
    #[error("Synapse consistency check failed at cell ({column}, {cell}), segment {segment}: {reason}")]
    Inconsistent {
        /// Column of the offending cell
        column: usize,
        /// Cell within the column
        cell: usize,
        /// Id of the offending segment
        segment: u32,
        /// What was violated
        reason: String,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error occurred
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SeqMemError {
    /// True for errors raised while validating a configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SeqMemError::InvalidConfig(_) | SeqMemError::Io(_) | SeqMemError::Serialization(_)
        )
    }

    /// True for out-of-bounds column, cell, or segment indices.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            SeqMemError::ColumnOutOfRange { .. }
                | SeqMemError::CellOutOfRange { .. }
                | SeqMemError::SegmentOutOfRange { .. }
        )
    }

    /// True for invariant violations detected by the consistency check.
    pub fn is_consistency_error(&self) -> bool {
        matches!(self, SeqMemError::Inconsistent { .. })
    }
}

/// A specialized `Result` type for sequence memory operations.
pub type Result<T> = std::result::Result<T, SeqMemError>;
