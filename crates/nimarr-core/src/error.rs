//! Error Types - nimarr Error Handling
//!
//! Every fallible array operation reports one of these variants. The array
//! crate logs each error through `tracing` at the point of detection, so the
//! diagnostic is visible even when a caller chooses to ignore the `Result`.
//!
//! @version 0.1.0

use thiserror::Error;

use crate::dtype::DType;

// =============================================================================
// Error Types
// =============================================================================

/// The main error type for nimarr operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Operand extents disagree where equality is required.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected extents.
        expected: Vec<usize>,
        /// The actual extents.
        actual: Vec<usize>,
    },

    /// The number of dimensions supplied does not match the array's rank.
    #[error("Rank mismatch: expected {expected} dimensions, got {actual}")]
    RankMismatch {
        /// The rank required by the array.
        expected: usize,
        /// The number of dimensions supplied.
        actual: usize,
    },

    /// Rank outside the supported range 1..=4.
    #[error("Unsupported rank {rank}: only 1 to 4 dimensions are supported")]
    UnsupportedRank {
        /// The requested rank.
        rank: usize,
    },

    /// A runtime-rank map copy was asked to view an array that is itself a map.
    #[error("Dynamic map copy does not support nested maps")]
    NestedMapUnsupported,

    /// Invalid dimension index.
    #[error("Invalid dimension: index {index} for array with {ndim} dimensions")]
    InvalidDimension {
        /// The invalid dimension index.
        index: usize,
        /// Number of dimensions in the array.
        ndim: usize,
    },

    /// Index out of bounds.
    #[error("Index out of bounds: index {index} for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index.
        index: usize,
        /// The size of the dimension or container.
        size: usize,
    },

    /// Element access on an empty container.
    #[error("Cannot access an element of an empty array list")]
    EmptyContainer,

    /// A strided view would address memory outside its buffer.
    #[error("View footprint [{min}, {max}] exceeds buffer of length {len}")]
    OutOfStorage {
        /// Smallest flat index the view touches.
        min: isize,
        /// Largest flat index the view touches.
        max: isize,
        /// Length of the buffer.
        len: usize,
    },

    /// Offset, stride and extent arithmetic of a layout overflows `isize`.
    #[error("Layout overflows isize: offset {offset}, shape {shape:?}, strides {strides:?}")]
    LayoutOverflow {
        /// Offset of the first element.
        offset: usize,
        /// Extents of the view.
        shape: Vec<usize>,
        /// Strides of the view.
        strides: Vec<isize>,
    },

    /// Resizing a map was refused by the active map-resize policy.
    #[error("Cannot resize an array that maps another array's storage")]
    MapResize,

    /// Data type mismatch on a rank-erased array.
    #[error("DType mismatch: expected {expected}, got {actual}")]
    DTypeMismatch {
        /// The expected data type.
        expected: DType,
        /// The actual data type.
        actual: DType,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the bad setting.
        message: String,
    },
}

// =============================================================================
// Result Type
// =============================================================================

/// A specialized Result type for nimarr operations.
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Helper Functions
// =============================================================================

impl Error {
    /// Creates a new shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Creates a new rank mismatch error.
    #[must_use]
    pub fn rank_mismatch(expected: usize, actual: usize) -> Self {
        Self::RankMismatch { expected, actual }
    }

    /// Creates a new layout overflow error.
    #[must_use]
    pub fn layout_overflow(offset: usize, shape: &[usize], strides: &[isize]) -> Self {
        Self::LayoutOverflow {
            offset,
            shape: shape.to_vec(),
            strides: strides.to_vec(),
        }
    }

    /// Creates a new invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
