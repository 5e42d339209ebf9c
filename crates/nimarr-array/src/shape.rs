//! Shape and Strides - Array Dimension Management
//!
//! Provides types and functions for managing array shapes and strides.
//! Arrays are laid out column-major: the first dimension varies fastest, so
//! contiguous strides are `1, size1, size1*size2, ...`.
//!
//! # Key Features
//! - Inline shape/stride storage for up to four dimensions
//! - Column-major stride computation
//! - Footprint computation for arbitrary (negative or non-unit) strides
//! - Derivation of per-dimension strides from a single flat stride
//!
//! @version 0.1.0

use smallvec::SmallVec;

use nimarr_core::error::{Error, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Highest rank an array may have.
pub const MAX_RANK: usize = 4;

/// Shape type - extents of an array.
pub type Shape = SmallVec<[usize; MAX_RANK]>;

/// Strides type - element steps for each dimension.
pub type Strides = SmallVec<[isize; MAX_RANK]>;

// =============================================================================
// Shape Utilities
// =============================================================================

/// Computes the total number of elements from a shape.
#[must_use]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Computes column-major strides for a shape.
///
/// The first stride is always 1; each later stride is the product of the
/// extents before it, saturating at `isize::MAX`. A stride only saturates
/// when the shape is empty or too large to allocate, so no element is ever
/// addressed through it.
#[must_use]
pub fn contiguous_strides(shape: &[usize]) -> Strides {
    let mut strides = Strides::with_capacity(shape.len());
    let mut stride = 1isize;
    for &dim in shape {
        strides.push(stride);
        stride = stride.saturating_mul(extent(dim));
    }
    strides
}

fn extent(dim: usize) -> isize {
    isize::try_from(dim).unwrap_or(isize::MAX)
}

/// Checks if strides describe a contiguous column-major layout.
#[must_use]
pub fn is_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    strides == contiguous_strides(shape).as_slice()
}

/// Computes the flat index of a multi-dimensional index.
///
/// `offset + sum(stride_d * index_d)`, without any bounds checking.
#[must_use]
pub fn linear_index(offset: usize, indices: &[usize], strides: &[isize]) -> isize {
    debug_assert_eq!(indices.len(), strides.len());

    let mut flat = offset as isize;
    for (&idx, &stride) in indices.iter().zip(strides) {
        flat += idx as isize * stride;
    }
    flat
}

/// Converts a column-major linear position to multi-dimensional indices.
#[must_use]
pub fn unravel_index(mut linear: usize, shape: &[usize]) -> Shape {
    let mut indices = Shape::with_capacity(shape.len());
    for &dim in shape {
        if dim == 0 {
            indices.push(0);
            continue;
        }
        indices.push(linear % dim);
        linear /= dim;
    }
    indices
}

// =============================================================================
// Footprints
// =============================================================================

/// Smallest and largest flat index a strided view touches.
///
/// Returns `Ok(None)` for views with no elements, and
/// [`Error::LayoutOverflow`] when an index would not fit in `isize`.
pub fn footprint(
    offset: usize,
    shape: &[usize],
    strides: &[isize],
) -> Result<Option<(isize, isize)>> {
    if shape.contains(&0) {
        return Ok(None);
    }

    let overflow = || Error::layout_overflow(offset, shape, strides);
    let start = isize::try_from(offset).map_err(|_| overflow())?;
    let (mut min, mut max) = (start, start);
    for (&dim, &stride) in shape.iter().zip(strides) {
        let reach = isize::try_from(dim - 1)
            .ok()
            .and_then(|steps| stride.checked_mul(steps))
            .ok_or_else(overflow)?;
        if reach >= 0 {
            max = max.checked_add(reach).ok_or_else(overflow)?;
        } else {
            min = min.checked_add(reach).ok_or_else(overflow)?;
        }
    }
    Ok(Some((min, max)))
}

/// Checks that every element of a strided view lies inside a buffer.
pub fn validate_footprint(
    len: usize,
    offset: usize,
    shape: &[usize],
    strides: &[isize],
) -> Result<()> {
    match footprint(offset, shape, strides)? {
        None => Ok(()),
        Some((min, max)) if min >= 0 && (max as usize) < len => Ok(()),
        Some((min, max)) => Err(Error::OutOfStorage { min, max, len }),
    }
}

/// Derives per-dimension strides for a flat run of elements.
///
/// The first dimension steps by `stride`; every later dimension steps over
/// all elements of the dimensions before it. Steps saturate at the `isize`
/// limits, and [`validate_footprint`] rejects any non-empty view that would
/// use a saturated step.
#[must_use]
pub fn flat_strides(stride: isize, extents: &[usize]) -> Strides {
    let mut strides = Strides::with_capacity(extents.len());
    let mut step = stride;
    for &dim in extents {
        strides.push(step);
        step = step.saturating_mul(extent(dim));
    }
    strides
}

/// Checks that a rank lies in `1..=MAX_RANK`.
pub fn check_rank(rank: usize) -> Result<()> {
    if rank == 0 || rank > MAX_RANK {
        return Err(Error::UnsupportedRank { rank });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
