//! Strided Copy Engine - Element Transfer Between Views
//!
//! Copies every logical element of one strided view into another view of the
//! same rank, converting between element types on the way. The two views may
//! have unrelated (non-unit, negative, padded) strides.
//!
//! Traversal is column-major: dimension 1 is the innermost loop and the
//! highest dimension the outermost. Positions are advanced incrementally.
//! After a full run of dimension `d` the position has moved
//! `size_d * stride_d`, so it is rewound by that amount and advanced by
//! `stride_{d+1}`. This visits exactly the flat indices
//! `offset + sum(stride_d * i_d)` without recomputing them per element.
//!
//! @version 0.1.0

use nimarr_core::dtype::Scalar;
use nimarr_core::error::Result;
use nimarr_core::storage::Storage;
use tracing::error;

use crate::shape::{contiguous_strides, numel, validate_footprint};

// =============================================================================
// StridedLayout
// =============================================================================

/// Where a view starts in its buffer and how far each dimension steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StridedLayout<const R: usize> {
    /// Flat index of the first logical element.
    pub offset: usize,
    /// Element step per dimension.
    pub strides: [isize; R],
}

impl<const R: usize> StridedLayout<R> {
    /// Creates a layout from an offset and per-dimension strides.
    #[must_use]
    pub const fn new(offset: usize, strides: [isize; R]) -> Self {
        Self { offset, strides }
    }

    /// Column-major contiguous layout for the given extents, starting at 0.
    #[must_use]
    pub fn contiguous(extents: &[usize; R]) -> Self {
        let mut strides = [0isize; R];
        strides.copy_from_slice(&contiguous_strides(extents));
        Self { offset: 0, strides }
    }

    /// Checks that a view with these extents stays inside a buffer.
    pub fn validate(&self, len: usize, extents: &[usize; R]) -> Result<()> {
        validate_footprint(len, self.offset, extents, &self.strides).map_err(|e| {
            error!(
                offset = self.offset,
                strides = ?self.strides,
                extents = ?extents,
                buffer_len = len,
                "strided view exceeds its buffer"
            );
            e
        })
    }
}

// =============================================================================
// Slice-Level Copies
// =============================================================================

/// Copies `extents` elements from `src` (laid out by `src_layout`) into `dst`
/// (laid out by `dst_layout`), converting each element to `T`.
///
/// Both footprints are validated before anything is written, so a failed
/// copy leaves `dst` untouched.
pub fn copy_strided<const R: usize, T: Scalar, U: Scalar>(
    dst: &mut [T],
    dst_layout: &StridedLayout<R>,
    src: &[U],
    src_layout: &StridedLayout<R>,
    extents: &[usize; R],
) -> Result<()> {
    dst_layout.validate(dst.len(), extents)?;
    src_layout.validate(src.len(), extents)?;
    if R == 0 || extents.contains(&0) {
        return Ok(());
    }

    let mut to = dst_layout.offset as isize;
    let mut from = src_layout.offset as isize;
    let mut counters = [0usize; R];

    loop {
        dst[to as usize] = src[from as usize].cast();
        to += dst_layout.strides[0];
        from += src_layout.strides[0];
        counters[0] += 1;

        let mut d = 0;
        while counters[d] == extents[d] {
            if d + 1 == R {
                return Ok(());
            }
            let size = extents[d] as isize;
            to += dst_layout.strides[d + 1] - size * dst_layout.strides[d];
            from += src_layout.strides[d + 1] - size * src_layout.strides[d];
            counters[d] = 0;
            counters[d + 1] += 1;
            d += 1;
        }
    }
}

/// Reads a strided view into a new contiguous column-major vector.
pub fn gather<const R: usize, T: Scalar, U: Scalar>(
    src: &[U],
    src_layout: &StridedLayout<R>,
    extents: &[usize; R],
) -> Result<Vec<T>> {
    let mut out = vec![T::default(); numel(extents)];
    copy_strided(
        &mut out,
        &StridedLayout::contiguous(extents),
        src,
        src_layout,
        extents,
    )?;
    Ok(out)
}

// =============================================================================
// Storage-Level Copies
// =============================================================================

/// Copies between two views over shared buffers.
///
/// When both views address the same buffer the source view is read into a
/// temporary first, so overlapping views behave as if copied through a
/// separate array.
pub fn copy_storage<const R: usize, T: Scalar, U: Scalar>(
    dst: &Storage<T>,
    dst_layout: &StridedLayout<R>,
    src: &Storage<U>,
    src_layout: &StridedLayout<R>,
    extents: &[usize; R],
) -> Result<()> {
    if dst.same_buffer(src) {
        let snapshot: Vec<U> = gather(&src.as_slice(), src_layout, extents)?;
        return copy_strided(
            &mut dst.as_slice_mut(),
            dst_layout,
            &snapshot,
            &StridedLayout::contiguous(extents),
            extents,
        );
    }

    let source = src.as_slice();
    let mut target = dst.as_slice_mut();
    copy_strided(&mut target, dst_layout, &source, src_layout, extents)
}

// =============================================================================
// Tests
// =============================================================================
