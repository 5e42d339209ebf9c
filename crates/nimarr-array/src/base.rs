//! Array Base - Rank-Erased Array Descriptor
//!
//! `ArrayBase` is the part of every array that does not depend on its rank:
//! the element buffer, shape, strides, offset and cached length. An array
//! either owns its buffer (contiguous, exactly `len` elements) or is a map
//! viewing a buffer owned by someone else through arbitrary strides.
//!
//! # Key Features
//! - Owned vs borrowed buffers as distinct variants, never a runtime flag
//! - `set_length` honouring the thread's map resize policy
//! - Rank-erased logical reads (`to_vec`) and fills over strided views
//! - Raw descriptor access for host glue via [`RawParts`]
//!
//! @version 0.1.0

use nimarr_core::config::{self, MapResizePolicy};
use nimarr_core::dtype::{DType, Scalar};
use nimarr_core::error::{Error, Result};
use nimarr_core::storage::{OwnedStorage, Storage};
use tracing::{error, warn};

use crate::shape::{
    contiguous_strides, linear_index, numel, unravel_index, validate_footprint, Shape, Strides,
};

// =============================================================================
// Buffer
// =============================================================================

/// The element buffer behind an array.
#[derive(Debug)]
pub(crate) enum Buffer<T: Scalar> {
    /// Storage allocated and exclusively managed by this array.
    Owned(OwnedStorage<T>),
    /// Storage owned by another array, viewed through a map.
    Borrowed(Storage<T>),
}

impl<T: Scalar> Buffer<T> {
    fn storage(&self) -> &Storage<T> {
        match self {
            Self::Owned(owned) => &**owned,
            Self::Borrowed(storage) => storage,
        }
    }
}

// =============================================================================
// RawParts
// =============================================================================

/// Borrowed view of an array's descriptor and buffer handle.
#[derive(Debug, Clone, Copy)]
pub struct RawParts<'a, T: Scalar> {
    /// Handle to the buffer the array reads and writes.
    pub storage: &'a Storage<T>,
    /// Flat index of the first logical element.
    pub offset: usize,
    /// Element step per dimension.
    pub strides: &'a [isize],
    /// Extent per dimension.
    pub shape: &'a [usize],
    /// True if the buffer belongs to another array.
    pub is_map: bool,
}

// =============================================================================
// ArrayBase Struct
// =============================================================================

/// The rank-erased core of an array.
#[derive(Debug)]
pub struct ArrayBase<T: Scalar> {
    buffer: Buffer<T>,
    shape: Shape,
    strides: Strides,
    offset: usize,
    length: usize,
}

impl<T: Scalar> ArrayBase<T> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a zero-filled owned array with contiguous strides.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        let length = numel(shape);
        Self {
            buffer: Buffer::Owned(OwnedStorage::zeros(length)),
            shape: Shape::from_slice(shape),
            strides: contiguous_strides(shape),
            offset: 0,
            length,
        }
    }

    /// Creates an owned array from column-major data.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let length = numel(shape);
        if data.len() != length {
            return Err(Error::shape_mismatch(&[length], &[data.len()]));
        }
        Ok(Self {
            buffer: Buffer::Owned(OwnedStorage::from_vec(data)),
            shape: Shape::from_slice(shape),
            strides: contiguous_strides(shape),
            offset: 0,
            length,
        })
    }

    /// Wraps an existing buffer as a map without allocating.
    ///
    /// Fails if `shape` and `strides` differ in length or the view does not
    /// fit inside the buffer.
    pub fn map(
        storage: Storage<T>,
        offset: usize,
        strides: &[isize],
        shape: &[usize],
    ) -> Result<Self> {
        check_map_layout(&storage, offset, strides, shape)?;
        Ok(Self {
            buffer: Buffer::Borrowed(storage),
            shape: Shape::from_slice(shape),
            strides: Strides::from_slice(strides),
            offset,
            length: numel(shape),
        })
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the extent of every dimension.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the element step of every dimension.
    #[must_use]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Returns the flat index of the first logical element.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of logical elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns true if this array views another array's buffer.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self.buffer, Buffer::Borrowed(_))
    }

    /// Returns the runtime element kind.
    #[must_use]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Returns a handle-level view of the buffer.
    #[must_use]
    pub fn storage(&self) -> &Storage<T> {
        self.buffer.storage()
    }

    /// Returns the buffer handle together with the current descriptor.
    #[must_use]
    pub fn raw_parts(&self) -> RawParts<'_, T> {
        RawParts {
            storage: self.storage(),
            offset: self.offset,
            strides: &self.strides,
            shape: &self.shape,
            is_map: self.is_map(),
        }
    }

    // =========================================================================
    // Storage Management
    // =========================================================================

    /// Reallocates the array to hold `length` elements.
    ///
    /// An owned buffer is resized in place: with `copy_values` the flat
    /// prefix is kept, truncated or padded with zeros. A map is handled by
    /// the thread's [`MapResizePolicy`]: `Detach` replaces the borrowed
    /// handle with a fresh zero-filled buffer and leaves the viewed buffer
    /// untouched, `Forbid` fails without changing anything.
    ///
    /// Only the buffer and cached length change; callers keep the shape and
    /// strides in step.
    pub(crate) fn set_length(
        &mut self,
        length: usize,
        copy_values: bool,
        fill_zeros: bool,
    ) -> Result<()> {
        match &self.buffer {
            Buffer::Owned(owned) => owned.resize(length, copy_values, fill_zeros),
            Buffer::Borrowed(_) => match config::current().map_resize {
                MapResizePolicy::Forbid => {
                    error!(shape = ?self.shape, length, "refusing to resize a map");
                    return Err(Error::MapResize);
                }
                MapResizePolicy::Detach => {
                    warn!(
                        shape = ?self.shape,
                        length,
                        "resizing a map; detaching it into an owned array"
                    );
                    self.buffer = Buffer::Owned(OwnedStorage::zeros(length));
                }
            },
        }
        self.length = length;
        Ok(())
    }

    /// Updates offset, strides and shape together.
    pub(crate) fn set_layout(&mut self, offset: usize, strides: &[isize], shape: &[usize]) {
        self.offset = offset;
        self.strides = Strides::from_slice(strides);
        self.shape = Shape::from_slice(shape);
        self.length = numel(shape);
    }

    /// Resizes to a new shape with contiguous strides.
    pub fn set_shape(
        &mut self,
        shape: &[usize],
        copy_values: bool,
        fill_zeros: bool,
    ) -> Result<()> {
        self.set_length(numel(shape), copy_values, fill_zeros)?;
        self.set_layout(0, &contiguous_strides(shape), shape);
        Ok(())
    }

    /// Turns this array into a map over `storage`.
    ///
    /// Any owned buffer is released. On error the array is left unchanged.
    pub(crate) fn set_map(
        &mut self,
        storage: Storage<T>,
        offset: usize,
        strides: &[isize],
        shape: &[usize],
    ) -> Result<()> {
        check_map_layout(&storage, offset, strides, shape)?;
        self.buffer = Buffer::Borrowed(storage);
        self.set_layout(offset, strides, shape);
        Ok(())
    }

    /// Makes this an owned contiguous array holding `data`.
    ///
    /// An owned buffer keeps its identity; a borrowed one is replaced.
    pub(crate) fn replace_contents(&mut self, data: Vec<T>, shape: &[usize]) {
        debug_assert_eq!(data.len(), numel(shape));
        match &self.buffer {
            Buffer::Owned(owned) => owned.replace(data),
            Buffer::Borrowed(_) => self.buffer = Buffer::Owned(OwnedStorage::from_vec(data)),
        }
        self.set_layout(0, &contiguous_strides(shape), shape);
    }

    // =========================================================================
    // Element Data
    // =========================================================================

    /// Sets every logical element to `value`.
    ///
    /// A map only writes the elements it views.
    pub fn fill(&self, value: T) {
        match &self.buffer {
            Buffer::Owned(owned) => owned.fill(value),
            Buffer::Borrowed(storage) => {
                let mut data = storage.as_slice_mut();
                for i in 0..self.length {
                    let flat = self.flat_index(i);
                    if let Some(slot) = data.get_mut(flat) {
                        *slot = value;
                    }
                }
            }
        }
    }

    /// Returns the logical elements in column-major order.
    pub fn try_to_vec(&self) -> Result<Vec<T>> {
        let data = self.storage().as_slice();
        validate_footprint(data.len(), self.offset, &self.shape, &self.strides).map_err(|e| {
            error!(shape = ?self.shape, buffer_len = data.len(), "map no longer fits its buffer");
            e
        })?;
        if matches!(self.buffer, Buffer::Owned(_)) {
            return Ok(data[..self.length].to_vec());
        }
        Ok((0..self.length).map(|i| data[self.flat_index(i)]).collect())
    }

    /// Returns the logical elements in column-major order.
    ///
    /// # Panics
    /// Panics if the array is a map whose buffer was shrunk below its view.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        match self.try_to_vec() {
            Ok(values) => values,
            Err(e) => panic!("cannot read array: {e}"),
        }
    }

    fn flat_index(&self, linear: usize) -> usize {
        let indices = unravel_index(linear, &self.shape);
        linear_index(self.offset, &indices, &self.strides) as usize
    }
}

fn check_map_layout<T: Scalar>(
    storage: &Storage<T>,
    offset: usize,
    strides: &[isize],
    shape: &[usize],
) -> Result<()> {
    if strides.len() != shape.len() {
        error!(strides = ?strides, shape = ?shape, "map strides and extents differ in rank");
        return Err(Error::rank_mismatch(shape.len(), strides.len()));
    }
    validate_footprint(storage.len(), offset, shape, strides).map_err(|e| {
        error!(
            offset,
            strides = ?strides,
            shape = ?shape,
            buffer_len = storage.len(),
            "map does not fit inside its source buffer"
        );
        e
    })
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T: Scalar> Clone for ArrayBase<T> {
    /// Produces an owned, contiguous copy, whether or not `self` is a map.
    fn clone(&self) -> Self {
        Self {
            buffer: Buffer::Owned(OwnedStorage::from_vec(self.to_vec())),
            shape: self.shape.clone(),
            strides: contiguous_strides(&self.shape),
            offset: 0,
            length: self.length,
        }
    }
}

impl<T: Scalar> PartialEq for ArrayBase<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.shape != other.shape {
            return false;
        }
        match (self.try_to_vec(), other.try_to_vec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nimarr_core::config::{ArrayConfig, ConfigGuard};

    #[test]
    fn test_zeros() {
        let base = ArrayBase::<f64>::zeros(&[2, 3]);
        assert_eq!(base.shape(), &[2, 3]);
        assert_eq!(base.strides(), &[1, 2]);
        assert_eq!(base.len(), 6);
        assert_eq!(base.ndim(), 2);
        assert!(!base.is_map());
        assert_eq!(base.dtype(), DType::F64);
        assert_eq!(base.to_vec(), vec![0.0; 6]);
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = ArrayBase::from_vec(vec![1_i32, 2, 3], &[2, 2]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_map_views_buffer() {
        let owner = ArrayBase::from_vec((0..12).collect::<Vec<i32>>(), &[3, 4]).unwrap();
        let map = ArrayBase::map(owner.storage().clone(), 4, &[1, 3], &[2, 2]).unwrap();

        assert!(map.is_map());
        assert!(map.storage().same_buffer(owner.storage()));
        assert_eq!(map.to_vec(), vec![4, 5, 7, 8]);

        let parts = map.raw_parts();
        assert_eq!(parts.offset, 4);
        assert_eq!(parts.strides, &[1, 3]);
        assert_eq!(parts.shape, &[2, 2]);
        assert!(parts.is_map);
    }

    #[test]
    fn test_map_rejects_bad_layout() {
        let owner = ArrayBase::<f64>::zeros(&[4]);
        let err = ArrayBase::map(owner.storage().clone(), 2, &[1], &[3]).unwrap_err();
        assert!(matches!(err, Error::OutOfStorage { .. }));

        let err = ArrayBase::map(owner.storage().clone(), 0, &[1, 2], &[2]).unwrap_err();
        assert!(matches!(err, Error::RankMismatch { .. }));
    }

    #[test]
    fn test_fill_map_only_touches_view() {
        let owner = ArrayBase::<f64>::zeros(&[6]);
        let map = ArrayBase::map(owner.storage().clone(), 1, &[2], &[3]).unwrap();
        map.fill(1.5);
        assert_eq!(owner.to_vec(), vec![0.0, 1.5, 0.0, 1.5, 0.0, 1.5]);
    }

    #[test]
    fn test_set_shape_keeps_prefix() {
        let mut base = ArrayBase::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let before = base.storage().as_ptr();
        base.set_shape(&[3, 2], true, true).unwrap();

        assert_eq!(base.shape(), &[3, 2]);
        assert_eq!(base.strides(), &[1, 3]);
        assert_eq!(base.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0]);
        assert_eq!(base.storage().as_ptr(), before);
    }

    #[test]
    fn test_resize_map_detaches() {
        let owner = ArrayBase::from_vec(vec![1_i32, 2, 3, 4], &[4]).unwrap();
        let mut map = ArrayBase::map(owner.storage().clone(), 0, &[1], &[2]).unwrap();

        map.set_shape(&[3], true, true).unwrap();
        assert!(!map.is_map());
        assert!(!map.storage().same_buffer(owner.storage()));
        assert_eq!(map.to_vec(), vec![0, 0, 0]);
        assert_eq!(owner.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_resize_map_forbidden() {
        let _guard = ConfigGuard::new(
            ArrayConfig::default().with_map_resize(MapResizePolicy::Forbid),
        );
        let owner = ArrayBase::<bool>::zeros(&[4]);
        let mut map = ArrayBase::map(owner.storage().clone(), 0, &[1], &[2]).unwrap();

        assert_eq!(map.set_shape(&[3], true, true), Err(Error::MapResize));
        assert!(map.is_map());
        assert_eq!(map.shape(), &[2]);
    }

    #[test]
    fn test_clone_is_owned_and_contiguous() {
        let owner = ArrayBase::from_vec((0..6).collect::<Vec<i32>>(), &[6]).unwrap();
        let map = ArrayBase::map(owner.storage().clone(), 5, &[-2], &[3]).unwrap();
        let copy = map.clone();

        assert!(!copy.is_map());
        assert_eq!(copy.strides(), &[1]);
        assert_eq!(copy.to_vec(), vec![5, 3, 1]);
        assert_eq!(copy, map);
    }

    #[test]
    fn test_stale_map_reports_error() {
        let mut owner = ArrayBase::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4]).unwrap();
        let map = ArrayBase::map(owner.storage().clone(), 2, &[1], &[2]).unwrap();

        owner.set_shape(&[2], true, true).unwrap();
        assert!(matches!(map.try_to_vec(), Err(Error::OutOfStorage { .. })));
    }
}
