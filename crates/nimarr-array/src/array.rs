//! NimArr - Rank-Specialized Arrays
//!
//! `NimArr<R, T>` is an array of compile-time rank `R` (1 to 4) over element
//! type `T`. On top of its rank-erased [`ArrayBase`] it keeps fixed-size
//! copies of the extents and strides, so element addressing is a handful of
//! multiply-adds with no indirection.
//!
//! # Key Features
//! - Owned arrays with column-major contiguous storage
//! - Maps: strided views into another array's buffer
//! - Converting copies between element types through the strided engine
//! - Explicit, configurable behaviour for resizing maps and mismatched copies
//!
//! # Example
//! ```rust
//! use nimarr_array::NimArr;
//!
//! let mut a = NimArr::<2, f64>::with_size([4, 4]);
//! let mut block = NimArr::<2, f64>::map_of(&a, 0, [1, 4], [2, 2]).unwrap();
//! *block.at_mut([1, 1]) = 3.0;
//! assert_eq!(a.at([1, 1]), 3.0);
//!
//! a.resize([2, 2]).unwrap();
//! assert_eq!(a.sizes(), [2, 2]);
//! ```
//!
//! @version 0.1.0

use core::ops::Deref;

use nimarr_core::config::{self, MismatchPolicy};
use nimarr_core::dtype::Scalar;
use nimarr_core::error::{Error, Result};
use nimarr_core::storage::{ElementGuard, Storage};
use tracing::error;

use crate::base::ArrayBase;
use crate::copy::{copy_storage, gather, StridedLayout};
use crate::shape::MAX_RANK;

// =============================================================================
// DynShape Trait
// =============================================================================

/// Shape queries and resizing for arrays whose rank is only known at runtime.
pub trait DynShape {
    /// Number of dimensions.
    fn num_dims(&self) -> usize;

    /// Extent of dimension `dim`, or 0 (with an error logged) if out of range.
    fn dim_size(&self, dim: usize) -> usize;

    /// Resizes to `sizes`, keeping the flat prefix of the current values.
    fn set_size_dyn(&mut self, sizes: &[usize]) -> Result<()>;

    /// All extents, in dimension order.
    fn dims(&self) -> Vec<usize> {
        (0..self.num_dims()).map(|d| self.dim_size(d)).collect()
    }
}

// =============================================================================
// NimArr Struct
// =============================================================================

/// An array of rank `R` over element type `T`.
///
/// Dereferences to its [`ArrayBase`] for rank-erased queries such as
/// `shape()`, `len()`, `is_map()` and `to_vec()`.
///
/// Element guards returned by [`NimArr::at_mut`] lock the whole buffer.
/// Calling any other operation that touches the same buffer (including
/// through a map) while a guard is alive deadlocks.
#[derive(Debug)]
pub struct NimArr<const R: usize, T: Scalar> {
    base: ArrayBase<T>,
    sizes: [usize; R],
    strides: [isize; R],
}

/// Rank-1 array.
pub type NimArr1<T> = NimArr<1, T>;
/// Rank-2 array.
pub type NimArr2<T> = NimArr<2, T>;
/// Rank-3 array.
pub type NimArr3<T> = NimArr<3, T>;
/// Rank-4 array.
pub type NimArr4<T> = NimArr<4, T>;

impl<const R: usize, T: Scalar> NimArr<R, T> {
    const VALID_RANK: () = assert!(R >= 1 && R <= MAX_RANK, "arrays have 1 to 4 dimensions");

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates an empty owned array (every extent 0).
    #[must_use]
    pub fn new() -> Self {
        Self::with_size([0; R])
    }

    /// Creates a zero-filled owned array.
    #[must_use]
    pub fn with_size(sizes: [usize; R]) -> Self {
        Self::wrap(ArrayBase::zeros(&sizes))
    }

    /// Creates an owned array with every element set to `value`.
    #[must_use]
    pub fn filled(sizes: [usize; R], value: T) -> Self {
        let array = Self::with_size(sizes);
        array.base.fill(value);
        array
    }

    /// Creates an owned array from column-major data.
    pub fn from_vec(data: Vec<T>, sizes: [usize; R]) -> Result<Self> {
        ArrayBase::from_vec(data, &sizes).map(Self::wrap)
    }

    /// Wraps an existing buffer as a map without allocating.
    pub fn from_storage(
        storage: Storage<T>,
        offset: usize,
        strides: [isize; R],
        sizes: [usize; R],
    ) -> Result<Self> {
        ArrayBase::map(storage, offset, &strides, &sizes).map(Self::wrap)
    }

    /// Creates a map over `source`'s buffer.
    ///
    /// `offset` and `strides` address the buffer directly, so mapping a map
    /// views the same memory its source views.
    pub fn map_of(
        source: &ArrayBase<T>,
        offset: usize,
        strides: [isize; R],
        sizes: [usize; R],
    ) -> Result<Self> {
        Self::from_storage(source.storage().clone(), offset, strides, sizes)
    }

    /// Gives a rank-erased array back its rank.
    pub fn from_base(base: ArrayBase<T>) -> Result<Self> {
        if base.ndim() != R {
            return Err(Error::rank_mismatch(R, base.ndim()));
        }
        Ok(Self::wrap(base))
    }

    fn wrap(base: ArrayBase<T>) -> Self {
        let () = Self::VALID_RANK;
        let mut array = Self {
            base,
            sizes: [0; R],
            strides: [0; R],
        };
        array.sync();
        array
    }

    /// Copies the base descriptor into the named extents and strides.
    fn sync(&mut self) {
        self.sizes.copy_from_slice(self.base.shape());
        self.strides.copy_from_slice(self.base.strides());
    }

    fn layout(&self) -> StridedLayout<R> {
        StridedLayout::new(self.base.offset(), self.strides)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Number of dimensions, always `R`.
    #[must_use]
    pub fn num_dims(&self) -> usize {
        R
    }

    /// Extents of every dimension.
    #[must_use]
    pub fn sizes(&self) -> [usize; R] {
        self.sizes
    }

    /// Element steps of every dimension.
    #[must_use]
    pub fn steps(&self) -> [isize; R] {
        self.strides
    }

    /// Extent of dimension `dim`.
    ///
    /// An out-of-range dimension is logged and reported as 0.
    #[must_use]
    pub fn dim_size(&self, dim: usize) -> usize {
        match self.try_dim_size(dim) {
            Ok(size) => size,
            Err(e) => {
                error!(dim, ndim = R, "{e}");
                0
            }
        }
    }

    /// Extent of dimension `dim`, or `InvalidDimension`.
    pub fn try_dim_size(&self, dim: usize) -> Result<usize> {
        self.sizes
            .get(dim)
            .copied()
            .ok_or(Error::InvalidDimension { index: dim, ndim: R })
    }

    /// The rank-erased array.
    #[must_use]
    pub fn base(&self) -> &ArrayBase<T> {
        &self.base
    }

    /// Drops the rank, keeping buffer and descriptor.
    #[must_use]
    pub fn into_base(self) -> ArrayBase<T> {
        self.base
    }

    // =========================================================================
    // Element Access
    // =========================================================================

    /// Flat buffer index of an element: `offset + sum(stride_d * i_d)`.
    #[must_use]
    pub fn calculate_index(&self, indices: [usize; R]) -> isize {
        let mut flat = self.base.offset() as isize;
        for (&index, &stride) in indices.iter().zip(&self.strides) {
            flat += index as isize * stride;
        }
        flat
    }

    /// [`NimArr::calculate_index`] for a runtime-length index sequence.
    pub fn calculate_index_dyn(&self, indices: &[usize]) -> Result<isize> {
        Ok(self.calculate_index(fixed(indices)?))
    }

    /// Reads an element without checking indices against the extents.
    ///
    /// # Panics
    /// Panics if the flat index falls outside the buffer.
    #[must_use]
    pub fn at(&self, indices: [usize; R]) -> T {
        self.storage().as_slice()[self.calculate_index(indices) as usize]
    }

    /// Writable access to an element, without checking indices against the
    /// extents.
    ///
    /// # Panics
    /// Panics if the flat index falls outside the buffer.
    ///
    /// # Deadlocks
    /// The guard write-locks the whole buffer until it is dropped. Reading
    /// or writing the same buffer through any array while it is alive, as
    /// in `*m.at_mut(i) = owner.at(j)`, never returns. Compute the value
    /// first or use [`NimArr::set`], which holds the lock only for the
    /// write.
    pub fn at_mut(&mut self, indices: [usize; R]) -> ElementGuard<'_, T> {
        let flat = self.calculate_index(indices);
        let len = self.storage().len();
        usize::try_from(flat)
            .ok()
            .and_then(|index| self.base.storage().element_mut(index))
            .unwrap_or_else(|| {
                panic!("element {indices:?} (flat index {flat}) is outside a buffer of {len}")
            })
    }

    /// Reads an element, checking every index against its extent.
    pub fn get(&self, indices: [usize; R]) -> Result<T> {
        let index = self.checked_index(indices)?;
        let data = self.storage().as_slice();
        data.get(index).copied().ok_or(Error::IndexOutOfBounds {
            index,
            size: data.len(),
        })
    }

    /// Writes an element, checking every index against its extent.
    pub fn set(&mut self, indices: [usize; R], value: T) -> Result<()> {
        let index = self.checked_index(indices)?;
        let mut data = self.storage().as_slice_mut();
        let size = data.len();
        let slot = data
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, size })?;
        *slot = value;
        Ok(())
    }

    fn checked_index(&self, indices: [usize; R]) -> Result<usize> {
        for (&index, &size) in indices.iter().zip(&self.sizes) {
            if index >= size {
                return Err(Error::IndexOutOfBounds { index, size });
            }
        }
        let flat = self.calculate_index(indices);
        usize::try_from(flat).map_err(|_| Error::OutOfStorage {
            min: flat,
            max: flat,
            len: self.storage().len(),
        })
    }

    /// Sets every element this array views to `value`.
    pub fn fill(&mut self, value: T) {
        self.base.fill(value);
    }

    // =========================================================================
    // Resizing
    // =========================================================================

    /// Resizes to `sizes` with contiguous strides.
    ///
    /// Values are kept by flat position, not by multi-index: growing a 2x2
    /// array to 3x3 keeps its four values as the first four column-major
    /// elements. Maps follow the thread's map resize policy.
    pub fn set_size(
        &mut self,
        sizes: [usize; R],
        copy_values: bool,
        fill_zeros: bool,
    ) -> Result<()> {
        self.base.set_shape(&sizes, copy_values, fill_zeros)?;
        self.sync();
        Ok(())
    }

    /// Resizes, keeping values and zero-filling new elements.
    pub fn resize(&mut self, sizes: [usize; R]) -> Result<()> {
        self.set_size(sizes, true, true)
    }

    /// Resizes without keeping values; with `init`, sets every element to
    /// `value`.
    pub fn initialize(&mut self, value: T, init: bool, sizes: [usize; R]) -> Result<()> {
        self.set_size(sizes, false, false)?;
        if init {
            self.base.fill(value);
        }
        Ok(())
    }

    /// Turns this array into a map over `source`'s buffer.
    ///
    /// Any owned buffer is released. On error the array is left unchanged.
    pub fn set_map(
        &mut self,
        source: &ArrayBase<T>,
        offset: usize,
        strides: [isize; R],
        sizes: [usize; R],
    ) -> Result<()> {
        self.base
            .set_map(source.storage().clone(), offset, &strides, &sizes)?;
        self.sync();
        Ok(())
    }

    // =========================================================================
    // Copies
    // =========================================================================

    /// Copies `other` element by element into the elements this array views.
    ///
    /// Extents must agree. Under [`MismatchPolicy::Proceed`] a mismatch is
    /// only logged and the copy runs over this array's extents, provided the
    /// source view still fits its buffer.
    pub fn map_copy<U: Scalar>(&mut self, other: &NimArr<R, U>) -> Result<()> {
        if self.sizes != other.sizes {
            error!(
                expected = ?self.sizes,
                actual = ?other.sizes,
                "map copy between arrays of different extents"
            );
            if config::current().shape_mismatch == MismatchPolicy::Reject {
                return Err(Error::shape_mismatch(&self.sizes, &other.sizes));
            }
        }
        copy_storage(
            self.storage(),
            &self.layout(),
            other.storage(),
            &other.layout(),
            &self.sizes,
        )
    }

    /// Assigns the values of `other`, converting each element.
    ///
    /// A map receives the values in place through [`NimArr::map_copy`]. An
    /// owned array takes `other`'s extents and becomes a contiguous copy.
    pub fn assign<U: Scalar>(&mut self, other: &NimArr<R, U>) -> Result<()> {
        if self.is_map() {
            return self.map_copy(other);
        }
        let values = other.values_as::<T>()?;
        self.base.replace_contents(values, &other.sizes);
        self.sync();
        Ok(())
    }

    /// An owned copy with every element converted to `U`.
    pub fn cast<U: Scalar>(&self) -> Result<NimArr<R, U>> {
        NimArr::from_vec(self.values_as::<U>()?, self.sizes)
    }

    fn values_as<V: Scalar>(&self) -> Result<Vec<V>> {
        let data = self.storage().as_slice();
        if !self.is_map() {
            return Ok(data[..self.len()].iter().map(|v| v.cast()).collect());
        }
        gather(&data, &self.layout(), &self.sizes)
    }
}

/// Converts a runtime index or extent sequence to a fixed-rank array.
pub(crate) fn fixed<const R: usize, X: Copy>(values: &[X]) -> Result<[X; R]> {
    <[X; R]>::try_from(values).map_err(|_| {
        error!(expected = R, actual = values.len(), "sequence length does not match rank");
        Error::rank_mismatch(R, values.len())
    })
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<const R: usize, T: Scalar> Default for NimArr<R, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const R: usize, T: Scalar> Clone for NimArr<R, T> {
    /// Produces an owned, contiguous copy; maps are read through their strides.
    fn clone(&self) -> Self {
        Self::wrap(self.base.clone())
    }
}

impl<const R: usize, T: Scalar> PartialEq for NimArr<R, T> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl<const R: usize, T: Scalar> Deref for NimArr<R, T> {
    type Target = ArrayBase<T>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<const R: usize, T: Scalar> DynShape for NimArr<R, T> {
    fn num_dims(&self) -> usize {
        R
    }

    fn dim_size(&self, dim: usize) -> usize {
        NimArr::dim_size(self, dim)
    }

    fn set_size_dyn(&mut self, sizes: &[usize]) -> Result<()> {
        self.resize(fixed(sizes)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
