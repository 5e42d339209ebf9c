//! VecNimArr - Lists of Same-Rank Arrays
//!
//! An ordered, growable sequence of [`NimArr`] values that share a rank and
//! element type. Each element is resized independently.
//!
//! Out-of-range access through [`VecNimArr::element`] and indexing logs an
//! error and falls back to the first element. The fallback only keeps a
//! caller running; it never makes an out-of-range index correct. Use
//! [`VecNimArr::get`] for strict access.
//!
//! @version 0.1.0

use core::ops::{Index, IndexMut};

use nimarr_core::dtype::Scalar;
use nimarr_core::error::{Error, Result};
use tracing::error;

use crate::array::{fixed, DynShape, NimArr};
use crate::base::ArrayBase;

// =============================================================================
// ArrayList Trait
// =============================================================================

/// Rank-erased operations on a list of arrays.
pub trait ArrayList {
    /// Number of arrays in the list.
    fn len(&self) -> usize;

    /// True if the list holds no arrays.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows (with empty arrays) or truncates the list.
    fn resize(&mut self, len: usize);

    /// Resizes the array at `row`; `dims` must have one extent per dimension.
    fn set_row_dims(&mut self, row: usize, dims: &[usize]) -> Result<()>;

    /// Extents of the array at `row`, or an empty vector if there is none.
    fn row_dims(&self, row: usize) -> Vec<usize>;
}

// =============================================================================
// VecNimArr Struct
// =============================================================================

/// A list of arrays of rank `R` over `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct VecNimArr<const R: usize, T: Scalar> {
    values: Vec<NimArr<R, T>>,
}

impl<const R: usize, T: Scalar> VecNimArr<R, T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Creates a list of `len` empty arrays.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let mut list = Self::new();
        list.resize(len);
        list
    }

    /// Number of arrays in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the list holds no arrays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Grows (with empty arrays) or truncates the list.
    pub fn resize(&mut self, len: usize) {
        self.values.resize_with(len, NimArr::new);
    }

    /// Appends an array.
    pub fn push(&mut self, array: NimArr<R, T>) {
        self.values.push(array);
    }

    /// The array at `index`, if there is one.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NimArr<R, T>> {
        self.values.get(index)
    }

    /// The array at `index`, if there is one.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut NimArr<R, T>> {
        self.values.get_mut(index)
    }

    /// The array at `index`, falling back to the first array when `index`
    /// is out of range.
    pub fn element(&self, index: usize) -> Result<&NimArr<R, T>> {
        let index = self.resolve(index)?;
        Ok(&self.values[index])
    }

    /// Mutable form of [`VecNimArr::element`].
    pub fn element_mut(&mut self, index: usize) -> Result<&mut NimArr<R, T>> {
        let index = self.resolve(index)?;
        Ok(&mut self.values[index])
    }

    fn resolve(&self, index: usize) -> Result<usize> {
        if index < self.values.len() {
            return Ok(index);
        }
        if self.values.is_empty() {
            error!(index, "element requested from an empty array list");
            return Err(Error::EmptyContainer);
        }
        error!(
            index,
            len = self.values.len(),
            "array list index out of range; returning the first element"
        );
        Ok(0)
    }

    /// The rank-erased array at `index`.
    #[must_use]
    pub fn base(&self, index: usize) -> Option<&ArrayBase<T>> {
        self.values.get(index).map(NimArr::base)
    }

    /// Iterates over the arrays in order.
    pub fn iter(&self) -> core::slice::Iter<'_, NimArr<R, T>> {
        self.values.iter()
    }

    /// Resizes the array at `row`, keeping its flat prefix.
    pub fn set_row_size(&mut self, row: usize, sizes: [usize; R]) -> Result<()> {
        let len = self.values.len();
        let array = self.values.get_mut(row).ok_or_else(|| {
            error!(row, len, "row out of range in array list resize");
            Error::IndexOutOfBounds { index: row, size: len }
        })?;
        array.resize(sizes)
    }
}

impl<const R: usize, T: Scalar> Default for VecNimArr<R, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const R: usize, T: Scalar> Index<usize> for VecNimArr<R, T> {
    type Output = NimArr<R, T>;

    /// # Panics
    /// Panics if the list is empty.
    fn index(&self, index: usize) -> &Self::Output {
        match self.element(index) {
            Ok(array) => array,
            Err(e) => panic!("cannot index array list: {e}"),
        }
    }
}

impl<const R: usize, T: Scalar> IndexMut<usize> for VecNimArr<R, T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match self.element_mut(index) {
            Ok(array) => array,
            Err(e) => panic!("cannot index array list: {e}"),
        }
    }
}

impl<const R: usize, T: Scalar> FromIterator<NimArr<R, T>> for VecNimArr<R, T> {
    fn from_iter<I: IntoIterator<Item = NimArr<R, T>>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a, const R: usize, T: Scalar> IntoIterator for &'a VecNimArr<R, T> {
    type Item = &'a NimArr<R, T>;
    type IntoIter = core::slice::Iter<'a, NimArr<R, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<const R: usize, T: Scalar> ArrayList for VecNimArr<R, T> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn resize(&mut self, len: usize) {
        VecNimArr::resize(self, len);
    }

    fn set_row_dims(&mut self, row: usize, dims: &[usize]) -> Result<()> {
        if dims.len() != R {
            error!(
                expected = R,
                actual = dims.len(),
                "wrong number of dimensions in array list resize"
            );
            return Err(Error::rank_mismatch(R, dims.len()));
        }
        self.set_row_size(row, fixed(dims)?)
    }

    fn row_dims(&self, row: usize) -> Vec<usize> {
        self.values.get(row).map(DynShape::dims).unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================
