//! Storage - Shared Element Buffers for Arrays and Maps
//!
//! Provides the contiguous memory that underlies every array. A buffer has
//! exactly one [`OwnedStorage`] (held by the owning array) and any number of
//! [`Storage`] handles (held by maps that view it).
//!
//! # Key Features
//! - Reference-counted buffers, so a map can never outlive its memory
//! - Owner/borrower split at the type level: only the owner resizes
//! - Guarded element access through `parking_lot` locks
//! - Buffer identity checks across element types
//!
//! @version 0.1.0

use core::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dtype::Scalar;

// =============================================================================
// Storage Struct
// =============================================================================

/// A shared handle to a contiguous element buffer.
///
/// `Storage` reads and writes elements but cannot change the length of the
/// buffer. Cloning produces another handle to the same memory.
#[derive(Debug)]
pub struct Storage<T: Scalar> {
    inner: Arc<RwLock<Vec<T>>>,
}

impl<T: Scalar> Storage<T> {
    /// Returns the number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opaque identity of the underlying buffer.
    ///
    /// Stable across resizes of the buffer; only meaningful for comparisons.
    #[must_use]
    pub fn as_ptr(&self) -> *const () {
        Arc::as_ptr(&self.inner).cast()
    }

    /// Returns true if both handles refer to the same buffer.
    ///
    /// Works across element types; two buffers of different types are never
    /// the same buffer.
    #[must_use]
    pub fn same_buffer<U: Scalar>(&self, other: &Storage<U>) -> bool {
        self.as_ptr() == other.as_ptr()
    }

    /// Number of live handles (owner included) to this buffer.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns a read guard over the whole buffer.
    #[must_use]
    pub fn as_slice(&self) -> StorageReadGuard<'_, T> {
        StorageReadGuard {
            guard: self.inner.read(),
        }
    }

    /// Returns a write guard over the whole buffer.
    #[must_use]
    pub fn as_slice_mut(&self) -> StorageWriteGuard<'_, T> {
        StorageWriteGuard {
            guard: self.inner.write(),
        }
    }

    /// Returns a guard over a single element, or `None` past the end.
    ///
    /// The whole buffer stays locked until the guard is dropped.
    #[must_use]
    pub fn element_mut(&self, index: usize) -> Option<ElementGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.inner.write(), |data| data.get_mut(index)).ok()
    }

    /// Copies the buffer into fresh, exclusively owned storage.
    #[must_use]
    pub fn deep_copy(&self) -> OwnedStorage<T> {
        OwnedStorage::from_vec(self.as_slice().to_vec())
    }
}

impl<T: Scalar> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// =============================================================================
// OwnedStorage Struct
// =============================================================================

/// The exclusive owner of a buffer.
///
/// Only the owner may change the buffer's length. Maps obtain a [`Storage`]
/// handle through [`OwnedStorage::share`].
#[derive(Debug)]
pub struct OwnedStorage<T: Scalar> {
    storage: Storage<T>,
}

impl<T: Scalar> OwnedStorage<T> {
    /// Creates a zero-filled buffer of `len` elements.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::default(); len])
    }

    /// Takes ownership of an existing vector.
    #[must_use]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            storage: Storage {
                inner: Arc::new(RwLock::new(data)),
            },
        }
    }

    /// Returns a shared handle to this buffer.
    #[must_use]
    pub fn share(&self) -> Storage<T> {
        self.storage.clone()
    }

    /// Resizes the buffer in place.
    ///
    /// With `copy_values` the existing prefix is kept and new elements are
    /// zero. Without it, `fill_zeros` resets every element to zero; if both
    /// are false the contents are unspecified (in practice, whatever prefix
    /// was already there).
    pub fn resize(&self, len: usize, copy_values: bool, fill_zeros: bool) {
        let mut data = self.storage.inner.write();
        if !copy_values && fill_zeros {
            data.clear();
        }
        data.resize(len, T::default());
    }

    /// Replaces the buffer contents with `data`, keeping the buffer identity.
    pub fn replace(&self, data: Vec<T>) {
        *self.storage.inner.write() = data;
    }

    /// Sets every element of the buffer to `value`.
    pub fn fill(&self, value: T) {
        self.storage.inner.write().fill(value);
    }
}

impl<T: Scalar> Deref for OwnedStorage<T> {
    type Target = Storage<T>;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

// =============================================================================
// Guard Types for Safe Access
// =============================================================================

/// Guard over one element of a buffer.
pub type ElementGuard<'a, T> = MappedRwLockWriteGuard<'a, T>;

/// Read guard for storage data.
pub struct StorageReadGuard<'a, T: Scalar> {
    guard: RwLockReadGuard<'a, Vec<T>>,
}

impl<T: Scalar> Deref for StorageReadGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Write guard for storage data.
pub struct StorageWriteGuard<'a, T: Scalar> {
    guard: RwLockWriteGuard<'a, Vec<T>>,
}

impl<T: Scalar> Deref for StorageWriteGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T: Scalar> DerefMut for StorageWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

// =============================================================================
// Tests
// =============================================================================
