//! # nimarr - Multidimensional Arrays with Strided Maps
//!
//! nimarr provides the numeric array layer used by compiled model code:
//! dense column-major arrays of rank 1 to 4, maps that view part of another
//! array's buffer through arbitrary strides, and element-converting copies
//! between any two such views.
//!
//! ## Core Features
//!
//! - **Arrays**: `NimArr<R, T>` over `f64`, `i32` and `bool` elements
//! - **Maps**: windows, transposes and reversals of existing buffers, with
//!   layouts validated against the buffer they view
//! - **Copies**: dimension-1-fastest strided copies with per-element type
//!   conversion; overlapping views are copied through a temporary
//! - **Runtime rank**: `DynArray` plus the three dynamic map-copy entry points
//! - **Lists**: `VecNimArr`, a sequence of independently sized arrays
//! - **Policies**: thread-local, guard-scoped handling of mismatched copies
//!   and resized maps, optionally read from the environment
//!
//! # Quick Start
//!
//! ```rust
//! use nimarr::prelude::*;
//!
//! let mut a = NimArr2::<f64>::with_size([4, 4]);
//! *a.at_mut([0, 0]) = 1.0;
//!
//! // Top-left 2x2 block of `a`.
//! let mut block = NimArr2::map_of(&a, 0, [1, 4], [2, 2]).unwrap();
//! let ints = NimArr2::from_vec(vec![1, 2, 3, 4], [2, 2]).unwrap();
//! block.assign(&ints).unwrap();
//!
//! assert_eq!(a.at([1, 1]), 4.0);
//! ```
//!
//! @version 0.1.0

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

// =============================================================================
// Re-exports
// =============================================================================

pub use nimarr_array as array;
pub use nimarr_core as core;

pub use nimarr_array::{
    dynamic_map_copy, dynamic_map_copy_dim_to_flat, dynamic_map_copy_flat_to_dim, ArrayBase,
    ArrayList, DynArray, DynShape, FlatLayout, MapLayout, NimArr, NimArr1, NimArr2, NimArr3,
    NimArr4, VecNimArr,
};
pub use nimarr_core::{
    ArrayConfig, ConfigGuard, DType, Error, MapResizePolicy, MismatchPolicy, Result, Scalar,
};

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for working with nimarr arrays.
///
/// ```rust
/// use nimarr::prelude::*;
///
/// let list = VecNimArr::<1, i32>::with_len(2);
/// assert_eq!(list.len(), 2);
/// ```
pub mod prelude {
    pub use nimarr_array::prelude::*;
    pub use nimarr_core::prelude::*;
}

// =============================================================================
// Utilities
// =============================================================================

/// Returns the version of the nimarr crates.
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Reads the array policies from the environment and installs them on the
/// current thread, returning the policies that were in effect before.
pub fn apply_env_config() -> Result<ArrayConfig> {
    let config = ArrayConfig::from_env()?;
    Ok(nimarr_core::config::set(config))
}

// =============================================================================
// Tests
// =============================================================================
