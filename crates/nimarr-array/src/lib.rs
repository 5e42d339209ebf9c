//! nimarr Array - Rank-Specialized Strided Arrays
//!
//! This crate provides `NimArr<R, T>`, a dense array of compile-time rank 1
//! to 4 laid out column-major, together with maps (strided views into
//! another array's buffer), the strided copy engine that moves and converts
//! elements between views, and dispatch for arrays whose rank and element
//! type are only known at runtime.
//!
//! # Key Features
//! - Fixed-rank arrays with inline extents and strides
//! - Maps over shared buffers with bounds-validated layouts
//! - Converting copies between arbitrary strided views
//! - Runtime-rank copies through `DynArray`
//! - Lists of independently sized arrays
//!
//! # Example
//! ```rust
//! use nimarr_array::{NimArr, NimArr2};
//!
//! // A 3x3 window inside a 5x3 padded buffer.
//! let padded = NimArr2::<f64>::with_size([5, 3]);
//! let mut window = NimArr::map_of(&padded, 0, [1, 5], [3, 3]).unwrap();
//!
//! let source = NimArr2::from_vec((1..=9).map(f64::from).collect(), [3, 3]).unwrap();
//! window.assign(&source).unwrap();
//!
//! assert_eq!(padded.at([2, 1]), 6.0);
//! assert_eq!(padded.at([3, 1]), 0.0);
//! ```
//!
//! @version 0.1.0

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::fn_params_excessive_bools)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::float_cmp)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::iter_without_into_iter)]
#![allow(clippy::manual_assert)]

// =============================================================================
// Modules
// =============================================================================

pub mod array;
pub mod base;
pub mod copy;
pub mod dynamic;
pub mod shape;
pub mod vec_arr;

// =============================================================================
// Re-exports
// =============================================================================

pub use array::{DynShape, NimArr, NimArr1, NimArr2, NimArr3, NimArr4};
pub use base::{ArrayBase, RawParts};
pub use copy::StridedLayout;
pub use dynamic::{
    dynamic_map_copy, dynamic_map_copy_dim_to_flat, dynamic_map_copy_flat_to_dim, DynArray,
    DynElement, FlatLayout, MapLayout,
};
pub use nimarr_core::{DType, Error, Result, Scalar};
pub use shape::{Shape, Strides, MAX_RANK};
pub use vec_arr::{ArrayList, VecNimArr};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::array::{DynShape, NimArr, NimArr1, NimArr2, NimArr3, NimArr4};
    pub use crate::base::ArrayBase;
    pub use crate::dynamic::{
        dynamic_map_copy, dynamic_map_copy_dim_to_flat, dynamic_map_copy_flat_to_dim, DynArray,
        FlatLayout, MapLayout,
    };
    pub use crate::vec_arr::{ArrayList, VecNimArr};
    pub use nimarr_core::{DType, Error, Result, Scalar};
}
