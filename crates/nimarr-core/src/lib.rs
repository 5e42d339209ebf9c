//! nimarr Core - Foundation Layer for nimarr Arrays
//!
//! This crate provides the pieces every array is built from: the supported
//! element types, the error type, the shared element buffers, and the
//! runtime policies that govern copies and resizes.
//!
//! # Key Features
//! - Element kinds (double, integer, logical) with deterministic conversion
//! - Owner/borrower split of element buffers at the type level
//! - A single error enum for every fallible array operation
//! - Thread-local, guard-scoped runtime policies
//!
//! # Example
//! ```rust
//! use nimarr_core::{OwnedStorage, Scalar};
//!
//! let owned = OwnedStorage::<f64>::zeros(4);
//! let view = owned.share();
//! view.as_slice_mut()[2] = 1.5;
//! assert_eq!(owned.as_slice()[2], 1.5);
//! assert_eq!(1.5_f64.cast::<i32>(), 1);
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
#![allow(clippy::doc_markdown)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Modules
// =============================================================================

pub mod config;
pub mod dtype;
pub mod error;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ArrayConfig, ConfigGuard, MapResizePolicy, MismatchPolicy};
pub use dtype::{DType, Scalar};
pub use error::{Error, Result};
pub use storage::{ElementGuard, OwnedStorage, Storage};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::config::{ArrayConfig, ConfigGuard, MapResizePolicy, MismatchPolicy};
    pub use crate::dtype::{DType, Scalar};
    pub use crate::error::{Error, Result};
    pub use crate::storage::{OwnedStorage, Storage};
}
