//! Data Types - Element Kinds for nimarr Arrays
//!
//! Defines the element types an array may hold and the conversion rules used
//! when copying between arrays of different element types. Supports double
//! (`f64`), integer (`i32`) and logical (`bool`) elements.
//!
//! # Key Features
//! - Runtime element tag via the `DType` enum (used by rank-erased dispatch)
//! - `Scalar` trait tying each Rust type to its `DType`
//! - Deterministic cross-type conversion through `f64`
//!
//! Conversion rules:
//! - floating to integer truncates toward zero and saturates at the integer
//!   range; NaN becomes 0
//! - anything to `bool` is `value != 0` (NaN is `true`)
//! - `bool` to a number is 1 or 0
//!
//! @version 0.1.0

use core::fmt::Debug;

use num_traits::AsPrimitive;

// =============================================================================
// DType Enum
// =============================================================================

/// Runtime representation of array element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 64-bit floating point (double precision).
    F64,
    /// 32-bit signed integer.
    I32,
    /// Boolean (logical) type.
    Bool,
}

impl DType {
    /// Returns the size in bytes of this data type.
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::I32 => 4,
            Self::Bool => 1,
        }
    }

    /// Returns true if this is a floating point type.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64)
    }

    /// Returns true if this is an integer type.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I32)
    }

    /// Returns the name of this data type as a string.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "double",
            Self::I32 => "integer",
            Self::Bool => "logical",
        }
    }
}

impl Default for DType {
    fn default() -> Self {
        Self::F64
    }
}

impl core::fmt::Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Scalar Trait
// =============================================================================

/// Trait for all element types that can be stored in an array.
///
/// Every element type converts to and from `f64`; cross-type copies go
/// through [`Scalar::cast`], which is exact for every supported pair except
/// fractional or out-of-range doubles narrowed to integers.
pub trait Scalar: Copy + Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    /// The runtime dtype for this scalar type.
    const DTYPE: DType;

    /// Returns the dtype for this type.
    #[must_use]
    fn dtype() -> DType {
        Self::DTYPE
    }

    /// Widens this value to `f64`.
    fn to_f64(self) -> f64;

    /// Narrows an `f64` to this type.
    fn from_f64(value: f64) -> Self;

    /// Converts this value into another element type.
    #[inline]
    #[must_use]
    fn cast<U: Scalar>(self) -> U {
        U::from_f64(self.to_f64())
    }
}

// =============================================================================
// Scalar Implementations
// =============================================================================

macro_rules! impl_scalar_numeric {
    ($ty:ty, $dtype:expr) => {
        impl Scalar for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn to_f64(self) -> f64 {
                self.as_()
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value.as_()
            }
        }
    };
}

impl_scalar_numeric!(f64, DType::F64);
impl_scalar_numeric!(i32, DType::I32);

impl Scalar for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }
}

// =============================================================================
// Tests
// =============================================================================
