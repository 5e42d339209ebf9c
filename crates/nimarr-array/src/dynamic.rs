//! Dynamic Map Dispatch - Copies Between Arrays of Runtime Rank and Type
//!
//! When rank and element type are only known at runtime (for example when
//! arrays arrive through a foreign interface) they travel as [`DynArray`],
//! a closed variant over the supported element kinds. The three entry points
//! build temporary rank-specialized maps over both operands, chosen by a
//! match on the runtime rank, and run the strided copy between them.
//!
//! @version 0.1.0

use nimarr_core::dtype::{DType, Scalar};
use nimarr_core::error::{Error, Result};
use tracing::error;

use crate::array::{fixed, NimArr};
use crate::base::ArrayBase;
use crate::shape::{check_rank, flat_strides, Shape, Strides};

// =============================================================================
// Layouts
// =============================================================================

/// Explicit offset, strides and extents of one side of a dimensioned copy.
///
/// The rank is the number of extents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLayout {
    /// Flat index of the first element.
    pub offset: usize,
    /// Element step per dimension.
    pub strides: Strides,
    /// Extent per dimension.
    pub sizes: Shape,
}

impl MapLayout {
    /// Creates a layout from runtime sequences.
    #[must_use]
    pub fn new(offset: usize, strides: &[isize], sizes: &[usize]) -> Self {
        Self {
            offset,
            strides: Strides::from_slice(strides),
            sizes: Shape::from_slice(sizes),
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }
}

/// Offset and single stride of a flat (rank-1) side of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatLayout {
    /// Flat index of the first element.
    pub offset: usize,
    /// Step between consecutive elements.
    pub stride: isize,
}

impl FlatLayout {
    /// Creates a flat layout.
    #[must_use]
    pub const fn new(offset: usize, stride: isize) -> Self {
        Self { offset, stride }
    }

    /// Dimensioned layout covering `sizes`, with the stride scaled by the
    /// extents of the earlier dimensions.
    fn expand(self, sizes: &[usize]) -> MapLayout {
        MapLayout {
            offset: self.offset,
            strides: flat_strides(self.stride, sizes),
            sizes: Shape::from_slice(sizes),
        }
    }
}

// =============================================================================
// DynElement Trait
// =============================================================================

/// Element types that have a [`DynArray`] variant.
pub trait DynElement: Scalar {
    /// Wraps a base array in its variant.
    fn into_dyn(base: ArrayBase<Self>) -> DynArray;

    /// Unwraps the base array, or hands `array` back if it holds another type.
    fn try_from_dyn(array: DynArray) -> core::result::Result<ArrayBase<Self>, DynArray>;

    /// Borrows the base array if `array` holds this element type.
    fn from_dyn(array: &DynArray) -> Option<&ArrayBase<Self>>;

    /// Mutably borrows the base array if `array` holds this element type.
    fn from_dyn_mut(array: &mut DynArray) -> Option<&mut ArrayBase<Self>>;
}

macro_rules! impl_dyn_element {
    ($ty:ty, $variant:ident) => {
        impl DynElement for $ty {
            fn into_dyn(base: ArrayBase<Self>) -> DynArray {
                DynArray::$variant(base)
            }

            fn try_from_dyn(array: DynArray) -> core::result::Result<ArrayBase<Self>, DynArray> {
                match array {
                    DynArray::$variant(base) => Ok(base),
                    other => Err(other),
                }
            }

            fn from_dyn(array: &DynArray) -> Option<&ArrayBase<Self>> {
                match array {
                    DynArray::$variant(base) => Some(base),
                    _ => None,
                }
            }

            fn from_dyn_mut(array: &mut DynArray) -> Option<&mut ArrayBase<Self>> {
                match array {
                    DynArray::$variant(base) => Some(base),
                    _ => None,
                }
            }
        }
    };
}

impl_dyn_element!(f64, F64);
impl_dyn_element!(i32, I32);
impl_dyn_element!(bool, Bool);

// =============================================================================
// DynArray
// =============================================================================

/// An array whose rank and element type are known only at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum DynArray {
    /// Double-precision elements.
    F64(ArrayBase<f64>),
    /// Integer elements.
    I32(ArrayBase<i32>),
    /// Logical elements.
    Bool(ArrayBase<bool>),
}

macro_rules! with_base {
    ($array:expr, |$base:ident| $body:expr) => {
        match $array {
            DynArray::F64($base) => $body,
            DynArray::I32($base) => $body,
            DynArray::Bool($base) => $body,
        }
    };
}

impl DynArray {
    /// Creates a zero-filled owned array.
    pub fn zeros(dtype: DType, shape: &[usize]) -> Result<Self> {
        check_rank(shape.len())?;
        Ok(match dtype {
            DType::F64 => Self::F64(ArrayBase::zeros(shape)),
            DType::I32 => Self::I32(ArrayBase::zeros(shape)),
            DType::Bool => Self::Bool(ArrayBase::zeros(shape)),
        })
    }

    /// Runtime element kind.
    #[must_use]
    pub fn dtype(&self) -> DType {
        with_base!(self, |base| base.dtype())
    }

    /// Extent of every dimension.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        with_base!(self, |base| base.shape())
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        with_base!(self, |base| base.ndim())
    }

    /// Number of logical elements.
    #[must_use]
    pub fn len(&self) -> usize {
        with_base!(self, |base| base.len())
    }

    /// True if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the array views another array's buffer.
    #[must_use]
    pub fn is_map(&self) -> bool {
        with_base!(self, |base| base.is_map())
    }

    /// Logical elements in column-major order, converted to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_base!(self, |base| base
            .to_vec()
            .into_iter()
            .map(Scalar::to_f64)
            .collect())
    }

    /// Borrows the typed base array, or `DTypeMismatch`.
    pub fn downcast_ref<T: DynElement>(&self) -> Result<&ArrayBase<T>> {
        T::from_dyn(self).ok_or(Error::DTypeMismatch {
            expected: T::DTYPE,
            actual: self.dtype(),
        })
    }

    /// Mutably borrows the typed base array, or `DTypeMismatch`.
    pub fn downcast_mut<T: DynElement>(&mut self) -> Result<&mut ArrayBase<T>> {
        let actual = self.dtype();
        T::from_dyn_mut(self).ok_or(Error::DTypeMismatch {
            expected: T::DTYPE,
            actual,
        })
    }

    /// Borrows the `f64` base array.
    pub fn as_f64(&self) -> Result<&ArrayBase<f64>> {
        self.downcast_ref()
    }

    /// Borrows the `i32` base array.
    pub fn as_i32(&self) -> Result<&ArrayBase<i32>> {
        self.downcast_ref()
    }

    /// Borrows the `bool` base array.
    pub fn as_bool(&self) -> Result<&ArrayBase<bool>> {
        self.downcast_ref()
    }

    /// Mutably borrows the `f64` base array.
    pub fn as_f64_mut(&mut self) -> Result<&mut ArrayBase<f64>> {
        self.downcast_mut()
    }

    /// Mutably borrows the `i32` base array.
    pub fn as_i32_mut(&mut self) -> Result<&mut ArrayBase<i32>> {
        self.downcast_mut()
    }

    /// Mutably borrows the `bool` base array.
    pub fn as_bool_mut(&mut self) -> Result<&mut ArrayBase<bool>> {
        self.downcast_mut()
    }

    /// Recovers a rank-specialized array.
    pub fn into_typed<const R: usize, T: DynElement>(self) -> Result<NimArr<R, T>> {
        let actual = self.dtype();
        let base = T::try_from_dyn(self).map_err(|_| Error::DTypeMismatch {
            expected: T::DTYPE,
            actual,
        })?;
        NimArr::from_base(base)
    }
}

impl<T: DynElement> From<ArrayBase<T>> for DynArray {
    fn from(base: ArrayBase<T>) -> Self {
        T::into_dyn(base)
    }
}

impl<const R: usize, T: DynElement> From<NimArr<R, T>> for DynArray {
    fn from(array: NimArr<R, T>) -> Self {
        T::into_dyn(array.into_base())
    }
}

// =============================================================================
// Dispatch Entry Points
// =============================================================================

/// Copies between two arrays through explicit dimensioned layouts.
///
/// The rank is the length of `to_layout.sizes` and must be 1 to 4; both
/// layouts must have that many strides and extents. Neither operand may
/// itself be a map. Extent disagreement follows the thread's
/// [`MismatchPolicy`](nimarr_core::config::MismatchPolicy).
pub fn dynamic_map_copy(
    to: &mut DynArray,
    to_layout: &MapLayout,
    from: &DynArray,
    from_layout: &MapLayout,
) -> Result<()> {
    reject_maps(to, from)?;
    dispatch(to, to_layout, from, from_layout)
}

/// Copies from a flat rank-1 array into a dimensioned layout.
///
/// The source's single stride steps dimension 1; each later dimension steps
/// over all elements of the earlier ones.
pub fn dynamic_map_copy_flat_to_dim(
    to: &mut DynArray,
    to_layout: &MapLayout,
    from: &DynArray,
    from_layout: FlatLayout,
) -> Result<()> {
    require_flat(from)?;
    reject_maps(to, from)?;
    dispatch(to, to_layout, from, &from_layout.expand(&to_layout.sizes))
}

/// Copies from a dimensioned layout into a flat rank-1 array.
pub fn dynamic_map_copy_dim_to_flat(
    to: &mut DynArray,
    to_layout: FlatLayout,
    from: &DynArray,
    from_layout: &MapLayout,
) -> Result<()> {
    require_flat(to)?;
    reject_maps(to, from)?;
    dispatch(to, &to_layout.expand(&from_layout.sizes), from, from_layout)
}

fn reject_maps(to: &DynArray, from: &DynArray) -> Result<()> {
    if to.is_map() || from.is_map() {
        error!(
            to_is_map = to.is_map(),
            from_is_map = from.is_map(),
            "dynamic map copy does not accept arrays that are already maps"
        );
        return Err(Error::NestedMapUnsupported);
    }
    Ok(())
}

fn require_flat(array: &DynArray) -> Result<()> {
    if array.ndim() != 1 {
        error!(ndim = array.ndim(), "flat side of a map copy must have one dimension");
        return Err(Error::rank_mismatch(1, array.ndim()));
    }
    Ok(())
}

fn dispatch(
    to: &DynArray,
    to_layout: &MapLayout,
    from: &DynArray,
    from_layout: &MapLayout,
) -> Result<()> {
    let rank = to_layout.rank();
    if let Err(e) = check_rank(rank) {
        error!(rank, "dynamic map copy supports 1 to 4 dimensions");
        return Err(e);
    }
    for layout in [to_layout, from_layout] {
        if layout.strides.len() != rank || layout.sizes.len() != rank {
            error!(
                rank,
                strides = ?layout.strides,
                sizes = ?layout.sizes,
                "layout sequences disagree with the copy rank"
            );
            let actual = if layout.sizes.len() == rank {
                layout.strides.len()
            } else {
                layout.sizes.len()
            };
            return Err(Error::rank_mismatch(rank, actual));
        }
    }

    with_base!(to, |target| with_base!(from, |source| {
        copy_with_rank(target, to_layout, source, from_layout)
    }))
}

fn copy_with_rank<T: Scalar, U: Scalar>(
    to: &ArrayBase<T>,
    to_layout: &MapLayout,
    from: &ArrayBase<U>,
    from_layout: &MapLayout,
) -> Result<()> {
    match to_layout.rank() {
        1 => copy_ranked::<1, T, U>(to, to_layout, from, from_layout),
        2 => copy_ranked::<2, T, U>(to, to_layout, from, from_layout),
        3 => copy_ranked::<3, T, U>(to, to_layout, from, from_layout),
        4 => copy_ranked::<4, T, U>(to, to_layout, from, from_layout),
        rank => Err(Error::UnsupportedRank { rank }),
    }
}

fn copy_ranked<const R: usize, T: Scalar, U: Scalar>(
    to: &ArrayBase<T>,
    to_layout: &MapLayout,
    from: &ArrayBase<U>,
    from_layout: &MapLayout,
) -> Result<()> {
    let mut target = NimArr::<R, T>::map_of(
        to,
        to_layout.offset,
        fixed(to_layout.strides.as_slice())?,
        fixed(to_layout.sizes.as_slice())?,
    )?;
    let source = NimArr::<R, U>::map_of(
        from,
        from_layout.offset,
        fixed(from_layout.strides.as_slice())?,
        fixed(from_layout.sizes.as_slice())?,
    )?;
    target.map_copy(&source)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::NimArr1;

    fn typed_copy<const R: usize>(
        dst: &NimArr1<f64>,
        src: &NimArr1<i32>,
        to: &MapLayout,
        from: &MapLayout,
    ) -> Vec<f64> {
        let owner = dst.clone();
        let mut target = NimArr::<R, f64>::map_of(
            &owner,
            to.offset,
            fixed(to.strides.as_slice()).unwrap(),
            fixed(to.sizes.as_slice()).unwrap(),
        )
        .unwrap();
        let source = NimArr::<R, i32>::map_of(
            src,
            from.offset,
            fixed(from.strides.as_slice()).unwrap(),
            fixed(from.sizes.as_slice()).unwrap(),
        )
        .unwrap();
        target.map_copy(&source).unwrap();
        owner.to_vec()
    }

    fn dynamic_copy(
        dst: &NimArr1<f64>,
        src: &NimArr1<i32>,
        to: &MapLayout,
        from: &MapLayout,
    ) -> Vec<f64> {
        let mut target = DynArray::from(dst.clone());
        let source = DynArray::from(src.clone());
        dynamic_map_copy(&mut target, to, &source, from).unwrap();
        target.to_f64_vec()
    }

    #[test]
    fn test_dynamic_matches_typed_for_every_rank() {
        let dst = NimArr1::<f64>::filled([64], -1.0);
        let src = NimArr1::from_vec((0..64).collect(), [64]).unwrap();
        let cases = [
            (MapLayout::new(3, &[2], &[5]), MapLayout::new(10, &[-1], &[5])),
            (
                MapLayout::new(0, &[1, 5], &[3, 3]),
                MapLayout::new(0, &[3, 1], &[3, 3]),
            ),
            (
                MapLayout::new(1, &[1, 2, 6], &[2, 3, 2]),
                MapLayout::new(0, &[1, 2, 6], &[2, 3, 2]),
            ),
            (
                MapLayout::new(0, &[1, 2, 4, 8], &[2, 2, 2, 2]),
                MapLayout::new(63, &[-1, -2, -4, -16], &[2, 2, 2, 2]),
            ),
        ];

        for (to, from) in &cases {
            let typed = match to.rank() {
                1 => typed_copy::<1>(&dst, &src, to, from),
                2 => typed_copy::<2>(&dst, &src, to, from),
                3 => typed_copy::<3>(&dst, &src, to, from),
                _ => typed_copy::<4>(&dst, &src, to, from),
            };
            assert_ne!(typed, dst.to_vec());
            assert_eq!(dynamic_copy(&dst, &src, to, from), typed);
        }
    }

    #[test]
    fn test_flat_to_dim() {
        let mut to = DynArray::zeros(DType::F64, &[3, 3]).unwrap();
        let from = DynArray::from(NimArr1::from_vec((1..=8).collect::<Vec<i32>>(), [8]).unwrap());

        dynamic_map_copy_flat_to_dim(
            &mut to,
            &MapLayout::new(0, &[1, 3], &[2, 2]),
            &from,
            FlatLayout::new(1, 2),
        )
        .unwrap();

        assert_eq!(
            to.to_f64_vec(),
            vec![2.0, 4.0, 0.0, 6.0, 8.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_flat_source_must_be_rank_one() {
        let mut to = DynArray::zeros(DType::F64, &[4]).unwrap();
        let from = DynArray::zeros(DType::I32, &[2, 2]).unwrap();
        let err = dynamic_map_copy_flat_to_dim(
            &mut to,
            &MapLayout::new(0, &[1], &[4]),
            &from,
            FlatLayout::new(0, 1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::RankMismatch {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(to.to_f64_vec(), vec![0.0; 4]);

        // The flat side of a dimensioned-to-flat copy is the destination.
        let mut to = DynArray::from(ArrayBase::from_vec(vec![1.0; 4], &[2, 2]).unwrap());
        let from = DynArray::zeros(DType::I32, &[4]).unwrap();
        let err = dynamic_map_copy_dim_to_flat(
            &mut to,
            FlatLayout::new(0, 1),
            &from,
            &MapLayout::new(0, &[1], &[4]),
        )
        .unwrap_err();
        assert_eq!(err, Error::rank_mismatch(1, 2));
        assert_eq!(to.to_f64_vec(), vec![1.0; 4]);
    }

    #[test]
    fn test_dim_to_flat_reversed() {
        let mut to = DynArray::zeros(DType::F64, &[6]).unwrap();
        let from = DynArray::from(
            ArrayBase::from_vec(vec![true, false, true, true, false, false], &[2, 3]).unwrap(),
        );

        dynamic_map_copy_dim_to_flat(
            &mut to,
            FlatLayout::new(5, -1),
            &from,
            &MapLayout::new(0, &[1, 2], &[2, 3]),
        )
        .unwrap();

        assert_eq!(to.to_f64_vec(), vec![0.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_nested_maps_rejected() {
        let owner = NimArr1::<f64>::with_size([4]);
        let map = NimArr1::map_of(&owner, 0, [2], [2]).unwrap();
        let from = DynArray::from(map);
        let mut to = DynArray::zeros(DType::F64, &[4]).unwrap();

        let layout = MapLayout::new(0, &[1], &[2]);
        assert_eq!(
            dynamic_map_copy(&mut to, &layout, &from, &layout),
            Err(Error::NestedMapUnsupported)
        );
        assert_eq!(
            dynamic_map_copy_dim_to_flat(&mut to, FlatLayout::new(0, 1), &from, &layout),
            Err(Error::NestedMapUnsupported)
        );
        assert_eq!(
            dynamic_map_copy_flat_to_dim(&mut to, &layout, &from, FlatLayout::new(0, 1)),
            Err(Error::NestedMapUnsupported)
        );
        assert_eq!(to.to_f64_vec(), vec![0.0; 4]);
    }

    #[test]
    fn test_rank_limits() {
        let mut to = DynArray::zeros(DType::F64, &[32]).unwrap();
        let from = DynArray::zeros(DType::I32, &[32]).unwrap();

        let five = MapLayout::new(0, &[1, 2, 4, 8, 16], &[2, 2, 2, 2, 2]);
        assert_eq!(
            dynamic_map_copy(&mut to, &five, &from, &five),
            Err(Error::UnsupportedRank { rank: 5 })
        );

        let ragged = MapLayout::new(0, &[1], &[2, 2]);
        let square = MapLayout::new(0, &[1, 2], &[2, 2]);
        assert!(matches!(
            dynamic_map_copy(&mut to, &square, &from, &ragged),
            Err(Error::RankMismatch { .. })
        ));
    }

    #[test]
    fn test_downcasts() {
        let mut array = DynArray::zeros(DType::F64, &[2, 2]).unwrap();
        assert_eq!(array.dtype(), DType::F64);
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array.ndim(), 2);
        assert!(array.as_f64().is_ok());
        assert_eq!(
            array.as_i32().unwrap_err(),
            Error::DTypeMismatch {
                expected: DType::I32,
                actual: DType::F64
            }
        );

        array.as_f64_mut().unwrap().fill(1.5);
        let typed = array.into_typed::<2, f64>().unwrap();
        assert_eq!(typed.to_vec(), vec![1.5; 4]);
    }

    #[test]
    fn test_zeros_checks_rank() {
        assert_eq!(
            DynArray::zeros(DType::Bool, &[]),
            Err(Error::UnsupportedRank { rank: 0 })
        );
        assert!(DynArray::zeros(DType::Bool, &[1, 1, 1, 1, 1]).is_err());
    }
}
