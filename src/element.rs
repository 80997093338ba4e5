//! Scalar traits for tensor elements and encoded indices, plus the dtype
//! dispatch macros that map a runtime [`DataType`] / [`IndexWidth`] tag onto
//! a monomorphized generic implementation.

use half::{bf16, f16};

use crate::types::{DataType, IndexWidth};

/// A tensor element: a plain-old-data scalar with a [`DataType`] tag.
///
/// Tensor buffers hold elements in host byte order; the wire format is
/// little-endian, hence the two read/write pairs.
pub trait Element: bytemuck::Pod + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    const DTYPE: DataType;

    fn zero() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    #[inline]
    fn read_ne(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(bytes)
    }

    #[inline]
    fn write_ne(self, bytes: &mut [u8]) {
        bytes.copy_from_slice(bytemuck::bytes_of(&self));
    }

    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(self, bytes: &mut [u8]);

    /// `self - rhs`, wrapping for integers.
    fn sub(self, rhs: Self) -> Self;
}

/// Floating-point elements that momentum rules can blend.
pub trait Float: Element {
    /// `mu * mom + grad`, evaluated in at least f32 precision.
    fn decay_add(mom: Self, mu: f32, grad: Self) -> Self;
}

macro_rules! impl_element {
    (int: $($ty:ty => $dt:ident),*) => {
        $(
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dt;

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    <$ty>::from_le_bytes(bytemuck::pod_read_unaligned(bytes))
                }

                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
            }
        )*
    };
    (float: $($ty:ty => $dt:ident),*) => {
        $(
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dt;

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    <$ty>::from_le_bytes(bytemuck::pod_read_unaligned(bytes))
                }

                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    self - rhs
                }
            }
        )*
    };
    (half: $($ty:ty => $dt:ident),*) => {
        $(
            impl Element for $ty {
                const DTYPE: DataType = DataType::$dt;

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    <$ty>::from_le_bytes(bytemuck::pod_read_unaligned(bytes))
                }

                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn sub(self, rhs: Self) -> Self {
                    <$ty>::from_f32(self.to_f32() - rhs.to_f32())
                }
            }

            impl Float for $ty {
                #[inline]
                fn decay_add(mom: Self, mu: f32, grad: Self) -> Self {
                    <$ty>::from_f32(mu * mom.to_f32() + grad.to_f32())
                }
            }
        )*
    };
}

impl_element!(int: i8 => I8, i32 => I32, i64 => I64, u8 => U8, u32 => U32, u64 => U64);
impl_element!(float: f32 => F32, f64 => F64);
impl_element!(half: f16 => F16, bf16 => BF16);

impl Float for f32 {
    #[inline]
    fn decay_add(mom: Self, mu: f32, grad: Self) -> Self {
        mu * mom + grad
    }
}

impl Float for f64 {
    #[inline]
    fn decay_add(mom: Self, mu: f32, grad: Self) -> Self {
        f64::from(mu) * mom + grad
    }
}

/// Unsigned integer used to encode a tensor position on the wire.
pub trait Index: Copy + 'static {
    const WIDTH: IndexWidth;

    /// Write `index` little-endian. Callers guarantee it fits `WIDTH`.
    fn encode(index: usize, bytes: &mut [u8]);

    fn decode(bytes: &[u8]) -> u64;
}

macro_rules! impl_index {
    ($($ty:ty => $w:ident),*) => {
        $(
            impl Index for $ty {
                const WIDTH: IndexWidth = IndexWidth::$w;

                #[inline]
                fn encode(index: usize, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&(index as $ty).to_le_bytes());
                }

                #[inline]
                fn decode(bytes: &[u8]) -> u64 {
                    <$ty>::from_le_bytes(bytemuck::pod_read_unaligned(bytes)) as u64
                }
            }
        )*
    };
}

impl_index!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);

/// Run `$body` with `$T` aliased to the element type named by `$dtype`.
macro_rules! dispatch_element {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::types::DataType::F32 => {
                type $T = f32;
                $body
            }
            $crate::types::DataType::F64 => {
                type $T = f64;
                $body
            }
            $crate::types::DataType::F16 => {
                type $T = ::half::f16;
                $body
            }
            $crate::types::DataType::BF16 => {
                type $T = ::half::bf16;
                $body
            }
            $crate::types::DataType::I8 => {
                type $T = i8;
                $body
            }
            $crate::types::DataType::I32 => {
                type $T = i32;
                $body
            }
            $crate::types::DataType::I64 => {
                type $T = i64;
                $body
            }
            $crate::types::DataType::U8 => {
                type $T = u8;
                $body
            }
            $crate::types::DataType::U32 => {
                type $T = u32;
                $body
            }
            $crate::types::DataType::U64 => {
                type $T = u64;
                $body
            }
        }
    };
}

/// Like [`dispatch_element!`] restricted to floating-point types; other
/// dtypes evaluate to `Err(UnsupportedDType)` tagged with `$op`.
macro_rules! dispatch_float {
    ($dtype:expr, $op:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::types::DataType::F32 => {
                type $T = f32;
                $body
            }
            $crate::types::DataType::F64 => {
                type $T = f64;
                $body
            }
            $crate::types::DataType::F16 => {
                type $T = ::half::f16;
                $body
            }
            $crate::types::DataType::BF16 => {
                type $T = ::half::bf16;
                $body
            }
            dtype => Err($crate::error::CompressError::UnsupportedDType { dtype, op: $op }),
        }
    };
}

/// Run `$body` with `$I` aliased to the index type for `$width`.
macro_rules! dispatch_index {
    ($width:expr, $I:ident => $body:expr) => {
        match $width {
            $crate::types::IndexWidth::U8 => {
                type $I = u8;
                $body
            }
            $crate::types::IndexWidth::U16 => {
                type $I = u16;
                $body
            }
            $crate::types::IndexWidth::U32 => {
                type $I = u32;
                $body
            }
            $crate::types::IndexWidth::U64 => {
                type $I = u64;
                $body
            }
        }
    };
}

pub(crate) use {dispatch_element, dispatch_float, dispatch_index};
