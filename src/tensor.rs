//! Non-owning tensor views.
//!
//! A view pairs a byte slice with an element count and a [`DataType`]. Views
//! never allocate or resize; construction checks that the byte length agrees
//! with `len * dtype.size_in_bytes()`.

use crate::element::Element;
use crate::error::{CompressError, Result};
use crate::types::DataType;

/// Bytes needed for `len` elements of `dtype`.
pub(crate) fn byte_len(len: usize, dtype: DataType) -> Result<usize> {
    len.checked_mul(dtype.size_in_bytes())
        .ok_or(CompressError::TensorTooLarge { len, dtype })
}

fn check_bytes(bytes: usize, len: usize, dtype: DataType) -> Result<()> {
    let expected = byte_len(len, dtype)?;
    if bytes != expected {
        return Err(CompressError::BufferSizeMismatch {
            expected,
            actual: bytes,
        });
    }
    Ok(())
}

fn check_shape(
    len: usize,
    dtype: DataType,
    expected_len: usize,
    expected_dtype: DataType,
    op: &'static str,
) -> Result<()> {
    if dtype != expected_dtype {
        return Err(CompressError::DTypeMismatch {
            expected: expected_dtype,
            actual: dtype,
            op,
        });
    }
    if len != expected_len {
        return Err(CompressError::LengthMismatch {
            expected: expected_len,
            actual: len,
            op,
        });
    }
    Ok(())
}

/// Read-only view over a dense tensor.
#[derive(Debug, Clone, Copy)]
pub struct Tensor<'a> {
    data: &'a [u8],
    len: usize,
    dtype: DataType,
}

impl<'a> Tensor<'a> {
    /// Wrap `data` as `len` elements of `dtype` in host byte order.
    pub fn new(data: &'a [u8], len: usize, dtype: DataType) -> Result<Self> {
        check_bytes(data.len(), len, dtype)?;
        Ok(Self { data, len, dtype })
    }

    /// Wrap a buffer whose size the caller has already established.
    pub(crate) fn from_raw_parts(data: &'a [u8], len: usize, dtype: DataType) -> Self {
        debug_assert_eq!(Some(data.len()), len.checked_mul(dtype.size_in_bytes()));
        Self { data, len, dtype }
    }

    /// View a typed slice.
    pub fn from_slice<T: Element>(values: &'a [T]) -> Self {
        Self {
            data: bytemuck::cast_slice(values),
            len: values.len(),
            dtype: T::DTYPE,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Fail unless the view holds exactly `len` elements of `dtype`.
    pub fn expect_shape(&self, len: usize, dtype: DataType, op: &'static str) -> Result<()> {
        check_shape(self.len, self.dtype, len, dtype, op)
    }

    /// Copy the elements out as `T`, which must match the view's dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype {
            return Err(CompressError::DTypeMismatch {
                expected: self.dtype,
                actual: T::DTYPE,
                op: "to_vec",
            });
        }
        Ok(self
            .data
            .chunks_exact(self.dtype.size_in_bytes())
            .map(T::read_ne)
            .collect())
    }
}

/// Mutable view over a dense tensor.
#[derive(Debug)]
pub struct TensorMut<'a> {
    data: &'a mut [u8],
    len: usize,
    dtype: DataType,
}

impl<'a> TensorMut<'a> {
    pub fn new(data: &'a mut [u8], len: usize, dtype: DataType) -> Result<Self> {
        check_bytes(data.len(), len, dtype)?;
        Ok(Self { data, len, dtype })
    }

    pub(crate) fn from_raw_parts(data: &'a mut [u8], len: usize, dtype: DataType) -> Self {
        debug_assert_eq!(Some(data.len()), len.checked_mul(dtype.size_in_bytes()));
        Self { data, len, dtype }
    }

    pub fn from_slice_mut<T: Element>(values: &'a mut [T]) -> Self {
        let len = values.len();
        Self {
            data: bytemuck::cast_slice_mut(values),
            len,
            dtype: T::DTYPE,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn as_bytes(&self) -> &[u8] {
        &*self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Reborrow as a read-only view.
    pub fn as_tensor(&self) -> Tensor<'_> {
        Tensor {
            data: &*self.data,
            len: self.len,
            dtype: self.dtype,
        }
    }

    /// Reborrow mutably for a shorter lifetime.
    pub fn reborrow(&mut self) -> TensorMut<'_> {
        TensorMut {
            data: &mut *self.data,
            len: self.len,
            dtype: self.dtype,
        }
    }

    pub fn expect_shape(&self, len: usize, dtype: DataType, op: &'static str) -> Result<()> {
        check_shape(self.len, self.dtype, len, dtype, op)
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite with the contents of `src`, which must have the same shape.
    pub fn copy_from(&mut self, src: Tensor<'_>) -> Result<()> {
        src.expect_shape(self.len, self.dtype, "copy_from")?;
        self.data.copy_from_slice(src.data);
        Ok(())
    }
}
