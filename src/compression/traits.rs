//! Compression trait shared by all sparsifiers and the wrappers around them.

use crate::compression::format::Compressed;
use crate::element::{Element, dispatch_element};
use crate::error::Result;
use crate::tensor::{Tensor, TensorMut};
use crate::types::DataType;

/// Trait for gradient compressors.
///
/// An instance is built for one tensor shape (`count` elements of `dtype`)
/// and owns its scratch and error-feedback buffers, sized once at
/// construction. Instances are not internally synchronized: serialize calls
/// to one instance, or give each worker its own.
///
/// Every argument must match the instance's shape; mismatches are reported
/// as errors and never coerced.
pub trait Compressor: Send {
    /// Short identifier, as used in configuration.
    fn name(&self) -> &'static str;

    /// Number of elements in the uncompressed tensor.
    fn count(&self) -> usize;

    fn dtype(&self) -> DataType;

    /// Compress `grad` without modifying it.
    ///
    /// The result borrows the instance's scratch buffer and stays valid until
    /// the next call taking `&mut self`.
    fn compress(&mut self, grad: Tensor<'_>) -> Result<Compressed<'_>>;

    /// Reconstruct a dense tensor into `dst`. Positions absent from
    /// `compressed` are zero.
    fn decompress(&self, compressed: Compressed<'_>, dst: TensorMut<'_>) -> Result<()>;

    /// Generic error update: `error = corrected - decompress(compressed)`.
    ///
    /// Computed in place in `error`, which doubles as the decompression target.
    fn update_error(
        &self,
        mut error: TensorMut<'_>,
        corrected: Tensor<'_>,
        compressed: Compressed<'_>,
    ) -> Result<()> {
        error.expect_shape(self.count(), self.dtype(), "update_error")?;
        corrected.expect_shape(self.count(), self.dtype(), "update_error")?;
        self.decompress(compressed, error.reborrow())?;
        subtract_from(error, corrected);
        Ok(())
    }

    /// Cheaper equivalent of [`Compressor::update_error`] for compressors that
    /// can derive the residual without a full decompress-and-subtract pass.
    fn fast_update_error(
        &self,
        error: TensorMut<'_>,
        corrected: Tensor<'_>,
        compressed: Compressed<'_>,
    ) -> Result<()> {
        self.update_error(error, corrected, compressed)
    }

    /// Fold the most recent `compress` result into the owned error buffer.
    ///
    /// `corrected` is the tensor that was passed to that `compress` call.
    fn feedback(&mut self, corrected: Tensor<'_>) -> Result<()>;

    /// The owned error-feedback buffer (zero until the first `feedback`).
    fn error(&self) -> Tensor<'_>;
}

/// `error[i] = corrected[i] - error[i]`. Shapes are checked by the caller.
fn subtract_from(mut error: TensorMut<'_>, corrected: Tensor<'_>) {
    let dtype = error.dtype();
    dispatch_element!(dtype, T => {
        subtract_from_typed::<T>(error.as_bytes_mut(), corrected.as_bytes())
    })
}

fn subtract_from_typed<T: Element>(error: &mut [u8], corrected: &[u8]) {
    let size = std::mem::size_of::<T>();
    for (e, c) in error.chunks_exact_mut(size).zip(corrected.chunks_exact(size)) {
        T::read_ne(c).sub(T::read_ne(e)).write_ne(e);
    }
}
