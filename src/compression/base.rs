//! Buffers every compressor owns: the packed-output scratch and the
//! error-feedback residual. Both are allocated once and never resized.

use crate::compression::format::{Compressed, pair_stride};
use crate::error::{CompressError, Result};
use crate::tensor::{Tensor, TensorMut, byte_len};
use crate::types::{DataType, IndexWidth};

#[derive(Debug)]
pub struct CompressorBase {
    count: usize,
    dtype: DataType,
    index: IndexWidth,
    scratch: Vec<u8>,
    /// Bytes of `scratch` holding the latest output; `None` before the first compress.
    packed_len: Option<usize>,
    error: Vec<u8>,
}

impl CompressorBase {
    /// Buffers for a tensor of `count` elements whose encodings hold at most `max_pairs` pairs.
    pub fn new(count: usize, dtype: DataType, max_pairs: usize) -> Result<Self> {
        let index = IndexWidth::for_len(count);
        let error = byte_len(count, dtype)?;
        let scratch = max_pairs
            .checked_mul(pair_stride(index, dtype))
            .ok_or(CompressError::TensorTooLarge { len: max_pairs, dtype })?;
        Ok(Self {
            count,
            dtype,
            index,
            scratch: vec![0u8; scratch],
            packed_len: None,
            error: vec![0u8; error],
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn index_width(&self) -> IndexWidth {
        self.index
    }

    /// Fail unless `t` has this compressor's shape.
    pub fn check(&self, t: &Tensor<'_>, op: &'static str) -> Result<()> {
        t.expect_shape(self.count, self.dtype, op)
    }

    /// Scratch space for `pairs` encoded pairs; marks them as the latest output.
    pub fn begin_pack(&mut self, pairs: usize) -> &mut [u8] {
        let bytes = pairs * pair_stride(self.index, self.dtype);
        self.packed_len = Some(bytes);
        &mut self.scratch[..bytes]
    }

    /// The latest packed output, if any.
    pub fn packed(&self) -> Option<Compressed<'_>> {
        self.packed_len
            .map(|n| Compressed::from_parts(&self.scratch[..n], self.index, self.dtype))
    }

    pub fn error(&self) -> Tensor<'_> {
        Tensor::from_raw_parts(&self.error, self.count, self.dtype)
    }

    /// The latest packed output together with the error buffer, for feedback.
    pub fn feedback_parts(&mut self) -> Result<(Compressed<'_>, TensorMut<'_>)> {
        let n = self.packed_len.ok_or(CompressError::NothingCompressed)?;
        let packed = Compressed::from_parts(&self.scratch[..n], self.index, self.dtype);
        let error = TensorMut::from_raw_parts(&mut self.error, self.count, self.dtype);
        Ok((packed, error))
    }
}
