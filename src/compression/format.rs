//! Wire format for sparse (index, value) encodings.
//!
//! Wire format: `k` interleaved pairs `[index][value]`, no header. `index`
//! is an unsigned little-endian integer of [`IndexWidth::for_len`] bytes for
//! the destination length; `value` is the element's little-endian encoding.
//! Pairs keep the order in which the compressor selected them.

use crate::element::{Index, dispatch_index};
use crate::error::{CompressError, Result};
use crate::types::{DataType, IndexWidth};

/// Borrowed view over one compressed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compressed<'a> {
    data: &'a [u8],
    index: IndexWidth,
    dtype: DataType,
}

impl<'a> Compressed<'a> {
    /// Interpret `data` as pairs addressed into a tensor of `len` elements of `dtype`.
    ///
    /// Checks the byte size is a whole number of pairs and the pair count
    /// does not exceed `len`. Indices are checked when decoded.
    pub fn from_wire(data: &'a [u8], len: usize, dtype: DataType) -> Result<Self> {
        let index = IndexWidth::for_len(len);
        let stride = pair_stride(index, dtype);
        if data.len() % stride != 0 {
            return Err(CompressError::MalformedCompressed(format!(
                "{} bytes is not a multiple of the {stride}-byte pair stride ({index} + {dtype})",
                data.len()
            )));
        }
        let pairs = data.len() / stride;
        if pairs > len {
            return Err(CompressError::MalformedCompressed(format!(
                "{pairs} pairs exceed destination length {len}"
            )));
        }
        Ok(Self { data, index, dtype })
    }

    pub(crate) fn from_parts(data: &'a [u8], index: IndexWidth, dtype: DataType) -> Self {
        Self { data, index, dtype }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    pub fn index_width(&self) -> IndexWidth {
        self.index
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn pair_stride(&self) -> usize {
        pair_stride(self.index, self.dtype)
    }

    /// Number of (index, value) pairs.
    pub fn pairs(&self) -> usize {
        self.data.len() / self.pair_stride()
    }

    /// Fail unless this buffer was encoded for a tensor of `len` elements of `dtype`.
    pub fn expect_target(&self, len: usize, dtype: DataType, op: &'static str) -> Result<()> {
        if self.dtype != dtype {
            return Err(CompressError::DTypeMismatch {
                expected: dtype,
                actual: self.dtype,
                op,
            });
        }
        let expected = IndexWidth::for_len(len);
        if self.index != expected {
            return Err(CompressError::MalformedCompressed(format!(
                "index width {} does not match {expected} required for {len} elements",
                self.index
            )));
        }
        if self.data.len() % self.pair_stride() != 0 {
            return Err(CompressError::MalformedCompressed(format!(
                "{} bytes is not a multiple of the {}-byte pair stride",
                self.data.len(),
                self.pair_stride()
            )));
        }
        if self.pairs() > len {
            return Err(CompressError::MalformedCompressed(format!(
                "{} pairs exceed destination length {len}",
                self.pairs()
            )));
        }
        Ok(())
    }

    /// Decode every index, checking each lies in `[0, len)`.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        let mut out = Vec::with_capacity(self.pairs());
        self.for_each_pair(len, |index, _| out.push(index))?;
        Ok(out)
    }

    /// Visit each pair as `(index, little-endian value bytes)`.
    ///
    /// Fails on the first index outside `[0, len)`; pairs before it have
    /// already been visited.
    pub(crate) fn for_each_pair(&self, len: usize, mut f: impl FnMut(usize, &[u8])) -> Result<()> {
        dispatch_index!(self.index, I => self.for_each_pair_impl::<I, _>(len, &mut f))
    }

    fn for_each_pair_impl<I, F>(&self, len: usize, f: &mut F) -> Result<()>
    where
        I: Index,
        F: FnMut(usize, &[u8]),
    {
        let iw = I::WIDTH.size_in_bytes();
        for pair in self.data.chunks_exact(self.pair_stride()) {
            let raw = I::decode(&pair[..iw]);
            let index = usize::try_from(raw)
                .ok()
                .filter(|&i| i < len)
                .ok_or(CompressError::IndexOutOfRange { index: raw, len })?;
            f(index, &pair[iw..]);
        }
        Ok(())
    }

    /// Copy into an owned buffer, e.g. to hand to a transport.
    pub fn to_buf(&self) -> CompressedBuf {
        CompressedBuf {
            data: self.data.to_vec(),
            index: self.index,
            dtype: self.dtype,
        }
    }
}

/// Owned compressed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBuf {
    data: Vec<u8>,
    index: IndexWidth,
    dtype: DataType,
}

impl CompressedBuf {
    /// Take ownership of received bytes; validated like [`Compressed::from_wire`].
    pub fn from_wire(data: Vec<u8>, len: usize, dtype: DataType) -> Result<Self> {
        let index = Compressed::from_wire(&data, len, dtype)?.index;
        Ok(Self { data, index, dtype })
    }

    pub fn view(&self) -> Compressed<'_> {
        Compressed {
            data: &self.data,
            index: self.index,
            dtype: self.dtype,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Bytes occupied by one encoded pair.
pub fn pair_stride(index: IndexWidth, dtype: DataType) -> usize {
    index.size_in_bytes() + dtype.size_in_bytes()
}
