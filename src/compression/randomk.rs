//! Random-K sparsification: keep `k` uniformly chosen elements per call.
//!
//! Simpler than TopK (no sort needed), and unbiased in expectation when
//! combined with error feedback. Kept values are copied exactly, so the
//! residual after one round is just the corrected input with the selected
//! positions zeroed, which [`RandomKCompressor::fast_update_error`] exploits.
//!
//! Reference: Stich et al., "Sparsified SGD with Memory" (arXiv:1809.07599).

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use crate::compression::base::CompressorBase;
use crate::compression::format::Compressed;
use crate::compression::traits::Compressor;
use crate::element::{Element, Index, dispatch_element, dispatch_index};
use crate::error::{CompressError, Result};
use crate::tensor::{Tensor, TensorMut};
use crate::types::{DataType, IndexWidth};

/// Random-K gradient compressor.
///
/// The generator is seeded once at construction and every `compress`
/// advances the same stream; rebuild the compressor to restart it.
pub struct RandomKCompressor {
    base: CompressorBase,
    k: usize,
    rng: StdRng,
    pool: Pool,
}

/// Permutation of `0..count`; a partial Fisher-Yates pass over its prefix
/// yields each call's sample. Held as `u32` unless the count needs more.
#[derive(Debug)]
enum Pool {
    Narrow(Vec<u32>),
    Wide(Vec<usize>),
}

impl Pool {
    fn new(count: usize) -> Self {
        match u32::try_from(count) {
            Ok(n) => Pool::Narrow((0..n).collect()),
            Err(_) => Pool::Wide((0..count).collect()),
        }
    }

    fn shuffle_prefix(&mut self, k: usize, rng: &mut StdRng) {
        match self {
            Pool::Narrow(p) => shuffle_prefix(p, k, rng),
            Pool::Wide(p) => shuffle_prefix(p, k, rng),
        }
    }
}

fn shuffle_prefix<P>(pool: &mut [P], k: usize, rng: &mut StdRng) {
    let n = pool.len();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        pool.swap(i, j);
    }
}

/// A permutation entry naming a tensor position.
trait Position: Copy {
    fn position(self) -> usize;
}

impl Position for u32 {
    #[inline]
    fn position(self) -> usize {
        self as usize
    }
}

impl Position for usize {
    #[inline]
    fn position(self) -> usize {
        self
    }
}

impl RandomKCompressor {
    /// Build a compressor keeping `k` of `count` elements of `dtype`.
    ///
    /// With `deterministic` the stream is reproducible from `seed`;
    /// otherwise it is seeded from the OS entropy source and `seed` is ignored.
    pub fn new(
        count: usize,
        dtype: DataType,
        k: usize,
        seed: u64,
        deterministic: bool,
    ) -> Result<Self> {
        if k == 0 || k > count {
            return Err(CompressError::InvalidK { k, len: count });
        }
        let base = CompressorBase::new(count, dtype, k)?;
        let rng = if deterministic {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_rng(OsRng).map_err(CompressError::EntropyUnavailable)?
        };
        tracing::debug!(count, k, %dtype, deterministic, "randomk compressor created");
        Ok(Self {
            base,
            k,
            rng,
            pool: Pool::new(count),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Draw `k` distinct positions without replacement into the pool prefix.
    fn sample(&mut self) {
        self.pool.shuffle_prefix(self.k, &mut self.rng);
    }
}

impl Compressor for RandomKCompressor {
    fn name(&self) -> &'static str {
        "randomk"
    }

    fn count(&self) -> usize {
        self.base.count()
    }

    fn dtype(&self) -> DataType {
        self.base.dtype()
    }

    fn compress(&mut self, grad: Tensor<'_>) -> Result<Compressed<'_>> {
        self.base.check(&grad, "compress")?;
        self.sample();

        let k = self.k;
        let dtype = self.base.dtype();
        let index = self.base.index_width();
        let dst = self.base.begin_pack(k);
        match &self.pool {
            Pool::Narrow(p) => pack_selected(index, dtype, dst, grad.as_bytes(), &p[..k]),
            Pool::Wide(p) => pack_selected(index, dtype, dst, grad.as_bytes(), &p[..k]),
        }

        tracing::trace!(k, count = self.base.count(), "randomk compress");
        self.base.packed().ok_or(CompressError::NothingCompressed)
    }

    fn decompress(&self, compressed: Compressed<'_>, dst: TensorMut<'_>) -> Result<()> {
        dst.expect_shape(self.base.count(), self.base.dtype(), "decompress")?;
        unpack(compressed, dst)
    }

    fn fast_update_error(
        &self,
        error: TensorMut<'_>,
        corrected: Tensor<'_>,
        compressed: Compressed<'_>,
    ) -> Result<()> {
        error.expect_shape(self.base.count(), self.base.dtype(), "fast_update_error")?;
        self.base.check(&corrected, "fast_update_error")?;
        zero_selected(error, corrected, compressed)
    }

    fn feedback(&mut self, corrected: Tensor<'_>) -> Result<()> {
        self.base.check(&corrected, "feedback")?;
        let (packed, error) = self.base.feedback_parts()?;
        zero_selected(error, corrected, packed)
    }

    fn error(&self) -> Tensor<'_> {
        self.base.error()
    }
}

/// Decode `compressed` into `dst`, zero-filling every position it does not name.
///
/// Needs no compressor state, so a receiver can decode a peer's buffer with
/// only the destination shape. `dst` is left untouched if any index is out
/// of range. A buffer naming one position twice is rejected with
/// [`CompressError::DuplicateIndex`] and leaves `dst` zeroed.
pub fn unpack(compressed: Compressed<'_>, mut dst: TensorMut<'_>) -> Result<()> {
    let count = dst.len();
    let dtype = dst.dtype();
    compressed.expect_target(count, dtype, "decompress")?;
    compressed.for_each_pair(count, |_, _| {})?;

    dst.fill_zero();
    let size = dtype.size_in_bytes();
    let out = dst.as_bytes_mut();

    // Mark the first byte of every named slot; a slot already marked is a repeat.
    let mut duplicate = None;
    compressed.for_each_pair(count, |index, _| {
        let mark = &mut out[index * size];
        if *mark != 0 && duplicate.is_none() {
            duplicate = Some(index);
        }
        *mark = 1;
    })?;
    if let Some(index) = duplicate {
        out.fill(0);
        return Err(CompressError::DuplicateIndex { index });
    }

    // Every marked slot is overwritten below; unmarked ones are still zero.
    dispatch_element!(dtype, T => compressed.for_each_pair(count, |index, value| {
        T::read_le(value).write_ne(&mut out[index * size..(index + 1) * size]);
    }))?;
    tracing::trace!(pairs = compressed.pairs(), count, "randomk decompress");
    Ok(())
}

fn pack_selected<P: Position>(
    index: IndexWidth,
    dtype: DataType,
    dst: &mut [u8],
    src: &[u8],
    selected: &[P],
) {
    dispatch_index!(index, I => {
        dispatch_element!(dtype, T => pack::<I, T, P>(dst, src, selected))
    })
}

fn pack<I: Index, T: Element, P: Position>(dst: &mut [u8], src: &[u8], selected: &[P]) {
    let iw = I::WIDTH.size_in_bytes();
    let vw = std::mem::size_of::<T>();
    for (pair, &slot) in dst.chunks_exact_mut(iw + vw).zip(selected) {
        let index = slot.position();
        I::encode(index, &mut pair[..iw]);
        T::read_ne(&src[index * vw..(index + 1) * vw]).write_le(&mut pair[iw..]);
    }
}

/// `error = corrected`, then zero every position named in `compressed`.
fn zero_selected(
    mut error: TensorMut<'_>,
    corrected: Tensor<'_>,
    compressed: Compressed<'_>,
) -> Result<()> {
    let count = error.len();
    let size = error.dtype().size_in_bytes();
    compressed.expect_target(count, error.dtype(), "fast_update_error")?;
    compressed.for_each_pair(count, |_, _| {})?;

    error.copy_from(corrected)?;
    let out = error.as_bytes_mut();
    compressed.for_each_pair(count, |index, _| {
        out[index * size..(index + 1) * size].fill(0);
    })
}
