//! Momentum correction in front of any compressor.
//!
//! [`Momentum`] owns an inner [`Compressor`] plus an accumulator of the same
//! shape. Each `compress` first blends the raw gradient into the accumulator
//! through a [`MomentumRule`], then hands the accumulator (not the raw
//! gradient) to the inner compressor. Everything else delegates.

pub mod vanilla;

pub use vanilla::{VanillaMomentum, VanillaMomentumCompressor};

use crate::compression::{Compressed, Compressor};
use crate::error::{CompressError, Result};
use crate::tensor::{Tensor, TensorMut, byte_len};
use crate::types::DataType;

/// A momentum update rule.
pub trait MomentumRule: Send {
    /// Short identifier, as used in configuration.
    fn name(&self) -> &'static str;

    /// Whether the rule can operate on tensors of `dtype`.
    fn supports(&self, dtype: DataType) -> bool {
        dtype.is_float()
    }

    /// Fold `grad` into `mom` in place. Both views share one shape.
    fn update_mom(&self, grad: Tensor<'_>, mom: TensorMut<'_>) -> Result<()>;
}

/// Compressor decorator applying a momentum rule before compression.
pub struct Momentum<R> {
    inner: Box<dyn Compressor>,
    mom: Vec<u8>,
    rule: R,
}

impl<R: MomentumRule> Momentum<R> {
    /// Wrap `inner`, taking ownership. The accumulator starts at zero with
    /// the inner compressor's shape.
    pub fn new(inner: Box<dyn Compressor>, rule: R) -> Result<Self> {
        let dtype = inner.dtype();
        if !rule.supports(dtype) {
            return Err(CompressError::UnsupportedDType {
                dtype,
                op: rule.name(),
            });
        }
        let mom = vec![0u8; byte_len(inner.count(), dtype)?];
        tracing::debug!(
            rule = rule.name(),
            inner = inner.name(),
            count = inner.count(),
            %dtype,
            "momentum wrapper created"
        );
        Ok(Self {
            mom,
            inner,
            rule,
        })
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// The momentum accumulator.
    pub fn momentum(&self) -> Tensor<'_> {
        Tensor::from_raw_parts(&self.mom, self.inner.count(), self.inner.dtype())
    }

    pub fn inner(&self) -> &dyn Compressor {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn Compressor> {
        self.inner
    }
}

impl<R: MomentumRule> Compressor for Momentum<R> {
    fn name(&self) -> &'static str {
        self.rule.name()
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    fn dtype(&self) -> DataType {
        self.inner.dtype()
    }

    fn compress(&mut self, grad: Tensor<'_>) -> Result<Compressed<'_>> {
        let (count, dtype) = (self.inner.count(), self.inner.dtype());
        grad.expect_shape(count, dtype, "compress")?;
        self.rule
            .update_mom(grad, TensorMut::from_raw_parts(&mut self.mom, count, dtype))?;
        self.inner
            .compress(Tensor::from_raw_parts(&self.mom, count, dtype))
    }

    fn decompress(&self, compressed: Compressed<'_>, dst: TensorMut<'_>) -> Result<()> {
        self.inner.decompress(compressed, dst)
    }

    fn update_error(
        &self,
        error: TensorMut<'_>,
        corrected: Tensor<'_>,
        compressed: Compressed<'_>,
    ) -> Result<()> {
        self.inner.update_error(error, corrected, compressed)
    }

    fn fast_update_error(
        &self,
        error: TensorMut<'_>,
        corrected: Tensor<'_>,
        compressed: Compressed<'_>,
    ) -> Result<()> {
        self.inner.fast_update_error(error, corrected, compressed)
    }

    /// `grad` only has to match in shape: the inner compressor last saw the
    /// accumulator, so that is what gets fed back.
    fn feedback(&mut self, grad: Tensor<'_>) -> Result<()> {
        let (count, dtype) = (self.inner.count(), self.inner.dtype());
        grad.expect_shape(count, dtype, "feedback")?;
        self.inner
            .feedback(Tensor::from_raw_parts(&self.mom, count, dtype))
    }

    fn error(&self) -> Tensor<'_> {
        self.inner.error()
    }
}
