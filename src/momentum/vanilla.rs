//! Classic SGD momentum: `mom <- mu * mom + grad`.

use crate::compression::Compressor;
use crate::element::{Float, dispatch_float};
use crate::error::{CompressError, Result};
use crate::momentum::{Momentum, MomentumRule};
use crate::tensor::{Tensor, TensorMut};

/// Compressor wrapped with vanilla momentum.
pub type VanillaMomentumCompressor = Momentum<VanillaMomentum>;

/// Exponential accumulation with a fixed decay `mu`, no bias correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VanillaMomentum {
    mu: f32,
}

impl VanillaMomentum {
    pub fn new(mu: f32) -> Result<Self> {
        if !mu.is_finite() || !(0.0..1.0).contains(&mu) {
            return Err(CompressError::InvalidMomentum { mu });
        }
        Ok(Self { mu })
    }

    pub fn mu(&self) -> f32 {
        self.mu
    }
}

impl MomentumRule for VanillaMomentum {
    fn name(&self) -> &'static str {
        "vanilla"
    }

    fn update_mom(&self, grad: Tensor<'_>, mut mom: TensorMut<'_>) -> Result<()> {
        grad.expect_shape(mom.len(), mom.dtype(), "update_mom")?;
        let mu = self.mu;
        dispatch_float!(mom.dtype(), "vanilla_momentum", T => {
            decay_add::<T>(mom.as_bytes_mut(), grad.as_bytes(), mu);
            Ok(())
        })
    }
}

fn decay_add<T: Float>(mom: &mut [u8], grad: &[u8], mu: f32) {
    let size = std::mem::size_of::<T>();
    for (m, g) in mom.chunks_exact_mut(size).zip(grad.chunks_exact(size)) {
        T::decay_add(T::read_ne(m), mu, T::read_ne(g)).write_ne(m);
    }
}

impl Momentum<VanillaMomentum> {
    /// Wrap `inner` with vanilla momentum of decay `mu`.
    pub fn vanilla(inner: Box<dyn Compressor>, mu: f32) -> Result<Self> {
        Momentum::new(inner, VanillaMomentum::new(mu)?)
    }
}
