//! Gradient compression for distributed training.
//!
//! A [`Compressor`] shrinks a dense gradient into a sparse (index, value)
//! encoding before it crosses the network, reconstructs an approximate dense
//! tensor on the receiving side, and tracks the residual left behind so it
//! can be folded into later rounds (error feedback). A [`Momentum`] wrapper
//! composes a momentum step in front of any compressor.

pub mod compression;
pub mod config;
pub mod element;
pub mod error;
pub mod momentum;
pub mod tensor;
pub mod types;

pub use compression::{Compressed, CompressedBuf, Compressor, RandomKCompressor};
pub use config::{CompressorConfig, CompressorKind, KSelect, MomentumKind};
pub use element::{Element, Float};
pub use error::{CompressError, Result};
pub use momentum::{Momentum, MomentumRule, VanillaMomentum, VanillaMomentumCompressor};
pub use tensor::{Tensor, TensorMut};
pub use types::{DataType, IndexWidth};
