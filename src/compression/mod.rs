pub mod base;
pub mod format;
pub mod randomk;
pub mod traits;

pub use base::CompressorBase;
pub use format::{Compressed, CompressedBuf, pair_stride};
pub use randomk::RandomKCompressor;
pub use traits::Compressor;
