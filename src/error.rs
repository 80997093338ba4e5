use crate::types::DataType;

pub type Result<T> = std::result::Result<T, CompressError>;

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("unsupported data type: {dtype:?} for operation {op}")]
    UnsupportedDType { dtype: DataType, op: &'static str },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("tensor of {len} {dtype} elements overflows the address space")]
    TensorTooLarge { len: usize, dtype: DataType },

    #[error("tensor length mismatch in {op}: expected {expected} elements, got {actual}")]
    LengthMismatch {
        expected: usize,
        actual: usize,
        op: &'static str,
    },

    #[error("data type mismatch in {op}: expected {expected}, got {actual}")]
    DTypeMismatch {
        expected: DataType,
        actual: DataType,
        op: &'static str,
    },

    #[error("invalid k={k} for tensor of {len} elements (need 0 < k <= len)")]
    InvalidK { k: usize, len: usize },

    #[error("invalid momentum decay mu={mu} (need 0 <= mu < 1)")]
    InvalidMomentum { mu: f32 },

    #[error("compressed index {index} out of range for tensor of {len} elements")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("compressed index {index} appears more than once")]
    DuplicateIndex { index: usize },

    #[error("malformed compressed buffer: {0}")]
    MalformedCompressed(String),

    #[error("no compressed output to feed back: call compress first")]
    NothingCompressed,

    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(#[source] rand::Error),

    #[error("invalid compressor configuration: {0}")]
    Config(String),
}
