/// Element types a gradient tensor may hold.
///
/// Mirrors the `nexar` element-type enum (same discriminants) so tensors
/// handed over by the collective layer can be compressed without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    F32 = 0,
    F64 = 1,
    F16 = 2,
    BF16 = 3,
    I8 = 4,
    I32 = 5,
    I64 = 6,
    U8 = 7,
    U32 = 8,
    U64 = 9,
}

impl DataType {
    /// Size of one element in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
            DataType::F16 | DataType::BF16 => 2,
            DataType::I8 | DataType::U8 => 1,
        }
    }

    /// Whether the type is a floating-point format.
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            DataType::F32 | DataType::F64 | DataType::F16 | DataType::BF16
        )
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::F16 => "f16",
            DataType::BF16 => "bf16",
            DataType::I8 => "i8",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
        }
    }

    /// Parse the name produced by [`DataType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "f32" => DataType::F32,
            "f64" => DataType::F64,
            "f16" => DataType::F16,
            "bf16" => DataType::BF16,
            "i8" => DataType::I8,
            "i32" => DataType::I32,
            "i64" => DataType::I64,
            "u8" => DataType::U8,
            "u32" => DataType::U32,
            "u64" => DataType::U64,
            _ => return None,
        })
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Width of the unsigned integer used to encode indices in a compressed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum IndexWidth {
    U8 = 1,
    U16 = 2,
    U32 = 4,
    U64 = 8,
}

impl IndexWidth {
    /// Smallest width able to address every position of a tensor of `len` elements.
    pub const fn for_len(len: usize) -> Self {
        let max_index = len.saturating_sub(1) as u64;
        if max_index <= u8::MAX as u64 {
            IndexWidth::U8
        } else if max_index <= u16::MAX as u64 {
            IndexWidth::U16
        } else if max_index <= u32::MAX as u64 {
            IndexWidth::U32
        } else {
            IndexWidth::U64
        }
    }

    /// Size of one encoded index in bytes.
    pub const fn size_in_bytes(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for IndexWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexWidth::U8 => f.write_str("u8"),
            IndexWidth::U16 => f.write_str("u16"),
            IndexWidth::U32 => f.write_str("u32"),
            IndexWidth::U64 => f.write_str("u64"),
        }
    }
}
