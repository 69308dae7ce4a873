use std::fmt;

use crate::utils::error::BoxError;

// Wire code layout: category prefix in the high byte, bit width in the low byte.
const PREFIX_BOOL: u16 = 0x01;
const PREFIX_SIGNED: u16 = 0x03;
const PREFIX_UNSIGNED: u16 = 0x04;
const PREFIX_FLOAT: u16 = 0x05;

const fn type_code(prefix: u16, bits: u16) -> u16 {
    (prefix << 8) | bits
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementType {
    #[default]
    None,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ElementType {
    pub const NUMERIC: [ElementType; 10] = [
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::U8,
        ElementType::U16,
        ElementType::U32,
        ElementType::U64,
        ElementType::F32,
        ElementType::F64,
    ];

    pub const fn byte_width(self) -> usize {
        match self {
            ElementType::None => 0,
            ElementType::Bool | ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    pub const fn code(self) -> u16 {
        match self {
            ElementType::None => 0,
            ElementType::Bool => type_code(PREFIX_BOOL, 8),
            ElementType::I8 => type_code(PREFIX_SIGNED, 8),
            ElementType::I16 => type_code(PREFIX_SIGNED, 16),
            ElementType::I32 => type_code(PREFIX_SIGNED, 32),
            ElementType::I64 => type_code(PREFIX_SIGNED, 64),
            ElementType::U8 => type_code(PREFIX_UNSIGNED, 8),
            ElementType::U16 => type_code(PREFIX_UNSIGNED, 16),
            ElementType::U32 => type_code(PREFIX_UNSIGNED, 32),
            ElementType::U64 => type_code(PREFIX_UNSIGNED, 64),
            ElementType::F32 => type_code(PREFIX_FLOAT, 32),
            ElementType::F64 => type_code(PREFIX_FLOAT, 64),
        }
    }

    pub fn from_code(code: u16) -> Result<Self, BoxError> {
        std::iter::once(ElementType::None)
            .chain(std::iter::once(ElementType::Bool))
            .chain(Self::NUMERIC)
            .find(|t| t.code() == code)
            .ok_or_else(|| BoxError::InvalidType(format!("unknown type code 0x{:04x}", code)))
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementType::None => "NONE",
            ElementType::Bool => "BOOL",
            ElementType::I8 => "INT8",
            ElementType::I16 => "INT16",
            ElementType::I32 => "INT32",
            ElementType::I64 => "INT64",
            ElementType::U8 => "UINT8",
            ElementType::U16 => "UINT16",
            ElementType::U32 => "UINT32",
            ElementType::U64 => "UINT64",
            ElementType::F32 => "FLOAT32",
            ElementType::F64 => "FLOAT64",
        }
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ElementType::I8 | ElementType::I16 | ElementType::I32 | ElementType::I64
        ) || self.is_floating()
    }

    pub const fn is_numeric(self) -> bool {
        !matches!(self, ElementType::None | ElementType::Bool)
    }

    pub fn of<T: Element>() -> Self {
        T::TYPE
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that can live inside a box buffer.
///
/// Values are stored in native byte order with no padding, so element `i`
/// occupies bytes `[i * width, (i + 1) * width)` of the data buffer.
pub trait Element:
    sealed::Sealed + Copy + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    const TYPE: ElementType;

    /// Reads one value from the front of `bytes`.
    fn read_ne(bytes: &[u8]) -> Self;

    /// Writes this value to the front of `bytes`.
    fn write_ne(self, bytes: &mut [u8]);

    fn zero() -> Self;

    fn one() -> Self;
}

macro_rules! impl_pod_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Element for $t {
                const TYPE: ElementType = ElementType::$variant;

                fn read_ne(bytes: &[u8]) -> Self {
                    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<$t>()])
                }

                fn write_ne(self, bytes: &mut [u8]) {
                    bytes[..std::mem::size_of::<$t>()].copy_from_slice(bytemuck::bytes_of(&self));
                }

                fn zero() -> Self {
                    0 as $t
                }

                fn one() -> Self {
                    1 as $t
                }
            }
        )*
    };
}

impl_pod_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl sealed::Sealed for bool {}

// Stored as one byte, 0 or 1; any non-zero byte reads back as true.
impl Element for bool {
    const TYPE: ElementType = ElementType::Bool;

    fn read_ne(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_ne(self, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }

    fn zero() -> Self {
        false
    }

    fn one() -> Self {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_follow_prefix_and_width() {
        assert_eq!(ElementType::I8.code(), 0x0308);
        assert_eq!(ElementType::I32.code(), 0x0320);
        assert_eq!(ElementType::U16.code(), 0x0410);
        assert_eq!(ElementType::F64.code(), 0x0540);
        assert_eq!(ElementType::None.code(), 0);
    }

    #[test]
    fn from_code_inverts_code() {
        for ty in ElementType::NUMERIC {
            assert_eq!(ElementType::from_code(ty.code()).unwrap(), ty);
        }
        assert_eq!(
            ElementType::from_code(ElementType::Bool.code()).unwrap(),
            ElementType::Bool
        );
        assert!(ElementType::from_code(0x0999).is_err());
    }

    #[test]
    fn byte_width_matches_rust_types() {
        assert_eq!(ElementType::of::<i16>().byte_width(), 2);
        assert_eq!(ElementType::of::<f64>().byte_width(), 8);
        assert_eq!(ElementType::of::<bool>().byte_width(), 1);
        assert_eq!(ElementType::None.byte_width(), 0);
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(ElementType::U64.to_string(), "UINT64");
        assert_eq!(ElementType::F32.to_string(), "FLOAT32");
    }

    #[test]
    fn native_bytes_survive_unaligned_reads() {
        let mut raw = [0u8; 9];
        (-12345.5f64).write_ne(&mut raw[1..]);
        assert_eq!(f64::read_ne(&raw[1..]), -12345.5);

        true.write_ne(&mut raw[..1]);
        assert!(bool::read_ne(&raw));
    }
}
