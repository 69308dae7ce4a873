/// Runs `$body` with `$T` bound to the Rust type behind a runtime `ElementType`.
///
/// Every typed loop in the crate goes through this so a new element type only
/// has to be added here and in `element_type.rs`.
macro_rules! for_element_type {
    ($ty:expr, $T:ident => $body:expr, none => $none:expr) => {
        match $ty {
            $crate::element::ElementType::Bool => {
                type $T = bool;
                $body
            }
            $crate::element::ElementType::I8 => {
                type $T = i8;
                $body
            }
            $crate::element::ElementType::I16 => {
                type $T = i16;
                $body
            }
            $crate::element::ElementType::I32 => {
                type $T = i32;
                $body
            }
            $crate::element::ElementType::I64 => {
                type $T = i64;
                $body
            }
            $crate::element::ElementType::U8 => {
                type $T = u8;
                $body
            }
            $crate::element::ElementType::U16 => {
                type $T = u16;
                $body
            }
            $crate::element::ElementType::U32 => {
                type $T = u32;
                $body
            }
            $crate::element::ElementType::U64 => {
                type $T = u64;
                $body
            }
            $crate::element::ElementType::F32 => {
                type $T = f32;
                $body
            }
            $crate::element::ElementType::F64 => {
                type $T = f64;
                $body
            }
            $crate::element::ElementType::None => $none,
        }
    };
}

/// Same as `for_element_type!` but only for the ten numeric types.
macro_rules! for_numeric_type {
    ($ty:expr, $T:ident => $body:expr, other => $other:expr) => {
        match $ty {
            $crate::element::ElementType::I8 => {
                type $T = i8;
                $body
            }
            $crate::element::ElementType::I16 => {
                type $T = i16;
                $body
            }
            $crate::element::ElementType::I32 => {
                type $T = i32;
                $body
            }
            $crate::element::ElementType::I64 => {
                type $T = i64;
                $body
            }
            $crate::element::ElementType::U8 => {
                type $T = u8;
                $body
            }
            $crate::element::ElementType::U16 => {
                type $T = u16;
                $body
            }
            $crate::element::ElementType::U32 => {
                type $T = u32;
                $body
            }
            $crate::element::ElementType::U64 => {
                type $T = u64;
                $body
            }
            $crate::element::ElementType::F32 => {
                type $T = f32;
                $body
            }
            $crate::element::ElementType::F64 => {
                type $T = f64;
                $body
            }
            $crate::element::ElementType::Bool | $crate::element::ElementType::None => $other,
        }
    };
}
