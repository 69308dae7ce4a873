use num_traits::AsPrimitive;

use crate::element::{Element, ElementType};
use crate::utils::error::BoxError;

use super::box_data::BoxData;

impl BoxData {
    /// Numeric conversion of every element into a new box of `element_type`.
    ///
    /// Follows Rust `as` semantics: floats saturate into integer ranges, NaN
    /// becomes zero. BOOL converts to 0/1 and anything non-zero becomes true.
    pub fn cast_to(&self, element_type: ElementType) -> Result<BoxData, BoxError> {
        let src = self.as_bytes()?;
        let mut out = BoxData::new();
        out.resize(element_type, self.device(), self.ext(), self.dims())?;
        cast_bytes(self.element_type(), src, element_type, out.as_bytes_mut()?)?;
        out.checked_assign_info(self.info());
        Ok(out)
    }
}

fn unsupported_cast(from: ElementType, to: ElementType) -> BoxError {
    BoxError::InvalidType(format!("cannot cast {} to {}", from, to))
}

fn cast_bytes(
    from: ElementType,
    src: &[u8],
    to: ElementType,
    dst: &mut [u8],
) -> Result<(), BoxError> {
    match (from, to) {
        (ElementType::None, _) | (_, ElementType::None) => Err(unsupported_cast(from, to)),
        (from, to) if from == to => {
            dst.copy_from_slice(src);
            Ok(())
        }
        (ElementType::Bool, to) => for_numeric_type!(to, D => {
            convert::<bool, D>(src, dst, |b| if b { D::one() } else { D::zero() });
            Ok(())
        }, other => Err(unsupported_cast(from, to))),
        (from, ElementType::Bool) => for_numeric_type!(from, S => {
            convert::<S, bool>(src, dst, |v| v != S::zero());
            Ok(())
        }, other => Err(unsupported_cast(from, to))),
        (from, to) => for_numeric_type!(from, S => for_numeric_type!(to, D => {
            convert::<S, D>(src, dst, <S as AsPrimitive<D>>::as_);
            Ok(())
        }, other => Err(unsupported_cast(from, to))), other => Err(unsupported_cast(from, to))),
    }
}

fn convert<S: Element, D: Element>(src: &[u8], dst: &mut [u8], f: impl Fn(S) -> D) {
    let from = src.chunks_exact(S::TYPE.byte_width());
    let to = dst.chunks_exact_mut(D::TYPE.byte_width());
    for (s, d) in from.zip(to) {
        f(S::read_ne(s)).write_ne(d);
    }
}
