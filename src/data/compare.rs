use crate::element::{DeviceTag, Element, ElementType};
use crate::utils::error::BoxError;

use super::box_data::BoxData;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn apply<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }
}

/// Right-hand side of an element-wise comparison: another box or a scalar.
pub trait Comparand {
    fn compare_with(self, lhs: &BoxData, op: CompareOp) -> Result<BoxData, BoxError>;
}

impl Comparand for &BoxData {
    fn compare_with(self, lhs: &BoxData, op: CompareOp) -> Result<BoxData, BoxError> {
        lhs.compare_box(self, op)
    }
}

impl<T: Element> Comparand for T {
    fn compare_with(self, lhs: &BoxData, op: CompareOp) -> Result<BoxData, BoxError> {
        lhs.compare_scalar(self, op)
    }
}

fn compare_elements<T: Element>(
    op: CompareOp,
    lhs: &[u8],
    rhs: impl Fn(usize) -> T,
    out: &mut [u8],
) {
    let width = T::TYPE.byte_width();
    for (i, (chunk, flag)) in lhs.chunks_exact(width).zip(out.iter_mut()).enumerate() {
        *flag = op.apply(T::read_ne(chunk), rhs(i)) as u8;
    }
}

fn none_type() -> BoxError {
    BoxError::InvalidType("cannot compare NONE elements".to_string())
}

impl BoxData {
    /// Element-wise comparison producing a BOOL box of the same shape.
    pub fn compare<R: Comparand>(&self, rhs: R, op: CompareOp) -> Result<BoxData, BoxError> {
        rhs.compare_with(self, op)
    }

    pub fn lt<R: Comparand>(&self, rhs: R) -> Result<BoxData, BoxError> {
        self.compare(rhs, CompareOp::Lt)
    }

    pub fn le<R: Comparand>(&self, rhs: R) -> Result<BoxData, BoxError> {
        self.compare(rhs, CompareOp::Le)
    }

    pub fn gt<R: Comparand>(&self, rhs: R) -> Result<BoxData, BoxError> {
        self.compare(rhs, CompareOp::Gt)
    }

    pub fn ge<R: Comparand>(&self, rhs: R) -> Result<BoxData, BoxError> {
        self.compare(rhs, CompareOp::Ge)
    }

    pub fn eq<R: Comparand>(&self, rhs: R) -> Result<BoxData, BoxError> {
        self.compare(rhs, CompareOp::Eq)
    }

    pub fn ne<R: Comparand>(&self, rhs: R) -> Result<BoxData, BoxError> {
        self.compare(rhs, CompareOp::Ne)
    }

    fn bool_result(&self) -> Result<BoxData, BoxError> {
        if self.device() == DeviceTag::None {
            return Err(BoxError::NotReady);
        }
        let mut out = BoxData::new();
        out.resize(ElementType::Bool, self.device(), self.ext(), self.dims())?;
        Ok(out)
    }

    fn compare_box(&self, rhs: &BoxData, op: CompareOp) -> Result<BoxData, BoxError> {
        if self.element_type() != rhs.element_type() {
            return Err(BoxError::InvalidType(format!(
                "cannot compare {} with {}",
                self.element_type(),
                rhs.element_type()
            )));
        }
        if !self.is_same_device(rhs) {
            return Err(BoxError::ExDev(format!(
                "cannot compare {} data with {} data",
                self.device(),
                rhs.device()
            )));
        }
        if self.dims() != rhs.dims() {
            return Err(BoxError::Shape {
                expected: self.dims().to_vec(),
                found: rhs.dims().to_vec(),
            });
        }

        let mut out = self.bool_result()?;
        let lhs_bytes = self.as_bytes()?;
        let rhs_bytes = rhs.as_bytes()?;
        let flags = out.as_bytes_mut()?;
        let width = self.element_type().byte_width();

        for_element_type!(self.element_type(), T => compare_elements::<T>(
            op,
            lhs_bytes,
            |i| T::read_ne(&rhs_bytes[i * width..]),
            flags,
        ), none => return Err(none_type()));

        Ok(out)
    }

    fn compare_scalar<V: Element>(&self, value: V, op: CompareOp) -> Result<BoxData, BoxError> {
        if self.element_type() != V::TYPE {
            return Err(BoxError::InvalidType(format!(
                "cannot compare {} with a {} scalar",
                self.element_type(),
                V::TYPE
            )));
        }

        let mut out = self.bool_result()?;
        let lhs_bytes = self.as_bytes()?;
        let flags = out.as_bytes_mut()?;

        let mut scalar = [0u8; 8];
        value.write_ne(&mut scalar);

        for_element_type!(self.element_type(), T => {
            let rhs = T::read_ne(&scalar);
            compare_elements::<T>(op, lhs_bytes, |_| rhs, flags)
        }, none => return Err(none_type()));

        Ok(out)
    }

    fn bool_flags(&self) -> Result<&[u8], BoxError> {
        self.check_type::<bool>()?;
        self.as_bytes()
    }

    /// True when every flag is set; an empty box is vacuously true.
    pub fn all(&self) -> Result<bool, BoxError> {
        Ok(self.bool_flags()?.iter().all(|&b| b != 0))
    }

    pub fn any(&self) -> Result<bool, BoxError> {
        Ok(self.bool_flags()?.iter().any(|&b| b != 0))
    }

    pub fn count(&self) -> Result<usize, BoxError> {
        Ok(self.bool_flags()?.iter().filter(|&&b| b != 0).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::DeviceExt;
    use crate::memory::test_support::register_accel_a;
    use crate::utils::error::ErrorKind;

    #[test]
    fn scalar_comparisons() {
        let data = BoxData::from_values(&[2, 2], &[1i32, 5, 3, 5]).unwrap();

        let gt = data.gt(2i32).unwrap();
        assert_eq!(gt.element_type(), ElementType::Bool);
        assert_eq!(gt.dims(), &[2, 2]);
        assert_eq!(gt.to_vec::<bool>().unwrap(), vec![false, true, true, true]);

        assert_eq!(data.eq(5i32).unwrap().count().unwrap(), 2);
        assert!(data.ge(1i32).unwrap().all().unwrap());
        assert!(!data.lt(1i32).unwrap().any().unwrap());
        assert_eq!(data.le(3i32).unwrap().count().unwrap(), 2);
        assert_eq!(data.ne(5i32).unwrap().count().unwrap(), 2);
    }

    #[test]
    fn box_comparisons() {
        let lhs = BoxData::from_values(&[3], &[1.0f64, 2.0, 3.0]).unwrap();
        let rhs = BoxData::from_values(&[3], &[3.0f64, 2.0, 1.0]).unwrap();
        assert_eq!(
            lhs.lt(&rhs).unwrap().to_vec::<bool>().unwrap(),
            vec![true, false, false]
        );
        assert_eq!(lhs.eq(&rhs).unwrap().count().unwrap(), 1);
        assert!(lhs.eq(&lhs).unwrap().all().unwrap());
    }

    #[test]
    fn nan_is_never_equal() {
        let data = BoxData::from_values(&[2], &[f32::NAN, 1.0]).unwrap();
        assert_eq!(
            data.eq(&data).unwrap().to_vec::<bool>().unwrap(),
            vec![false, true]
        );
    }

    #[test]
    fn mismatches_are_reported_in_order() {
        register_accel_a();
        let base = BoxData::from_values(&[2], &[1u8, 2]).unwrap();

        let other_type = BoxData::from_values(&[3], &[1i8, 2, 3]).unwrap();
        assert_eq!(base.lt(&other_type).unwrap_err().kind(), ErrorKind::InvalidType);

        let mut other_device = BoxData::new();
        other_device
            .resize(ElementType::U8, DeviceTag::AccelA, DeviceExt::new(1, 0, 0), &[3])
            .unwrap();
        assert_eq!(base.lt(&other_device).unwrap_err().kind(), ErrorKind::ExDev);

        let other_shape = BoxData::from_values(&[3], &[1u8, 2, 3]).unwrap();
        assert_eq!(base.lt(&other_shape).unwrap_err().kind(), ErrorKind::Shape);

        assert_eq!(base.lt(1u16).unwrap_err().kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn empty_boxes_are_not_ready() {
        let (lhs, rhs) = (BoxData::new(), BoxData::new());
        assert_eq!(lhs.eq(&rhs).unwrap_err().kind(), ErrorKind::NotReady);
        assert_eq!(lhs.ge(&lhs).unwrap_err().kind(), ErrorKind::NotReady);
    }

    #[test]
    fn reductions_need_bool() {
        let data = BoxData::from_values(&[1], &[1u32]).unwrap();
        assert_eq!(data.all().unwrap_err().kind(), ErrorKind::InvalidType);
        assert_eq!(BoxData::new().lt(0u8).unwrap_err().kind(), ErrorKind::InvalidType);
    }
}
