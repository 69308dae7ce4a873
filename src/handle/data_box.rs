use std::ffi::c_void;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::{BinaryCodec, JsonCodec, PacketBuilder, PacketParser};
use crate::data::{BoxData, CompareOp, OpaqueDeleter, OpaqueValue};
use crate::element::{DeviceExt, DeviceTag, Element, ElementType};
use crate::slice::BoxSlice;
use crate::utils::error::BoxError;
use crate::utils::expect_msg::ExpectLock;

/// Shared handle to box storage.
///
/// Cloning a `DataBox` aliases the same storage; use [`DataBox::deep_clone`]
/// for an independent copy. A fresh handle holds nothing until the first
/// mutating call creates the storage.
#[derive(Clone, Default)]
pub struct DataBox {
    base: Option<Arc<RwLock<BoxData>>>,
}

/// Right-hand side of a handle comparison: another handle or a scalar.
pub trait BoxOperand {
    fn compare_handle(self, lhs: &DataBox, op: CompareOp) -> Result<BoxData, BoxError>;
}

impl BoxOperand for &DataBox {
    fn compare_handle(self, lhs: &DataBox, op: CompareOp) -> Result<BoxData, BoxError> {
        let left = lhs.read()?;
        if lhs.is_alias_of(self) {
            return left.compare(&*left, op);
        }
        let right = self.read()?;
        left.compare(&*right, op)
    }
}

impl<T: Element> BoxOperand for T {
    fn compare_handle(self, lhs: &DataBox, op: CompareOp) -> Result<BoxData, BoxError> {
        lhs.read()?.compare(self, op)
    }
}

impl DataBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: BoxData) -> Self {
        Self {
            base: Some(Arc::new(RwLock::new(data))),
        }
    }

    /// Host array of `dims`, zero filled.
    pub fn zeros<T: Element>(dims: &[u32]) -> Result<Self, BoxError> {
        let mut handle = Self::new();
        handle.resize::<T>(dims)?;
        Ok(handle)
    }

    pub fn ones<T: Element>(dims: &[u32]) -> Result<Self, BoxError> {
        Self::full(dims, T::one())
    }

    pub fn full<T: Element>(dims: &[u32], value: T) -> Result<Self, BoxError> {
        let handle = Self::zeros::<T>(dims)?;
        handle.fill(value)?;
        Ok(handle)
    }

    pub fn from_shape<T: Element>(dims: &[u32], values: &[T]) -> Result<Self, BoxError> {
        Ok(Self::from_data(BoxData::from_values(dims, values)?))
    }

    /// One dimensional array holding `values`.
    pub fn from_slice<T: Element>(values: &[T]) -> Result<Self, BoxError> {
        if values.is_empty() {
            return Self::from_shape::<T>(&[], values);
        }
        let len = u32::try_from(values.len()).map_err(|_| {
            BoxError::IllegalArgs(format!("{} values exceed a single axis", values.len()))
        })?;
        Self::from_shape(&[len], values)
    }

    pub fn exists(&self) -> bool {
        self.base.is_some()
    }

    pub fn clone_handle(&self) -> Self {
        self.clone()
    }

    pub fn is_alias_of(&self, other: &DataBox) -> bool {
        match (&self.base, &other.base) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of handles sharing this storage, 0 when empty.
    pub fn use_count(&self) -> usize {
        self.base.as_ref().map_or(0, Arc::strong_count)
    }

    /// Detaches this handle. Storage is freed when the last alias lets go.
    pub fn reset(&mut self) {
        self.base = None;
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, BoxData>, BoxError> {
        let base = self.base.as_ref().ok_or(BoxError::Expired)?;
        Ok(base.read().expect_lock("box data"))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, BoxData>, BoxError> {
        let base = self.base.as_ref().ok_or(BoxError::Expired)?;
        Ok(base.write().expect_lock("box data"))
    }

    fn write_or_create(&mut self) -> RwLockWriteGuard<'_, BoxData> {
        self.base
            .get_or_insert_with(|| Arc::new(RwLock::new(BoxData::new())))
            .write()
            .expect_lock("box data")
    }

    fn read_or<R>(&self, default: R, f: impl FnOnce(&BoxData) -> R) -> R {
        match &self.base {
            Some(base) => f(&base.read().expect_lock("box data")),
            None => default,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.read_or(ElementType::None, BoxData::element_type)
    }

    pub fn device(&self) -> DeviceTag {
        self.read_or(DeviceTag::None, BoxData::device)
    }

    pub fn ext(&self) -> DeviceExt {
        self.read_or(DeviceExt::ZERO, BoxData::ext)
    }

    pub fn rank(&self) -> usize {
        self.read_or(0, BoxData::rank)
    }

    pub fn dims(&self) -> Vec<u32> {
        self.read_or(Vec::new(), |d| d.dims().to_vec())
    }

    pub fn element_count(&self) -> usize {
        self.read_or(0, BoxData::element_count)
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    pub fn resize<T: Element>(&mut self, dims: &[u32]) -> Result<(), BoxError> {
        self.resize_as(T::TYPE, dims)
    }

    /// Resize keeping the current device, or the host for new storage.
    pub fn resize_as(&mut self, element_type: ElementType, dims: &[u32]) -> Result<(), BoxError> {
        self.write_or_create().resize_same_device(element_type, dims)
    }

    pub fn resize_on(
        &mut self,
        element_type: ElementType,
        device: DeviceTag,
        ext: DeviceExt,
        dims: &[u32],
    ) -> Result<(), BoxError> {
        self.write_or_create().resize(element_type, device, ext, dims)
    }

    pub fn resize_like(
        &mut self,
        element_type: ElementType,
        other: &DataBox,
    ) -> Result<(), BoxError> {
        if self.is_alias_of(other) {
            let mut data = self.write()?;
            let (device, ext, dims) = (data.device(), data.ext(), data.dims().to_vec());
            return data.resize(element_type, device, ext, &dims);
        }
        let src = other.read()?;
        self.write_or_create().resize_like(element_type, &src)
    }

    pub fn clear(&self) -> Result<(), BoxError> {
        self.write()?.clear();
        Ok(())
    }

    pub fn release(&self) -> Result<(), BoxError> {
        self.write()?.release();
        Ok(())
    }

    pub fn get<T: Element>(&self, indices: &[u32]) -> Result<T, BoxError> {
        self.read()?.get(indices)
    }

    pub fn set<T: Element>(&self, indices: &[u32], value: T) -> Result<(), BoxError> {
        self.write()?.set(indices, value)
    }

    pub fn get_offset<T: Element>(&self, offset: usize) -> Result<T, BoxError> {
        self.read()?.get_offset(offset)
    }

    pub fn set_offset<T: Element>(&self, offset: usize, value: T) -> Result<(), BoxError> {
        self.write()?.set_offset(offset, value)
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, BoxError> {
        self.read()?.to_vec()
    }

    pub fn fill<T: Element>(&self, value: T) -> Result<(), BoxError> {
        self.write()?.fill(value)
    }

    pub fn fill_zeros(&self) -> Result<(), BoxError> {
        self.write()?.zeros()
    }

    pub fn fill_ones(&self) -> Result<(), BoxError> {
        self.write()?.ones()
    }

    pub fn fill_random_uniform(&self, low: f64, high: f64) -> Result<(), BoxError> {
        self.write()?.fill_random_uniform(low, high)
    }

    pub fn fill_random_normal(&self, mean: f64, std_dev: f64) -> Result<(), BoxError> {
        self.write()?.fill_random_normal(mean, std_dev)
    }

    /// Makes this handle's storage an equal copy of `other`'s.
    pub fn copy_from(&mut self, other: &DataBox) -> Result<(), BoxError> {
        if self.is_alias_of(other) {
            return Ok(());
        }
        let src = other.read()?;
        self.write_or_create().copy_from(&src)
    }

    pub fn copy_to(&self, dest: &mut DataBox) -> Result<(), BoxError> {
        dest.copy_from(self)
    }

    /// Independent storage with equal contents. An empty handle clones to
    /// an empty handle.
    pub fn deep_clone(&self) -> Result<DataBox, BoxError> {
        match &self.base {
            Some(base) => {
                let data = base.read().expect_lock("box data").deep_clone()?;
                Ok(Self::from_data(data))
            }
            None => Ok(Self::new()),
        }
    }

    pub fn as_type(&self, element_type: ElementType) -> Result<DataBox, BoxError> {
        Ok(Self::from_data(self.read()?.as_type(element_type)?))
    }

    pub fn cast_to(&self, element_type: ElementType) -> Result<DataBox, BoxError> {
        Ok(Self::from_data(self.read()?.cast_to(element_type)?))
    }

    pub fn compare<R: BoxOperand>(&self, rhs: R, op: CompareOp) -> Result<DataBox, BoxError> {
        Ok(Self::from_data(rhs.compare_handle(self, op)?))
    }

    pub fn lt<R: BoxOperand>(&self, rhs: R) -> Result<DataBox, BoxError> {
        self.compare(rhs, CompareOp::Lt)
    }

    pub fn le<R: BoxOperand>(&self, rhs: R) -> Result<DataBox, BoxError> {
        self.compare(rhs, CompareOp::Le)
    }

    pub fn gt<R: BoxOperand>(&self, rhs: R) -> Result<DataBox, BoxError> {
        self.compare(rhs, CompareOp::Gt)
    }

    pub fn ge<R: BoxOperand>(&self, rhs: R) -> Result<DataBox, BoxError> {
        self.compare(rhs, CompareOp::Ge)
    }

    pub fn eq<R: BoxOperand>(&self, rhs: R) -> Result<DataBox, BoxError> {
        self.compare(rhs, CompareOp::Eq)
    }

    pub fn ne<R: BoxOperand>(&self, rhs: R) -> Result<DataBox, BoxError> {
        self.compare(rhs, CompareOp::Ne)
    }

    pub fn all(&self) -> Result<bool, BoxError> {
        self.read()?.all()
    }

    pub fn any(&self) -> Result<bool, BoxError> {
        self.read()?.any()
    }

    pub fn count(&self) -> Result<usize, BoxError> {
        self.read()?.count()
    }

    pub fn diffs(&self, slices: &[BoxSlice]) -> Result<Vec<u32>, BoxError> {
        self.read()?.diffs(slices)
    }

    pub fn slice(&self, slices: &[BoxSlice]) -> Result<DataBox, BoxError> {
        Ok(Self::from_data(self.read()?.slice(slices)?))
    }

    pub fn slice_text(&self, text: &str) -> Result<DataBox, BoxError> {
        Ok(Self::from_data(self.read()?.slice_text(text)?))
    }

    /// Copies the selection into `dest`, reusing its storage where it fits.
    pub fn slice_to(&self, dest: &mut DataBox, slices: &[BoxSlice]) -> Result<(), BoxError> {
        if self.is_alias_of(dest) {
            let sliced = self.read()?.slice(slices)?;
            return dest.write()?.copy_from(&sliced);
        }
        let src = self.read()?;
        src.slice_to(&mut dest.write_or_create(), slices)
    }

    pub fn info(&self) -> Vec<u8> {
        self.read_or(Vec::new(), |d| d.info().to_vec())
    }

    pub fn info_string(&self) -> Option<String> {
        self.read_or(None, |d| d.info_str().map(str::to_owned))
    }

    pub fn set_info(&mut self, info: &[u8]) {
        self.write_or_create().checked_assign_info(info);
    }

    pub fn set_info_str(&mut self, info: &str) {
        self.set_info(info.as_bytes());
    }

    pub fn get_opaque<T: OpaqueValue>(&self) -> Result<T, BoxError> {
        Ok(self.read()?.get_opaque())
    }

    pub fn set_opaque<T: OpaqueValue>(&mut self, value: T) {
        self.write_or_create().set_opaque(value);
    }

    pub fn set_opaque_pointer(&mut self, ptr: *mut c_void, deleter: Option<OpaqueDeleter>) {
        self.write_or_create().set_opaque_pointer(ptr, deleter);
    }

    pub fn encode_with<B: PacketBuilder>(&self, builder: &mut B) -> Result<(), BoxError> {
        let data = self.read()?;
        builder.build(&data)
    }

    pub fn encode(&self) -> Result<Vec<u8>, BoxError> {
        let mut codec = BinaryCodec::new();
        self.encode_with(&mut codec)?;
        Ok(codec.into_bytes())
    }

    pub fn encode_to_json(&self) -> Result<String, BoxError> {
        let mut codec = JsonCodec::new();
        self.encode_with(&mut codec)?;
        Ok(codec.into_string())
    }

    /// Overwrites the storage from `bytes`. An empty handle only gains
    /// storage once the bytes parse.
    pub fn decode_with<P: PacketParser>(
        &mut self,
        parser: &P,
        bytes: &[u8],
    ) -> Result<(), BoxError> {
        if !self.exists() {
            *self = Self::from_data(parser.parse(bytes)?);
            return Ok(());
        }
        let mut data = self.write()?;
        parser.parse_into(bytes, &mut data)
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        self.decode_with(&BinaryCodec::new(), bytes)
    }

    pub fn decode_from_json(&mut self, text: &str) -> Result<(), BoxError> {
        self.decode_with(&JsonCodec::new(), text.as_bytes())
    }
}

impl From<BoxData> for DataBox {
    fn from(data: BoxData) -> Self {
        Self::from_data(data)
    }
}

impl fmt::Debug for DataBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Some(base) => f
                .debug_tuple("DataBox")
                .field(&*base.read().expect_lock("box data"))
                .finish(),
            None => f.write_str("DataBox(empty)"),
        }
    }
}
