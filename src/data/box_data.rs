use std::ffi::c_void;
use std::fmt;

use bytemuck::Pod;
use log::{debug, trace};
use rand::Rng;
use rand::distr::{Distribution, Uniform};

use crate::element::{DeviceExt, DeviceTag, Element, ElementType};
use crate::memory::{DeviceBuffer, HostAccess};
use crate::utils::error::BoxError;
use crate::utils::math::normal_sample;

use super::dims;
use super::opaque::{OpaqueDeleter, OpaqueSlot, OpaqueValue};

/// Storage behind a box: typed data buffer, shape, info bytes and an opaque word.
///
/// Buffers only grow. `resize` to a smaller shape on the same device keeps
/// the existing allocation, and `clear` forgets the shape without freeing.
#[derive(Default)]
pub struct BoxData {
    element_type: ElementType,
    device: DeviceTag,
    ext: DeviceExt,
    data: Option<DeviceBuffer>,
    element_count: u32,
    dims: Vec<u32>,
    info: Vec<u8>,
    opaque: OpaqueSlot,
}

impl BoxData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host array of `dims` filled from `values`.
    pub fn from_values<T: Element>(dims: &[u32], values: &[T]) -> Result<Self, BoxError> {
        let mut data = Self::new();
        data.resize(T::TYPE, DeviceTag::Cpu, DeviceExt::ZERO, dims)?;
        if values.len() != data.element_count() {
            return Err(BoxError::IllegalArgs(format!(
                "{} values do not fill shape {:?}",
                values.len(),
                dims
            )));
        }

        let width = T::TYPE.byte_width();
        for (chunk, &value) in data.as_bytes_mut()?.chunks_exact_mut(width).zip(values) {
            value.write_ne(chunk);
        }
        Ok(data)
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn device(&self) -> DeviceTag {
        self.device
    }

    pub fn ext(&self) -> DeviceExt {
        self.ext
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    pub fn dim(&self, axis: usize) -> Option<u32> {
        self.dims.get(axis).copied()
    }

    pub fn element_count(&self) -> usize {
        self.element_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Bytes covered by the current shape.
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.element_type.byte_width()
    }

    pub fn data_capacity_bytes(&self) -> usize {
        self.data.as_ref().map_or(0, DeviceBuffer::capacity)
    }

    pub fn dims_capacity_bytes(&self) -> usize {
        self.dims.capacity() * std::mem::size_of::<u32>()
    }

    pub fn info_capacity_bytes(&self) -> usize {
        self.info.capacity()
    }

    pub fn host_access(&self) -> Option<HostAccess> {
        self.data.as_ref().map(DeviceBuffer::host_access)
    }

    pub fn data_ptr(&self) -> Option<*const u8> {
        self.data.as_ref().map(DeviceBuffer::as_ptr)
    }

    pub fn is_same_device(&self, other: &BoxData) -> bool {
        self.device == other.device && self.ext == other.ext
    }

    pub fn resize(
        &mut self,
        element_type: ElementType,
        device: DeviceTag,
        ext: DeviceExt,
        dims: &[u32],
    ) -> Result<(), BoxError> {
        if device == DeviceTag::None {
            return Err(BoxError::IllegalArgs(
                "Cannot resize onto device NONE".to_string(),
            ));
        }
        if element_type == ElementType::None && !dims.is_empty() {
            return Err(BoxError::IllegalArgs(
                "Element type NONE cannot hold elements".to_string(),
            ));
        }
        if dims.contains(&0) {
            return Err(BoxError::IllegalArgs(format!(
                "Zero-length axis in shape {:?}",
                dims
            )));
        }

        let count = dims::num_elements(dims).ok_or_else(|| {
            BoxError::IllegalArgs(format!("Shape {:?} overflows the element count", dims))
        })?;
        let required = count as usize * element_type.byte_width();
        let ext = ext.normalized_for(device);

        let on_device = self
            .data
            .as_ref()
            .is_some_and(|buffer| buffer.device() == device && buffer.ext() == ext);

        if required > 0 {
            let fits = on_device && self.data_capacity_bytes() >= required;
            if !fits {
                // Allocate before dropping so a failure leaves the old state intact
                let buffer = DeviceBuffer::allocate(device, ext, required)?;
                self.data = Some(buffer);
            }
        } else if !on_device {
            self.data = None;
        }

        self.element_type = element_type;
        self.device = device;
        self.ext = ext;
        self.dims.clear();
        self.dims.extend_from_slice(dims);
        self.element_count = count;

        trace!(
            "Resized to {} {:?} on {} ({} bytes reserved)",
            element_type,
            dims,
            device,
            self.data_capacity_bytes()
        );
        Ok(())
    }

    pub fn resize_like(
        &mut self,
        element_type: ElementType,
        other: &BoxData,
    ) -> Result<(), BoxError> {
        self.resize(element_type, other.device, other.ext, &other.dims)
    }

    /// Resize on the device already in use, or the host if there is none yet.
    pub fn resize_same_device(
        &mut self,
        element_type: ElementType,
        dims: &[u32],
    ) -> Result<(), BoxError> {
        let device = match self.device {
            DeviceTag::None => DeviceTag::Cpu,
            device => device,
        };
        self.resize(element_type, device, self.ext, dims)
    }

    pub fn clear(&mut self) {
        self.dims.clear();
        self.element_count = 0;
    }

    /// Drops the data buffer and forgets type, device and shape. Info and the
    /// opaque slot are kept.
    pub(crate) fn detach_storage(&mut self) {
        self.data = None;
        self.dims.clear();
        self.element_type = ElementType::None;
        self.device = DeviceTag::None;
        self.ext = DeviceExt::ZERO;
        self.element_count = 0;
    }

    /// Frees every buffer and runs the opaque deleter.
    pub fn release(&mut self) {
        debug!(
            "Releasing box storage ({} data bytes, {} info bytes)",
            self.data_capacity_bytes(),
            self.info.capacity()
        );
        self.data = None;
        self.dims = Vec::new();
        self.info = Vec::new();
        self.opaque.release();
        self.element_type = ElementType::None;
        self.device = DeviceTag::None;
        self.ext = DeviceExt::ZERO;
        self.element_count = 0;
    }

    /// Logical data bytes. Fails with `Unsupported` on device-local memory.
    pub fn as_bytes(&self) -> Result<&[u8], BoxError> {
        let len = self.byte_len();
        match &self.data {
            Some(buffer) if len > 0 => Ok(&buffer.as_slice()?[..len]),
            _ => Ok(&[]),
        }
    }

    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8], BoxError> {
        let len = self.byte_len();
        match &mut self.data {
            Some(buffer) if len > 0 => Ok(&mut buffer.as_mut_slice()?[..len]),
            _ => Ok(&mut []),
        }
    }

    pub(crate) fn check_type<T: Element>(&self) -> Result<(), BoxError> {
        if self.element_type == T::TYPE {
            Ok(())
        } else {
            Err(BoxError::InvalidType(format!(
                "expected {}, found {}",
                T::TYPE,
                self.element_type
            )))
        }
    }

    pub fn as_slice<T: Element + Pod>(&self) -> Result<&[T], BoxError> {
        self.check_type::<T>()?;
        bytemuck::try_cast_slice(self.as_bytes()?)
            .map_err(|e| BoxError::Unsupported(format!("Typed view of data buffer: {}", e)))
    }

    pub fn as_mut_slice<T: Element + Pod>(&mut self) -> Result<&mut [T], BoxError> {
        self.check_type::<T>()?;
        bytemuck::try_cast_slice_mut(self.as_bytes_mut()?)
            .map_err(|e| BoxError::Unsupported(format!("Typed view of data buffer: {}", e)))
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, BoxError> {
        self.check_type::<T>()?;
        Ok(self
            .as_bytes()?
            .chunks_exact(T::TYPE.byte_width())
            .map(T::read_ne)
            .collect())
    }

    pub fn offset_of(&self, indices: &[u32]) -> Result<u32, BoxError> {
        if self.rank() == 0 {
            return Err(BoxError::Expired);
        }
        dims::checked_offset_of(&self.dims, indices)
    }

    pub fn stride_of(&self, axis: usize) -> Result<u32, BoxError> {
        if axis >= self.rank() {
            return Err(BoxError::IllegalArgs(format!(
                "Axis {} out of range for rank {}",
                axis,
                self.rank()
            )));
        }
        Ok(dims::stride_of(&self.dims, axis))
    }

    fn element_range(&self, offset: usize) -> Result<std::ops::Range<usize>, BoxError> {
        if offset >= self.element_count() {
            return Err(BoxError::IllegalArgs(format!(
                "Offset {} out of range for {} elements",
                offset,
                self.element_count()
            )));
        }
        let width = self.element_type.byte_width();
        Ok(offset * width..(offset + 1) * width)
    }

    pub fn get_offset<T: Element>(&self, offset: usize) -> Result<T, BoxError> {
        self.check_type::<T>()?;
        let range = self.element_range(offset)?;
        Ok(T::read_ne(&self.as_bytes()?[range]))
    }

    pub fn set_offset<T: Element>(&mut self, offset: usize, value: T) -> Result<(), BoxError> {
        self.check_type::<T>()?;
        let range = self.element_range(offset)?;
        value.write_ne(&mut self.as_bytes_mut()?[range]);
        Ok(())
    }

    pub fn get<T: Element>(&self, indices: &[u32]) -> Result<T, BoxError> {
        let offset = self.offset_of(indices)?;
        self.get_offset(offset as usize)
    }

    pub fn set<T: Element>(&mut self, indices: &[u32], value: T) -> Result<(), BoxError> {
        let offset = self.offset_of(indices)?;
        self.set_offset(offset as usize, value)
    }

    /// Copies `count` elements of raw bytes into the front of the data buffer.
    ///
    /// The caller states the type and device of `src`; both must match this box.
    pub fn assign_data(
        &mut self,
        element_type: ElementType,
        device: DeviceTag,
        ext: DeviceExt,
        count: usize,
        src: &[u8],
    ) -> Result<(), BoxError> {
        if element_type != self.element_type {
            return Err(BoxError::InvalidType(format!(
                "cannot assign {} data to a {} box",
                element_type, self.element_type
            )));
        }
        if device != self.device || ext.normalized_for(device) != self.ext {
            return Err(BoxError::ExDev(format!(
                "cannot assign {} data to a {} box",
                device, self.device
            )));
        }
        if count > self.element_count() {
            return Err(BoxError::IllegalArgs(format!(
                "{} elements exceed capacity of {}",
                count,
                self.element_count()
            )));
        }

        let len = count * element_type.byte_width();
        if src.len() < len {
            return Err(BoxError::IllegalArgs(format!(
                "Source holds {} bytes, {} required",
                src.len(),
                len
            )));
        }

        self.as_bytes_mut()?[..len].copy_from_slice(&src[..len]);
        Ok(())
    }

    /// Makes this box an equal copy of `other`, reusing capacity where possible.
    pub fn copy_from(&mut self, other: &BoxData) -> Result<(), BoxError> {
        let src = other.as_bytes()?;
        self.resize_like(other.element_type, other)?;
        self.assign_data(
            other.element_type,
            other.device,
            other.ext,
            other.element_count(),
            src,
        )?;
        self.checked_assign_info(&other.info);
        Ok(())
    }

    pub fn info(&self) -> &[u8] {
        &self.info
    }

    pub fn info_size(&self) -> usize {
        self.info.len()
    }

    pub fn info_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.info).ok()
    }

    /// Replaces the info bytes, growing the buffer only when needed.
    pub fn checked_assign_info(&mut self, src: &[u8]) {
        self.info.clear();
        self.info.extend_from_slice(src);
    }

    pub fn set_info_str(&mut self, info: &str) {
        self.checked_assign_info(info.as_bytes());
    }

    /// Empties the info bytes, keeping their capacity.
    pub fn clear_info(&mut self) {
        self.info.clear();
    }

    pub fn exists_data(&self) -> bool {
        self.element_count > 0
    }

    pub fn exists_dims(&self) -> bool {
        !self.dims.is_empty()
    }

    pub fn exists_info(&self) -> bool {
        !self.info.is_empty()
    }

    pub fn get_opaque<T: OpaqueValue>(&self) -> T {
        self.opaque.get()
    }

    pub fn set_opaque<T: OpaqueValue>(&mut self, value: T) {
        self.opaque.set(value);
    }

    /// Stores a pointer that `deleter` frees when the box is released or dropped.
    pub fn set_opaque_pointer(&mut self, ptr: *mut c_void, deleter: Option<OpaqueDeleter>) {
        self.opaque.set_owned(ptr, deleter);
    }

    /// The raw 64-bit word behind the opaque value.
    pub fn opaque_bits(&self) -> u64 {
        self.opaque.bits()
    }

    pub fn has_opaque_deleter(&self) -> bool {
        self.opaque.has_deleter()
    }

    pub fn clear_opaque(&mut self) {
        self.opaque.release();
    }

    pub fn fill<T: Element>(&mut self, value: T) -> Result<(), BoxError> {
        self.check_type::<T>()?;
        let width = T::TYPE.byte_width();
        for chunk in self.as_bytes_mut()?.chunks_exact_mut(width) {
            value.write_ne(chunk);
        }
        Ok(())
    }

    pub fn zeros(&mut self) -> Result<(), BoxError> {
        self.as_bytes_mut()?.fill(0);
        Ok(())
    }

    pub fn ones(&mut self) -> Result<(), BoxError> {
        for_element_type!(self.element_type, T => self.fill(T::one()), none => Err(
            BoxError::InvalidType("cannot fill a NONE box".to_string())
        ))
    }

    pub fn fill_random_uniform(&mut self, low: f64, high: f64) -> Result<(), BoxError> {
        self.fill_random_uniform_with(&mut rand::rng(), low, high)
    }

    pub fn fill_random_uniform_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        low: f64,
        high: f64,
    ) -> Result<(), BoxError> {
        let uniform = Uniform::new(low, high).map_err(|e| {
            BoxError::IllegalArgs(format!("Invalid uniform range [{}, {}): {}", low, high, e))
        })?;
        self.fill_floating(|| uniform.sample(&mut *rng))
    }

    pub fn fill_random_normal(&mut self, mean: f64, std_dev: f64) -> Result<(), BoxError> {
        self.fill_random_normal_with(&mut rand::rng(), mean, std_dev)
    }

    pub fn fill_random_normal_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        mean: f64,
        std_dev: f64,
    ) -> Result<(), BoxError> {
        if !(std_dev.is_finite() && std_dev >= 0.0) {
            return Err(BoxError::IllegalArgs(format!(
                "Invalid standard deviation {}",
                std_dev
            )));
        }
        self.fill_floating(|| normal_sample(&mut *rng, mean, std_dev))
    }

    fn fill_floating(&mut self, mut sample: impl FnMut() -> f64) -> Result<(), BoxError> {
        match self.element_type {
            ElementType::F32 => {
                for chunk in self.as_bytes_mut()?.chunks_exact_mut(4) {
                    (sample() as f32).write_ne(chunk);
                }
            }
            ElementType::F64 => {
                for chunk in self.as_bytes_mut()?.chunks_exact_mut(8) {
                    sample().write_ne(chunk);
                }
            }
            other => {
                return Err(BoxError::InvalidType(format!(
                    "random fill needs FLOAT32 or FLOAT64, found {}",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Independent copy of data, shape and info. The opaque value is copied
    /// but its deleter stays with this box.
    pub fn deep_clone(&self) -> Result<BoxData, BoxError> {
        let mut clone = BoxData::new();
        if self.device != DeviceTag::None {
            let src = self.as_bytes()?;
            clone.resize(self.element_type, self.device, self.ext, &self.dims)?;
            clone.as_bytes_mut()?.copy_from_slice(src);
        }
        clone.checked_assign_info(&self.info);
        clone.opaque = self.opaque.duplicate();
        Ok(clone)
    }

    /// Same bytes read as another type. A wider target is zero-filled past
    /// the copied bytes, a narrower one truncates.
    pub fn as_type(&self, element_type: ElementType) -> Result<BoxData, BoxError> {
        if element_type == ElementType::None {
            return Err(BoxError::InvalidType(
                "cannot reinterpret as NONE".to_string(),
            ));
        }
        if self.device == DeviceTag::None {
            return Err(BoxError::NotReady);
        }

        let src = self.as_bytes()?;
        let mut out = BoxData::new();
        out.resize(element_type, self.device, self.ext, &self.dims)?;

        let dst = out.as_bytes_mut()?;
        let len = src.len().min(dst.len());
        dst[..len].copy_from_slice(&src[..len]);
        dst[len..].fill(0);

        out.checked_assign_info(&self.info);
        Ok(out)
    }
}

impl Drop for BoxData {
    fn drop(&mut self) {
        self.opaque.release();
    }
}

impl fmt::Debug for BoxData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxData")
            .field("element_type", &self.element_type)
            .field("device", &self.device)
            .field("dims", &self.dims)
            .field("data_capacity", &self.data_capacity_bytes())
            .field("info_size", &self.info.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_support::register_accel_a;
    use crate::utils::error::ErrorKind;
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn host(ty: ElementType, dims: &[u32]) -> BoxData {
        let mut data = BoxData::new();
        data.resize(ty, DeviceTag::Cpu, DeviceExt::ZERO, dims).unwrap();
        data
    }

    #[test]
    fn resize_sets_metadata() {
        let data = host(ElementType::I32, &[2, 3]);
        assert_eq!(data.rank(), 2);
        assert_eq!(data.dims(), &[2, 3]);
        assert_eq!(data.element_count(), 6);
        assert_eq!(data.byte_len(), 24);
        assert!(data.data_capacity_bytes() >= 24);
    }

    #[test]
    fn shrinking_reuses_the_buffer() {
        let mut data = host(ElementType::F64, &[4, 4]);
        let ptr = data.data_ptr();
        let capacity = data.data_capacity_bytes();

        data.resize_same_device(ElementType::F64, &[2, 2]).unwrap();
        assert_eq!(data.data_ptr(), ptr);
        assert_eq!(data.data_capacity_bytes(), capacity);

        data.resize_same_device(ElementType::U8, &[100]).unwrap();
        assert_eq!(data.data_ptr(), ptr);

        data.resize_same_device(ElementType::F64, &[8, 8]).unwrap();
        assert!(data.data_capacity_bytes() >= 512);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut data = host(ElementType::U16, &[10]);
        let capacity = data.data_capacity_bytes();
        data.clear();
        data.clear();
        assert!(!data.exists_data());
        assert!(!data.exists_dims());
        assert_eq!(data.rank(), 0);
        assert_eq!(data.element_count(), 0);
        assert_eq!(data.data_capacity_bytes(), capacity);
    }

    #[test]
    fn resize_rejects_bad_requests() {
        let mut data = BoxData::new();
        let none = data.resize(ElementType::I8, DeviceTag::None, DeviceExt::ZERO, &[2]);
        assert_eq!(none.unwrap_err().kind(), ErrorKind::IllegalArgs);

        let zero = data.resize(ElementType::I8, DeviceTag::Cpu, DeviceExt::ZERO, &[2, 0]);
        assert_eq!(zero.unwrap_err().kind(), ErrorKind::IllegalArgs);

        let overflow =
            data.resize(ElementType::I8, DeviceTag::Cpu, DeviceExt::ZERO, &[u32::MAX, 3]);
        assert_eq!(overflow.unwrap_err().kind(), ErrorKind::IllegalArgs);
        assert_eq!(data.device(), DeviceTag::None);
    }

    #[test]
    fn moving_device_reallocates() {
        register_accel_a();
        let mut data = host(ElementType::I32, &[4]);
        data.resize(ElementType::I32, DeviceTag::AccelA, DeviceExt::new(1, 0, 0), &[4])
            .unwrap();
        assert_eq!(data.device(), DeviceTag::AccelA);
        assert_eq!(data.ext(), DeviceExt::new(1, 0, 0));
    }

    #[test]
    fn element_access_uses_axis_zero_fastest() {
        let mut data = BoxData::from_values(&[2, 3], &[0i32, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(data.get::<i32>(&[1, 0]).unwrap(), 1);
        assert_eq!(data.get::<i32>(&[0, 1]).unwrap(), 2);
        assert_eq!(data.get::<i32>(&[1, 2]).unwrap(), 5);

        data.set(&[0, 2], 40i32).unwrap();
        assert_eq!(data.get_offset::<i32>(4).unwrap(), 40);
        assert_eq!(
            data.get::<f32>(&[0, 0]).unwrap_err().kind(),
            ErrorKind::InvalidType
        );
        assert!(data.get::<i32>(&[2, 0]).is_err());
    }

    #[test]
    fn typed_slices_view_the_buffer() {
        let mut data = host(ElementType::F32, &[3]);
        data.as_mut_slice::<f32>().unwrap().copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(data.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0]);
        assert!(data.as_slice::<i32>().is_err());
    }

    #[test]
    fn assign_data_checks_type_and_device() {
        let mut data = host(ElementType::U8, &[4]);
        let bytes = [1u8, 2, 3];
        data.assign_data(ElementType::U8, DeviceTag::Cpu, DeviceExt::ZERO, 3, &bytes)
            .unwrap();
        assert_eq!(data.to_vec::<u8>().unwrap(), vec![1, 2, 3, 0]);

        let wrong_type =
            data.assign_data(ElementType::I8, DeviceTag::Cpu, DeviceExt::ZERO, 1, &bytes);
        assert_eq!(wrong_type.unwrap_err().kind(), ErrorKind::InvalidType);

        let wrong_device =
            data.assign_data(ElementType::U8, DeviceTag::AccelA, DeviceExt::ZERO, 1, &bytes);
        assert_eq!(wrong_device.unwrap_err().kind(), ErrorKind::ExDev);

        let too_many =
            data.assign_data(ElementType::U8, DeviceTag::Cpu, DeviceExt::ZERO, 5, &[0; 5]);
        assert_eq!(too_many.unwrap_err().kind(), ErrorKind::IllegalArgs);
    }

    #[test]
    fn info_grows_and_clears() {
        let mut data = BoxData::new();
        data.checked_assign_info(b"camera-0");
        assert_eq!(data.info_str(), Some("camera-0"));
        let capacity = data.info_capacity_bytes();

        data.checked_assign_info(b"cam");
        assert_eq!(data.info_size(), 3);
        assert_eq!(data.info_capacity_bytes(), capacity);

        data.checked_assign_info(&[]);
        assert_eq!(data.info_size(), 0);
        assert!(!data.exists_info());

        data.set_info_str("again");
        assert!(data.exists_info());
        data.clear_info();
        assert_eq!(data.info_capacity_bytes(), capacity);
        assert!(!data.exists_info());
    }

    #[test]
    fn fills() {
        let mut data = host(ElementType::I16, &[3]);
        data.ones().unwrap();
        assert_eq!(data.to_vec::<i16>().unwrap(), vec![1, 1, 1]);

        data.fill(-4i16).unwrap();
        assert_eq!(data.to_vec::<i16>().unwrap(), vec![-4, -4, -4]);

        data.zeros().unwrap();
        assert_eq!(data.to_vec::<i16>().unwrap(), vec![0, 0, 0]);
        assert!(data.fill(1.0f32).is_err());
    }

    #[test]
    fn random_fill_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut data = host(ElementType::F32, &[256]);
        data.fill_random_uniform_with(&mut rng, -1.0, 1.0).unwrap();
        assert!(
            data.as_slice::<f32>()
                .unwrap()
                .iter()
                .all(|v| (-1.0..1.0).contains(v))
        );

        data.fill_random_normal_with(&mut rng, 0.0, 1.0).unwrap();
        assert!(data.as_slice::<f32>().unwrap().iter().all(|v| v.is_finite()));

        let mut ints = host(ElementType::I32, &[2]);
        assert_eq!(
            ints.fill_random_uniform(0.0, 1.0).unwrap_err().kind(),
            ErrorKind::InvalidType
        );
        assert!(data.fill_random_uniform_with(&mut rng, 1.0, 1.0).is_err());
    }

    static CLONE_DELETES: AtomicUsize = AtomicUsize::new(0);

    fn count_clone_delete(_: *mut c_void) {
        CLONE_DELETES.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut data = BoxData::from_values(&[2], &[7u64, 8]).unwrap();
        data.checked_assign_info(b"meta");
        data.set_opaque_pointer(0x40 as *mut c_void, Some(count_clone_delete));

        let mut clone = data.deep_clone().unwrap();
        assert_ne!(clone.data_ptr(), data.data_ptr());
        assert_eq!(clone.to_vec::<u64>().unwrap(), vec![7, 8]);
        assert_eq!(clone.info(), b"meta");
        assert_eq!(clone.get_opaque::<usize>(), 0x40);
        assert_eq!(clone.opaque_bits(), 0x40);
        assert!(!clone.has_opaque_deleter());

        clone.set(&[0], 1u64).unwrap();
        assert_eq!(data.get::<u64>(&[0]).unwrap(), 7);

        drop(clone);
        assert_eq!(CLONE_DELETES.load(Ordering::SeqCst), 0);
        drop(data);
        assert_eq!(CLONE_DELETES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_frees_everything() {
        let mut data = host(ElementType::I64, &[8]);
        data.checked_assign_info(b"x");
        data.release();
        assert_eq!(data.data_capacity_bytes(), 0);
        assert_eq!(data.info_capacity_bytes(), 0);
        assert_eq!(data.element_type(), ElementType::None);
        assert_eq!(data.device(), DeviceTag::None);
    }

    #[test]
    fn as_type_reinterprets_bytes() {
        let data = BoxData::from_values(&[2], &[1.0f32, -2.0]).unwrap();
        let bits = data.as_type(ElementType::U32).unwrap();
        assert_eq!(
            bits.to_vec::<u32>().unwrap(),
            vec![1.0f32.to_bits(), (-2.0f32).to_bits()]
        );

        let wider = data.as_type(ElementType::F64).unwrap();
        let raw = wider.as_bytes().unwrap();
        assert_eq!(&raw[..8], data.as_bytes().unwrap());
        assert!(raw[8..].iter().all(|&b| b == 0));

        let narrower = data.as_type(ElementType::U8).unwrap();
        assert_eq!(narrower.as_bytes().unwrap(), &data.as_bytes().unwrap()[..2]);
        assert!(BoxData::new().as_type(ElementType::I8).is_err());
    }
}
