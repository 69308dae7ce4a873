use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use log::debug;

use crate::element::{DeviceExt, DeviceTag};
use crate::utils::error::BoxError;

use super::allocator::{DeviceAllocator, HostAccess, allocator_for};

/// An owned allocation on one device.
///
/// The buffer remembers the allocator that produced it and returns the memory
/// to it on drop. Capacity is fixed for the lifetime of the buffer.
pub struct DeviceBuffer {
    ptr: NonNull<u8>,
    capacity: usize,
    device: DeviceTag,
    ext: DeviceExt,
    access: HostAccess,
    allocator: Arc<dyn DeviceAllocator>,
}

// SAFETY: the allocation is exclusively owned by this value and only reached
// through `&self`/`&mut self`, so the usual borrow rules serialise access.
unsafe impl Send for DeviceBuffer {}
unsafe impl Sync for DeviceBuffer {}

impl DeviceBuffer {
    pub fn allocate(device: DeviceTag, ext: DeviceExt, bytes: usize) -> Result<Self, BoxError> {
        let ext = ext.normalized_for(device);
        let allocator = allocator_for(device)?;
        let ptr = allocator.allocate(device, ext, bytes)?;
        let access = allocator.host_access();

        if access == HostAccess::Direct {
            // SAFETY: fresh allocation of `bytes` bytes that the host can address.
            unsafe { ptr.as_ptr().write_bytes(0, bytes) };
        }

        debug!("Allocated {} bytes on {} ({:?})", bytes, device, access);

        Ok(Self {
            ptr,
            capacity: bytes,
            device,
            ext,
            access,
            allocator,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn device(&self) -> DeviceTag {
        self.device
    }

    pub fn ext(&self) -> DeviceExt {
        self.ext
    }

    pub fn host_access(&self) -> HostAccess {
        self.access
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn check_host_access(&self) -> Result<(), BoxError> {
        match self.access {
            HostAccess::Direct => Ok(()),
            HostAccess::Staged => Err(BoxError::Unsupported(format!(
                "Host access to {} memory",
                self.device
            ))),
        }
    }

    pub fn as_slice(&self) -> Result<&[u8], BoxError> {
        self.check_host_access()?;
        // SAFETY: host visible, initialised on allocation and `capacity` long.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) })
    }

    pub fn as_mut_slice(&mut self) -> Result<&mut [u8], BoxError> {
        self.check_host_access()?;
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) })
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        debug!("Releasing {} bytes on {}", self.capacity, self.device);
        // SAFETY: `ptr` came from this allocator with these exact arguments.
        unsafe {
            self.allocator
                .deallocate(self.device, self.ext, self.ptr, self.capacity)
        };
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device", &self.device)
            .field("capacity", &self.capacity)
            .field("access", &self.access)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_support::register_accel_a;
    use crate::utils::error::ErrorKind;

    #[test]
    fn cpu_buffer_is_zeroed_and_writable() {
        let mut buffer = DeviceBuffer::allocate(DeviceTag::Cpu, DeviceExt::ZERO, 16).unwrap();
        assert_eq!(buffer.capacity(), 16);
        assert!(buffer.as_slice().unwrap().iter().all(|&b| b == 0));

        buffer.as_mut_slice().unwrap()[3] = 9;
        assert_eq!(buffer.as_slice().unwrap()[3], 9);
    }

    #[test]
    fn ext_is_normalised_for_cpu() {
        let buffer =
            DeviceBuffer::allocate(DeviceTag::Cpu, DeviceExt::new(4, 5, 6), 8).unwrap();
        assert_eq!(buffer.ext(), DeviceExt::ZERO);
    }

    #[test]
    fn registered_accelerator_keeps_ext() {
        register_accel_a();
        let ext = DeviceExt::new(1, 0, 0);
        let buffer = DeviceBuffer::allocate(DeviceTag::AccelA, ext, 8).unwrap();
        assert_eq!(buffer.device(), DeviceTag::AccelA);
        assert_eq!(buffer.ext(), ext);
    }

    #[test]
    fn none_device_cannot_allocate() {
        let err = DeviceBuffer::allocate(DeviceTag::None, DeviceExt::ZERO, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgs);
    }
}
