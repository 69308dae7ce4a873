use std::ptr::NonNull;
use std::sync::Arc;

use crate::element::{DeviceExt, DeviceTag};
use crate::utils::error::BoxError;

use super::allocator::{DeviceAllocator, HostAccess, cpu_allocator, register_allocator};

/// Accelerator stand-in whose memory is ordinary host memory.
pub(crate) struct HostMirrorAllocator;

impl DeviceAllocator for HostMirrorAllocator {
    fn allocate(
        &self,
        device: DeviceTag,
        ext: DeviceExt,
        bytes: usize,
    ) -> Result<NonNull<u8>, BoxError> {
        cpu_allocator().allocate(device, ext, bytes)
    }

    unsafe fn deallocate(&self, device: DeviceTag, ext: DeviceExt, ptr: NonNull<u8>, bytes: usize) {
        unsafe { cpu_allocator().deallocate(device, ext, ptr, bytes) }
    }

    fn host_access(&self) -> HostAccess {
        HostAccess::Direct
    }
}

/// Makes AccelA host visible for the unit tests that need a second device.
pub(crate) fn register_accel_a() {
    let _ = register_allocator(DeviceTag::AccelA, Arc::new(HostMirrorAllocator));
}
