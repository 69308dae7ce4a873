use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use log::{debug, warn};

use crate::element::{DeviceExt, DeviceTag};
use crate::utils::error::BoxError;
use crate::utils::expect_msg::ExpectLock;

use super::config::AllocatorConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostAccess {
    /// Buffer memory is addressable from the host; element access is direct.
    Direct,
    /// Buffer memory is device local; host reads and writes are refused.
    Staged,
}

/// Backend that owns raw memory for one or more devices.
///
/// Implementations are registered per `DeviceTag` with [`register_allocator`].
/// Zero-byte requests never reach an allocator.
pub trait DeviceAllocator: Send + Sync {
    fn allocate(
        &self,
        device: DeviceTag,
        ext: DeviceExt,
        bytes: usize,
    ) -> Result<NonNull<u8>, BoxError>;

    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `device`, `ext` and `bytes`, and must not be used afterwards.
    unsafe fn deallocate(&self, device: DeviceTag, ext: DeviceExt, ptr: NonNull<u8>, bytes: usize);

    fn host_access(&self) -> HostAccess {
        HostAccess::Staged
    }
}

/// Aligned host allocator backing `DeviceTag::Cpu`.
pub struct CpuAllocator {
    config: AllocatorConfig,
    allocated: AtomicUsize,
}

impl CpuAllocator {
    pub fn new() -> Self {
        Self {
            config: AllocatorConfig::default(),
            allocated: AtomicUsize::new(0),
        }
    }

    /// Allocator with a custom config. The config is validated here, so a
    /// bad alignment fails up front instead of on the first allocation.
    pub fn with_config(config: AllocatorConfig) -> Result<Self, BoxError> {
        Ok(Self {
            config: config.build()?,
            allocated: AtomicUsize::new(0),
        })
    }

    pub fn alignment(&self) -> usize {
        self.config.alignment
    }

    /// Bytes currently handed out and not yet returned.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    fn layout(&self, bytes: usize) -> Result<Layout, BoxError> {
        Layout::from_size_align(bytes, self.config.alignment).map_err(|_| BoxError::BadAlloc {
            device: DeviceTag::Cpu,
            bytes,
        })
    }
}

impl Default for CpuAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceAllocator for CpuAllocator {
    fn allocate(
        &self,
        device: DeviceTag,
        _ext: DeviceExt,
        bytes: usize,
    ) -> Result<NonNull<u8>, BoxError> {
        if bytes == 0 {
            return Err(BoxError::IllegalArgs(
                "Zero-byte allocation request".to_string(),
            ));
        }

        let layout = self.layout(bytes)?;
        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(BoxError::BadAlloc { device, bytes })?;

        self.allocated.fetch_add(bytes, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(
        &self,
        _device: DeviceTag,
        _ext: DeviceExt,
        ptr: NonNull<u8>,
        bytes: usize,
    ) {
        // SAFETY: the same size and alignment were validated in `allocate`.
        unsafe {
            let layout = Layout::from_size_align_unchecked(bytes, self.config.alignment);
            alloc::dealloc(ptr.as_ptr(), layout);
        }
        self.allocated.fetch_sub(bytes, Ordering::Relaxed);
    }

    fn host_access(&self) -> HostAccess {
        HostAccess::Direct
    }
}

type Registry = RwLock<HashMap<DeviceTag, Arc<dyn DeviceAllocator>>>;

static CPU_ALLOCATOR: OnceLock<Arc<CpuAllocator>> = OnceLock::new();
static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The process-wide host allocator.
pub fn cpu_allocator() -> Arc<CpuAllocator> {
    CPU_ALLOCATOR
        .get_or_init(|| Arc::new(CpuAllocator::new()))
        .clone()
}

/// Installs the backend for an accelerator device, returning the one it replaces.
///
/// Buffers keep a reference to the allocator that created them, so replacing
/// or removing an entry never strands live memory.
pub fn register_allocator(
    device: DeviceTag,
    allocator: Arc<dyn DeviceAllocator>,
) -> Result<Option<Arc<dyn DeviceAllocator>>, BoxError> {
    if !device.uses_ext() {
        return Err(BoxError::IllegalArgs(format!(
            "Cannot register an allocator for {}",
            device
        )));
    }

    let previous = registry()
        .write()
        .expect_lock("allocator registry")
        .insert(device, allocator);

    if previous.is_some() {
        warn!("Replaced allocator registered for {}", device);
    } else {
        debug!("Registered allocator for {}", device);
    }

    Ok(previous)
}

pub fn unregister_allocator(device: DeviceTag) -> Option<Arc<dyn DeviceAllocator>> {
    registry()
        .write()
        .expect_lock("allocator registry")
        .remove(&device)
}

/// Resolves the backend for `device`.
pub fn allocator_for(device: DeviceTag) -> Result<Arc<dyn DeviceAllocator>, BoxError> {
    match device {
        DeviceTag::None => Err(BoxError::IllegalArgs(
            "Device NONE has no storage".to_string(),
        )),
        DeviceTag::Cpu => Ok(cpu_allocator()),
        accel => registry()
            .read()
            .expect_lock("allocator registry")
            .get(&accel)
            .cloned()
            .ok_or_else(|| {
                BoxError::Unsupported(format!("No allocator registered for {}", accel))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_support::HostMirrorAllocator;
    use crate::utils::error::ErrorKind;

    #[test]
    fn cpu_allocations_are_aligned_and_zeroed() {
        let cpu = CpuAllocator::new();
        let ptr = cpu.allocate(DeviceTag::Cpu, DeviceExt::ZERO, 100).unwrap();
        assert_eq!(ptr.as_ptr() as usize % cpu.alignment(), 0);
        assert_eq!(cpu.allocated_bytes(), 100);

        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 100) };
        assert!(bytes.iter().all(|&b| b == 0));

        unsafe { cpu.deallocate(DeviceTag::Cpu, DeviceExt::ZERO, ptr, 100) };
        assert_eq!(cpu.allocated_bytes(), 0);
    }

    #[test]
    fn custom_config_is_validated() {
        let cpu = CpuAllocator::with_config(AllocatorConfig { alignment: 256 }).unwrap();
        assert_eq!(cpu.alignment(), 256);

        let err = CpuAllocator::with_config(AllocatorConfig { alignment: 48 })
            .err()
            .map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::IllegalArgs));
    }

    #[test]
    fn zero_byte_request_is_rejected() {
        let err = CpuAllocator::new()
            .allocate(DeviceTag::Cpu, DeviceExt::ZERO, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArgs);
    }

    #[test]
    fn host_devices_resolve_without_registration() {
        assert!(allocator_for(DeviceTag::Cpu).is_ok());
        assert_eq!(
            allocator_for(DeviceTag::None).err().map(|e| e.kind()),
            Some(ErrorKind::IllegalArgs)
        );
        assert!(register_allocator(DeviceTag::Cpu, Arc::new(CpuAllocator::new())).is_err());
    }

    #[test]
    fn registry_round_trip() {
        // AccelB is reserved for this test; other unit tests use AccelA.
        assert_eq!(
            allocator_for(DeviceTag::AccelB).err().map(|e| e.kind()),
            Some(ErrorKind::Unsupported)
        );

        let first = register_allocator(DeviceTag::AccelB, Arc::new(HostMirrorAllocator)).unwrap();
        assert!(first.is_none());
        let second = register_allocator(DeviceTag::AccelB, Arc::new(HostMirrorAllocator)).unwrap();
        assert!(second.is_some());

        assert_eq!(
            allocator_for(DeviceTag::AccelB).unwrap().host_access(),
            HostAccess::Direct
        );
        assert!(unregister_allocator(DeviceTag::AccelB).is_some());
        assert!(allocator_for(DeviceTag::AccelB).is_err());
    }
}
