pub mod allocator;
pub mod buffer;
pub mod config;

#[cfg(test)]
pub(crate) mod test_support;

pub use allocator::{
    CpuAllocator, DeviceAllocator, HostAccess, allocator_for, cpu_allocator, register_allocator,
    unregister_allocator,
};
pub use buffer::DeviceBuffer;
pub use config::{AllocatorConfig, DEFAULT_ALIGNMENT};
