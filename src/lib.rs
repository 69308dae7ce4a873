//! ndbox - Type-erased N-dimensional buffers with pluggable device storage
//!
//! A box couples a typed data buffer with its shape, a free-form info blob and
//! one opaque word of user data. Storage lives behind shared handles, buffers
//! only grow, and every box can be sliced, compared and serialised without
//! knowing its element type at compile time.

#[macro_use]
mod utils;

mod element;

mod memory;

mod data;

mod slice;

mod handle;

mod codec;

pub use codec::{
    BinaryCodec, BoxPacket, JsonCodec, PacketBuilder, PacketElement, PacketParser, PacketValues,
};
pub use data::{BoxData, Comparand, CompareOp, OpaqueDeleter, OpaqueValue, dims};
pub use element::{DeviceExt, DeviceTag, EXT_SIZE, Element, ElementType};
pub use handle::{BoxOperand, DataBox};
pub use memory::{
    AllocatorConfig, CpuAllocator, DEFAULT_ALIGNMENT, DeviceAllocator, DeviceBuffer, HostAccess,
    allocator_for, cpu_allocator, register_allocator, unregister_allocator,
};
pub use slice::{BoxCursor, BoxSlice, ResolvedRange};
pub use utils::error::{BoxError, CodecError, ErrorKind};
