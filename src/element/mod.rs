pub mod device;
pub mod element_type;

pub use device::{DeviceExt, DeviceTag, EXT_SIZE};
pub use element_type::{Element, ElementType};
