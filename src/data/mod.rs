pub mod box_data;
pub mod compare;
mod convert;
pub mod dims;
pub mod opaque;

pub use box_data::BoxData;
pub use compare::{CompareOp, Comparand};
pub use opaque::{OpaqueDeleter, OpaqueValue};
