pub mod box_slice;
pub mod cursor;
mod slicing;

pub use box_slice::{BoxSlice, ResolvedRange};
pub use cursor::BoxCursor;
