pub mod data_box;

pub use data_box::{BoxOperand, DataBox};
