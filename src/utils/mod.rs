#[macro_use]
pub mod macros;

pub mod error;
pub mod expect_msg;
pub mod math;
