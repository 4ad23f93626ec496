//! Register-level access to the I2C sensors on the payload board.

pub mod bmp280;
pub mod lis3mdl;
pub mod lsm6ds3;

pub use bmp280::Bmp280;
pub use lis3mdl::Lis3mdl;
pub use lsm6ds3::Lsm6ds3;
