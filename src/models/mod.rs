pub mod asset;
pub mod image;
pub mod shot;

pub use asset::*;
pub use image::*;
pub use shot::*;
