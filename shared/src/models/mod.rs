//! Domain models for the warehouse inventory service

mod category;
mod movement;
mod sku;
mod supplier;

pub use category::*;
pub use movement::*;
pub use sku::*;
pub use supplier::*;
