//! HTTP request handlers

pub mod catalog;
pub mod health;
pub mod inventory;
pub mod sku;
pub mod stock;

pub use catalog::*;
pub use health::*;
pub use inventory::*;
pub use sku::*;
pub use stock::*;
