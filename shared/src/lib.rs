//! Shared types and models for the warehouse inventory service
//!
//! Domain models, partial-update types and pure validation rules used by the
//! backend and by any client that talks to its API.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
