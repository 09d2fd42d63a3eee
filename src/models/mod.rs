//! Data models for the favourites service.

mod asset;
mod favourite;
pub mod validation;

pub use asset::*;
pub use favourite::*;
pub use validation::ValidationErrors;
