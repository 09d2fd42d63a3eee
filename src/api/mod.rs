//! REST API module.
//!
//! Contains the favourites routes and the health probes.

mod favourites;
mod health;

pub use favourites::*;
pub use health::*;

use axum::Json;
use serde::Serialize;

/// Acknowledgement body for writes.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<T, crate::errors::AppError>;

/// Create an acknowledgement response.
pub fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}
