//! Cross-cutting request checks for the favourites routes.

mod negotiation;
mod rate_limit;

pub use negotiation::{require_json_accept, require_json_body};
pub use rate_limit::{rate_limit_layer, RateLimiter};
