//! JSON content negotiation.

use axum::{
    extract::Request,
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;

const JSON: &str = "application/json";

/// Reject requests whose `Accept` header does not allow JSON (406).
pub async fn require_json_accept(request: Request, next: Next) -> Response {
    if !accepts_json(request.headers()) {
        return AppError::NotAcceptable.into_response();
    }
    next.run(request).await
}

/// Reject body-bearing requests that are not declared as JSON (415).
pub async fn require_json_body(request: Request, next: Next) -> Response {
    let has_body = matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH);
    if has_body && !is_json_content_type(request.headers()) {
        return AppError::UnsupportedMediaType.into_response();
    }
    next.run(request).await
}

fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(media_type)
        .any(|range| {
            range.eq_ignore_ascii_case(JSON)
                || range == "*/*"
                || range.eq_ignore_ascii_case("application/*")
        })
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| media_type(v).eq_ignore_ascii_case(JSON))
        .unwrap_or(false)
}

/// Media type without parameters, e.g. `application/json; charset=utf-8` -> `application/json`.
fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or("").trim()
}
