//! Bearer-token authentication.
//!
//! The gate runs in exactly one mode, fixed at startup:
//! - `Signed`: a secret is configured, only HS256 tokens verified against it pass.
//! - `Unsigned`: no secret but unsigned tokens were explicitly allowed; only
//!   `alg: none` tokens pass. Meant for local development.
//! - `Locked`: neither; every request is refused.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::errors::AppError;
use crate::AppState;

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reasons a request fails authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingHeader,
    #[error("unauthorized")]
    Locked,
    #[error("invalid token: {0}")]
    Malformed(String),
    #[error("token algorithm {0} is not accepted")]
    DisallowedAlgorithm(String),
    #[error("invalid token: signature mismatch")]
    BadSignature,
    #[error("invalid token: token has expired")]
    Expired,
    #[error("token missing sub claim")]
    MissingSubject,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Deserialize)]
struct UnsignedHeader {
    alg: String,
}

enum AuthMode {
    Signed {
        decoding: DecodingKey,
        validation: Validation,
    },
    Unsigned,
    Locked,
}

/// Verifies bearer tokens and yields the subject as the user id.
pub struct AuthGate {
    mode: AuthMode,
}

impl AuthGate {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_deref().filter(|s| !s.is_empty());
        let mode = match (secret, config.allow_unsigned_tokens) {
            (Some(secret), _) => {
                let mut validation = Validation::new(Algorithm::HS256);
                // exp is checked when present but not demanded
                validation.required_spec_claims.clear();
                validation.validate_aud = false;
                AuthMode::Signed {
                    decoding: DecodingKey::from_secret(secret.as_bytes()),
                    validation,
                }
            }
            (None, true) => AuthMode::Unsigned,
            (None, false) => AuthMode::Locked,
        };
        Self { mode }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            AuthMode::Signed { .. } => "signed",
            AuthMode::Unsigned => "unsigned",
            AuthMode::Locked => "locked",
        }
    }

    /// Authenticate a raw `Authorization` header value.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<String, AuthError> {
        let token = extract_bearer_token(authorization).ok_or(AuthError::MissingHeader)?;

        let claims = match &self.mode {
            AuthMode::Locked => return Err(AuthError::Locked),
            AuthMode::Unsigned => decode_unsigned(token)?,
            AuthMode::Signed {
                decoding,
                validation,
            } => decode::<Claims>(token, decoding, validation)
                .map(|data| data.claims)
                .map_err(signed_error)?,
        };

        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(AuthError::MissingSubject),
        }
    }
}

/// Pull the token out of `Bearer <token>`; the scheme is case-insensitive.
fn extract_bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

fn decode_unsigned(token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Malformed("token must have three segments".into()));
    };

    let header: UnsignedHeader = decode_segment(header)?;
    if header.alg != "none" {
        return Err(AuthError::DisallowedAlgorithm(header.alg));
    }
    decode_segment(payload)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Malformed(e.to_string()))
}

fn signed_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidAlgorithm => AuthError::DisallowedAlgorithm("other than HS256".into()),
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed(err.to_string()),
    }
}

/// Issue a token for `user_id`: HS256 when a secret is given, otherwise unsigned.
pub fn issue_token(
    user_id: &str,
    secret: Option<&str>,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: Some(user_id.to_string()),
        iat: Some(now.timestamp()),
        exp: Some((now + ttl).timestamp()),
    };

    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        ),
        None => {
            let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
            let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
            Ok(format!("{}.{}.", header, payload))
        }
    }
}

/// Identity and correlation id of the request being served.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: String,
    pub request_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::Internal("request context missing".to_string()))
    }
}

/// Authentication layer: attaches a [`RequestContext`] or answers 401.
pub async fn auth_layer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.auth.authenticate(authorization) {
        Ok(user_id) => {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("n/a")
                .to_string();
            tracing::Span::current().record("user_id", tracing::field::display(&user_id));
            request.extensions_mut().insert(RequestContext {
                user_id,
                request_id,
            });
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(error = %e, mode = state.auth.mode_name(), "authentication failed");
            AppError::Unauthorized(e.to_string()).into_response()
        }
    }
}
