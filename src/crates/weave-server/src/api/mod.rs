//! HTTP trigger surface.

pub mod error;
pub mod handlers;
pub mod routes;

use axum::http::HeaderMap;

/// Caller identity from the `x-user-id` header. Token validation is an
/// external collaborator; this boundary only trusts the header.
pub fn current_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
