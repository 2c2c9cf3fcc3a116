//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's identity, as asserted by the upstream gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Middleware that reads the `x-user-id` header and stores it in the request extensions.
///
/// The gateway in front of this service has already verified the caller; an
/// absent or blank header means the request bypassed it and gets a 401.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    debug!(user_id = %user_id, path = %req.uri().path(), "Authenticated request");
    req.extensions_mut().insert(UserId(user_id));

    Ok(next.run(req).await)
}
