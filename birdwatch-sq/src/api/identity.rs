//! Caller identity
//!
//! Login happens upstream; the proxy in front of the service forwards the
//! authenticated user's email in `X-User-Email`. The middleware here only
//! checks that it is present and hands it to handlers as [`CurrentUser`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::error::ApiError;
use crate::AppState;

/// Header carrying the authenticated user's email
pub const USER_HEADER: &str = "x-user-email";

/// Identity used when identity checks are disabled and no header is sent
pub const ANONYMOUS_USER: &str = "anonymous";

/// Identity of the user making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn email(&self) -> &str {
        &self.0
    }
}

fn user_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Identity middleware for user-facing routes
///
/// With `require_identity` off a missing header falls back to [`ANONYMOUS_USER`].
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match user_from_headers(request.headers()) {
        Some(email) => email,
        None if !state.require_identity => ANONYMOUS_USER.to_string(),
        None => {
            warn!("Rejected {} {}: no {} header", request.method(), request.uri().path(), USER_HEADER);
            return Err(ApiError::Unauthorized(format!("missing {} header", USER_HEADER)));
        }
    };

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("no user identity".to_string()))
    }
}
