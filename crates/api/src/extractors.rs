//! Request extractors.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde_json::json;

use divvy_shared::types::UserId;

/// Header carrying the authenticated user's id.
///
/// Authentication itself happens upstream (gateway or session layer); the
/// API trusts this header and only validates its shape.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user.
///
/// Use this in handlers to get the calling user's id:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let viewer = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl AuthUser {
    /// Returns the authenticated user's id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| unauthorized("x-user-id header is required"))?;

        header
            .parse::<UserId>()
            .map(AuthUser)
            .map_err(|_| unauthorized("x-user-id header must be a valid UUID"))
    }
}
