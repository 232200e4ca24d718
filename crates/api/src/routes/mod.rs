//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::AppState;
use divvy_core::balance::{BalanceError, FactStore};
use divvy_db::SeaOrmFactStore;
use divvy_shared::AppError;
use divvy_shared::types::{GroupId, UserId};

pub mod balances;
pub mod expenses;
pub mod health;
pub mod settlements;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(balances::routes())
        .merge(expenses::routes())
        .merge(settlements::routes())
}

/// Builds a JSON error response in the API's standard shape.
pub(crate) fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

/// Maps an application error onto an HTTP response.
///
/// Server-side failures get a masked message; client errors pass their
/// message through.
pub(crate) fn app_error(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if status.is_server_error() {
        "An error occurred".to_string()
    } else {
        err.to_string()
    };
    error_response(status, err.error_code(), &message)
}

/// Maps a domain balance error onto an HTTP response.
///
/// Store failures are logged and masked; validation errors pass their
/// message through.
pub(crate) fn balance_error(err: &BalanceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, "Balance operation failed");
        return error_response(status, "internal_error", "An error occurred");
    }
    error_response(status, err.error_code(), &err.to_string())
}

/// Rejects callers that are not members of the group.
///
/// Returns the ready-made error response so handlers can `return` it
/// directly.
pub(crate) async fn require_membership(
    store: &SeaOrmFactStore,
    group_id: GroupId,
    user_id: UserId,
) -> Result<(), Response> {
    match store.is_group_member(group_id, user_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(app_error(&AppError::Forbidden(
            "You are not a member of this group".to_string(),
        ))),
        Err(e) => {
            error!(error = %e, group_id = %group_id, "Database error checking membership");
            Err(app_error(&AppError::Store(e.to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_error_passes_message_through() {
        let response = app_error(&AppError::Validation("shares do not sum".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Validation error: shares do not sum");
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_403() {
        let response = app_error(&AppError::Forbidden("not a member".to_string()));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_server_error_masks_message() {
        let response = app_error(&AppError::Store("password=hunter2 in DSN".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "STORE_ERROR");
        assert_eq!(body["message"], "An error occurred");
    }
}
