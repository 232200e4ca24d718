//! Balance query routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::{AppState, extractors::AuthUser, routes};
use divvy_core::balance::{BalanceService, Scope};
use divvy_db::SeaOrmFactStore;
use divvy_shared::types::GroupId;

/// Creates the balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/balances", get(global_balances))
        .route("/groups/{group_id}/balances", get(group_balances))
}

/// GET /balances - Net balances across all of the caller's groups.
async fn global_balances(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let service = BalanceService::new(SeaOrmFactStore::new((*state.db).clone()));

    match service
        .calculate_balances(auth.user_id(), Scope::Global)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => routes::balance_error(&e),
    }
}

/// GET `/groups/{group_id}/balances` - Net balances within one group.
async fn group_balances(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let group_id = GroupId::from_uuid(group_id);
    let store = SeaOrmFactStore::new((*state.db).clone());

    if let Err(response) = routes::require_membership(&store, group_id, auth.user_id()).await {
        return response;
    }

    let service = BalanceService::new(store);
    match service
        .calculate_balances(auth.user_id(), Scope::Group(group_id))
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => routes::balance_error(&e),
    }
}
