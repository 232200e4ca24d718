//! Settlement routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, extractors::AuthUser, routes};
use divvy_core::balance::{BalanceService, FactStore, RecordSettlementInput, Scope, Settlement};
use divvy_db::SeaOrmFactStore;
use divvy_shared::AppError;
use divvy_shared::types::{GroupId, UserId};

/// Request body for recording a settlement.
#[derive(Debug, Deserialize)]
pub struct RecordSettlementRequest {
    /// The user receiving the payment.
    pub paid_to: UserId,
    /// Amount paid; must be positive.
    pub amount: Decimal,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// Creates the settlement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups/{group_id}/settlements", post(record_settlement))
        .route("/groups/{group_id}/settlements", get(list_settlements))
}

fn settlement_json(s: &Settlement) -> serde_json::Value {
    json!({
        "id": s.id,
        "group_id": s.group_id,
        "paid_by": s.paid_by,
        "paid_by_name": s.paid_by_profile.as_ref().map(|p| p.full_name.clone()),
        "paid_to": s.paid_to,
        "paid_to_name": s.paid_to_profile.as_ref().map(|p| p.full_name.clone()),
        "amount": s.amount,
        "notes": s.notes,
        "created_at": s.created_at,
    })
}

/// POST `/groups/{group_id}/settlements` - Record a payment made outside
/// the app. The caller is always the payer. Responds with the appended
/// settlement plus the group's recomputed balances.
async fn record_settlement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<uuid::Uuid>,
    Json(payload): Json<RecordSettlementRequest>,
) -> impl IntoResponse {
    let group_id = GroupId::from_uuid(group_id);
    let service = BalanceService::new(SeaOrmFactStore::new((*state.db).clone()));

    let input = RecordSettlementInput {
        group_id,
        paid_by: auth.user_id(),
        paid_to: payload.paid_to,
        amount: payload.amount,
        notes: payload.notes,
    };

    match service.record_settlement(input).await {
        Ok(recorded) => {
            info!(
                settlement_id = %recorded.settlement.id,
                group_id = %group_id,
                paid_by = %auth.user_id(),
                paid_to = %recorded.settlement.paid_to,
                "Settlement recorded"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "settlement": settlement_json(&recorded.settlement),
                    "balances": recorded.balances,
                })),
            )
                .into_response()
        }
        Err(e) => routes::balance_error(&e),
    }
}

/// GET `/groups/{group_id}/settlements` - List a group's settlements.
async fn list_settlements(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let group_id = GroupId::from_uuid(group_id);
    let store = SeaOrmFactStore::new((*state.db).clone());

    if let Err(response) = routes::require_membership(&store, group_id, auth.user_id()).await {
        return response;
    }

    match store
        .list_settlements(auth.user_id(), Scope::Group(group_id))
        .await
    {
        Ok(settlements) => {
            let items: Vec<serde_json::Value> = settlements.iter().map(settlement_json).collect();
            Json(json!({ "settlements": items })).into_response()
        }
        Err(e) => {
            error!(error = %e, group_id = %group_id, "Failed to list settlements");
            routes::app_error(&AppError::Store(e.to_string()))
        }
    }
}
