//! Expense routes.
//!
//! Expense creation and editing always writes the full split set in one
//! transaction, so the shares-sum-to-amount invariant holds for every
//! persisted expense.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, extractors::AuthUser, routes};
use divvy_core::split::{self, SplitError};
use divvy_db::entities::{expense_splits, expenses};
use divvy_db::repositories::{ExpenseRepository, NewExpense};
use divvy_db::SeaOrmFactStore;
use divvy_shared::AppError;
use divvy_shared::types::{ExpenseId, GroupId, UserId};

/// How the expense amount is divided across participants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "split_mode", rename_all = "snake_case")]
pub enum SplitSpec {
    /// Divide equally; leftover cents go to the first participants.
    Equal {
        /// Users sharing the expense.
        participants: Vec<UserId>,
    },
    /// Divide by percentages that must sum to 100.
    Percentage {
        /// Per-user percentages.
        shares: Vec<PercentageShare>,
    },
    /// Caller provides the exact amounts.
    Exact {
        /// Per-user amounts.
        shares: Vec<ExactShare>,
    },
}

/// One participant's percentage of the expense.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PercentageShare {
    /// The participating user.
    pub user_id: UserId,
    /// Percentage of the total, 0-100.
    pub percentage: Decimal,
}

/// One participant's exact share of the expense.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExactShare {
    /// The participating user.
    pub user_id: UserId,
    /// The owed amount.
    pub amount: Decimal,
}

/// Request body for creating or replacing an expense.
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    /// Total amount paid; must be positive.
    pub amount: Decimal,
    /// Currency code. Defaults to the deployment currency.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Optional description.
    pub description: Option<String>,
    /// The date of the expense.
    pub expense_date: NaiveDate,
    /// Who paid. Defaults to the caller.
    pub paid_by: Option<UserId>,
    /// How to divide the amount.
    #[serde(flatten)]
    pub split: SplitSpec,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups/{group_id}/expenses", post(create_expense))
        .route("/groups/{group_id}/expenses", get(list_expenses))
        .route("/groups/{group_id}/expenses/{expense_id}", put(update_expense))
}

/// Resolves a split spec into concrete per-user share amounts.
fn resolve_shares(
    amount: Decimal,
    split: SplitSpec,
) -> Result<Vec<(UserId, Decimal)>, SplitError> {
    if amount <= Decimal::ZERO {
        return Err(SplitError::NonPositiveAmount(amount));
    }
    match split {
        SplitSpec::Equal { participants } => {
            if participants.is_empty() {
                return Err(SplitError::NoParticipants);
            }
            let shares = split::equal_shares(amount, participants.len());
            Ok(participants.into_iter().zip(shares).collect())
        }
        SplitSpec::Percentage { shares } => {
            let percentages: Vec<Decimal> = shares.iter().map(|s| s.percentage).collect();
            let amounts = split::percentage_shares(amount, &percentages)?;
            Ok(shares.into_iter().map(|s| s.user_id).zip(amounts).collect())
        }
        SplitSpec::Exact { shares } => {
            let amounts: Vec<Decimal> = shares.iter().map(|s| s.amount).collect();
            split::validate_shares(amount, &amounts)?;
            Ok(shares.into_iter().map(|s| (s.user_id, s.amount)).collect())
        }
    }
}

fn expense_json(expense: &expenses::Model, splits: &[expense_splits::Model]) -> serde_json::Value {
    json!({
        "id": expense.id,
        "group_id": expense.group_id,
        "paid_by": expense.paid_by,
        "amount": expense.amount,
        "currency": expense.currency,
        "description": expense.description,
        "expense_date": expense.expense_date,
        "created_at": expense.created_at,
        "updated_at": expense.updated_at,
        "splits": splits
            .iter()
            .map(|s| json!({
                "user_id": s.user_id,
                "amount": s.amount,
                "is_settled": s.is_settled,
            }))
            .collect::<Vec<_>>(),
    })
}

fn split_error_response(err: &SplitError) -> axum::response::Response {
    routes::app_error(&AppError::Validation(err.to_string()))
}

/// Checks that every share participant belongs to the group.
async fn require_participants(
    store: &SeaOrmFactStore,
    group_id: GroupId,
    shares: &[(UserId, Decimal)],
) -> Result<(), axum::response::Response> {
    let mut seen: Vec<UserId> = Vec::with_capacity(shares.len());
    for (user_id, _) in shares {
        if seen.contains(user_id) {
            continue;
        }
        seen.push(*user_id);
        if let Err(response) = routes::require_membership(store, group_id, *user_id).await {
            return Err(response);
        }
    }
    Ok(())
}

/// POST `/groups/{group_id}/expenses` - Create an expense with its splits.
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<uuid::Uuid>,
    Json(payload): Json<ExpenseRequest>,
) -> impl IntoResponse {
    let group_id = GroupId::from_uuid(group_id);
    let store = SeaOrmFactStore::new((*state.db).clone());

    if let Err(response) = routes::require_membership(&store, group_id, auth.user_id()).await {
        return response;
    }

    let paid_by = payload.paid_by.unwrap_or(auth.user_id());
    let shares = match resolve_shares(payload.amount, payload.split) {
        Ok(shares) => shares,
        Err(e) => return split_error_response(&e),
    };
    if let Err(response) = require_participants(&store, group_id, &shares).await {
        return response;
    }
    if paid_by != auth.user_id() {
        if let Err(response) = routes::require_membership(&store, group_id, paid_by).await {
            return response;
        }
    }

    let repo = ExpenseRepository::new((*state.db).clone());
    let input = NewExpense {
        group_id,
        paid_by,
        amount: payload.amount,
        currency: payload.currency,
        description: payload.description,
        expense_date: payload.expense_date,
        shares,
    };

    match repo.create_with_splits(input).await {
        Ok((expense, splits)) => {
            info!(
                expense_id = %expense.id,
                group_id = %group_id,
                paid_by = %paid_by,
                "Expense created"
            );
            (StatusCode::CREATED, Json(expense_json(&expense, &splits))).into_response()
        }
        Err(e) => {
            error!(error = %e, group_id = %group_id, "Failed to create expense");
            routes::app_error(&AppError::Internal(e.to_string()))
        }
    }
}

/// PUT `/groups/{group_id}/expenses/{expense_id}` - Replace an expense's
/// amount, description, date and splits atomically.
async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, expense_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(payload): Json<ExpenseRequest>,
) -> impl IntoResponse {
    let group_id = GroupId::from_uuid(group_id);
    let expense_id = ExpenseId::from_uuid(expense_id);
    let store = SeaOrmFactStore::new((*state.db).clone());

    if let Err(response) = routes::require_membership(&store, group_id, auth.user_id()).await {
        return response;
    }

    let shares = match resolve_shares(payload.amount, payload.split) {
        Ok(shares) => shares,
        Err(e) => return split_error_response(&e),
    };
    if let Err(response) = require_participants(&store, group_id, &shares).await {
        return response;
    }

    let repo = ExpenseRepository::new((*state.db).clone());
    match repo
        .update_with_splits(
            group_id,
            expense_id,
            payload.amount,
            payload.description,
            payload.expense_date,
            shares,
        )
        .await
    {
        Ok(Some((expense, splits))) => {
            info!(expense_id = %expense.id, group_id = %group_id, "Expense updated");
            Json(expense_json(&expense, &splits)).into_response()
        }
        Ok(None) => routes::app_error(&AppError::NotFound(
            "Expense not found in this group".to_string(),
        )),
        Err(e) => {
            error!(error = %e, expense_id = %expense_id, "Failed to update expense");
            routes::app_error(&AppError::Internal(e.to_string()))
        }
    }
}

/// GET `/groups/{group_id}/expenses` - List a group's expenses with splits.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let group_id = GroupId::from_uuid(group_id);
    let store = SeaOrmFactStore::new((*state.db).clone());

    if let Err(response) = routes::require_membership(&store, group_id, auth.user_id()).await {
        return response;
    }

    let repo = ExpenseRepository::new((*state.db).clone());
    match repo.list_for_group(group_id).await {
        Ok(rows) => {
            let items: Vec<serde_json::Value> = rows
                .iter()
                .map(|(expense, splits)| expense_json(expense, splits))
                .collect();
            Json(json!({ "expenses": items })).into_response()
        }
        Err(e) => {
            error!(error = %e, group_id = %group_id, "Failed to list expenses");
            routes::app_error(&AppError::Internal(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn user() -> UserId {
        UserId::new()
    }

    #[test]
    fn test_split_spec_equal_from_json() {
        let (a, b) = (user(), user());
        let body = json!({
            "amount": "30.00",
            "expense_date": "2026-03-14",
            "split_mode": "equal",
            "participants": [a, b],
        });
        let request: ExpenseRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.amount, dec!(30));
        assert_eq!(request.currency, "USD");
        assert_eq!(
            request.split,
            SplitSpec::Equal {
                participants: vec![a, b]
            }
        );
    }

    #[test]
    fn test_split_spec_percentage_from_json() {
        let a = user();
        let body = json!({
            "amount": 50,
            "expense_date": "2026-03-14",
            "split_mode": "percentage",
            "shares": [{ "user_id": a, "percentage": "100" }],
        });
        let request: ExpenseRequest = serde_json::from_value(body).unwrap();
        assert_eq!(
            request.split,
            SplitSpec::Percentage {
                shares: vec![PercentageShare {
                    user_id: a,
                    percentage: dec!(100)
                }]
            }
        );
    }

    #[test]
    fn test_unknown_split_mode_rejected() {
        let body = json!({
            "amount": 50,
            "expense_date": "2026-03-14",
            "split_mode": "random",
            "participants": [],
        });
        assert!(serde_json::from_value::<ExpenseRequest>(body).is_err());
    }

    #[test]
    fn test_resolve_equal_shares_sums_to_amount() {
        let users = vec![user(), user(), user()];
        let shares = resolve_shares(
            dec!(100),
            SplitSpec::Equal {
                participants: users.clone(),
            },
        )
        .unwrap();

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0], (users[0], dec!(33.34)));
        let total: Decimal = shares.iter().map(|(_, a)| *a).sum();
        assert_eq!(total, dec!(100));
    }

    #[test]
    fn test_resolve_exact_shares_must_sum() {
        let result = resolve_shares(
            dec!(100),
            SplitSpec::Exact {
                shares: vec![
                    ExactShare { user_id: user(), amount: dec!(60) },
                    ExactShare { user_id: user(), amount: dec!(30) },
                ],
            },
        );
        assert!(matches!(result, Err(SplitError::SharesMismatch { .. })));
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-12.50))]
    fn test_resolve_rejects_non_positive_amount(#[case] amount: Decimal) {
        let result = resolve_shares(
            amount,
            SplitSpec::Equal {
                participants: vec![user()],
            },
        );
        assert!(matches!(result, Err(SplitError::NonPositiveAmount(_))));
    }

    #[test]
    fn test_resolve_rejects_empty_participants() {
        let result = resolve_shares(dec!(10), SplitSpec::Equal { participants: vec![] });
        assert!(matches!(result, Err(SplitError::NoParticipants)));
    }
}
