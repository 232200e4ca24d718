//! Balance service: the query facade and the settlement recorder.
//!
//! `calculate_balances` is the public entry point for balance computation;
//! `record_settlement` appends one settlement fact and re-runs the same
//! pipeline. Neither caches anything: every call is a fresh fold over the
//! facts the store returns at fetch time. Read-skew across concurrent
//! callers is accepted; balances are advisory and re-synced on next view.

use rust_decimal::Decimal;
use serde::Serialize;

use divvy_shared::types::{GroupId, UserId};

use super::aggregate::aggregate;
use super::error::BalanceError;
use super::facts::{FactSnapshot, Scope, Settlement};
use super::netting::net;
use super::store::{FactStore, NewSettlement};

/// Placeholder name for counterparties with no resolvable profile.
///
/// A profile gap degrades the display, never the balance: the amount is
/// still produced.
const UNKNOWN_NAME: &str = "Unknown";

/// Net signed amount between the viewing user and one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    /// The counterparty.
    pub counterparty_id: UserId,
    /// Counterparty display name ("Unknown" when unresolvable).
    pub counterparty_name: String,
    /// Counterparty email (empty when unresolvable).
    pub counterparty_email: String,
    /// Positive: counterparty owes viewer. Negative: viewer owes counterparty.
    pub amount: Decimal,
}

/// Result of a balance query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceResult {
    /// Per-counterparty balances, stable order within one call.
    pub balances: Vec<Balance>,
    /// Sum of positive balances.
    pub total_owed: Decimal,
    /// Sum of absolute negative balances.
    pub total_owe: Decimal,
}

/// Input for recording a settlement.
#[derive(Debug, Clone)]
pub struct RecordSettlementInput {
    /// The group the settlement belongs to.
    pub group_id: GroupId,
    /// The paying user (the authenticated caller).
    pub paid_by: UserId,
    /// The receiving user.
    pub paid_to: UserId,
    /// Amount paid; must be positive.
    pub amount: Decimal,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// Result of recording a settlement: the appended fact plus the freshly
/// recomputed group balances, so the caller observes the effect immediately.
#[derive(Debug, Clone)]
pub struct RecordedSettlement {
    /// The appended settlement fact.
    pub settlement: Settlement,
    /// Group-scoped balances recomputed after the append.
    pub balances: BalanceResult,
}

/// Balance service over a fact store.
#[derive(Debug, Clone)]
pub struct BalanceService<S> {
    store: S,
}

impl<S: FactStore> BalanceService<S> {
    /// Creates a new balance service.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Computes the viewer's net balances in the given scope.
    ///
    /// Fetches expenses and settlements concurrently (they are independent
    /// reads), folds them into deltas, nets and rounds, then resolves any
    /// counterparty profiles the facts did not carry inline. Repeated calls
    /// against an unchanged fact set return identical results.
    ///
    /// # Errors
    ///
    /// Returns `BalanceError::Store` if either fetch fails; no partial or
    /// zero-balance result is ever returned on failure.
    pub async fn calculate_balances(
        &self,
        viewer: UserId,
        scope: Scope,
    ) -> Result<BalanceResult, BalanceError> {
        let (expenses, settlements) = tokio::try_join!(
            self.store.list_expenses(viewer, scope),
            self.store.list_settlements(viewer, scope),
        )?;

        let snapshot = FactSnapshot { expenses, settlements };
        let netted = net(aggregate(viewer, &snapshot));

        let missing: Vec<UserId> = netted
            .balances
            .iter()
            .filter(|b| b.profile.is_none())
            .map(|b| b.counterparty_id)
            .collect();
        let mut resolved = if missing.is_empty() {
            std::collections::HashMap::new()
        } else {
            self.store.lookup_profiles(missing).await?
        };

        let balances = netted
            .balances
            .into_iter()
            .map(|b| {
                let profile = b.profile.or_else(|| resolved.remove(&b.counterparty_id));
                match profile {
                    Some(p) => Balance {
                        counterparty_id: b.counterparty_id,
                        counterparty_name: p.full_name,
                        counterparty_email: p.email,
                        amount: b.amount,
                    },
                    None => Balance {
                        counterparty_id: b.counterparty_id,
                        counterparty_name: UNKNOWN_NAME.to_string(),
                        counterparty_email: String::new(),
                        amount: b.amount,
                    },
                }
            })
            .collect();

        Ok(BalanceResult {
            balances,
            total_owed: netted.total_owed,
            total_owe: netted.total_owe,
        })
    }

    /// Validates and appends one settlement fact, then recomputes the
    /// group's balances so the caller observes the update immediately.
    ///
    /// The append and the recomputation are independent operations: a
    /// recompute failure surfaces as an error but does not roll back the
    /// already-persisted settlement.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any write is attempted, or
    /// `BalanceError::Store` if the store rejects the append.
    pub async fn record_settlement(
        &self,
        input: RecordSettlementInput,
    ) -> Result<RecordedSettlement, BalanceError> {
        if input.amount <= Decimal::ZERO {
            return Err(BalanceError::NonPositiveAmount(input.amount));
        }
        if input.paid_to == input.paid_by {
            return Err(BalanceError::SelfSettlement);
        }
        for user_id in [input.paid_by, input.paid_to] {
            if !self.store.is_group_member(input.group_id, user_id).await? {
                return Err(BalanceError::NotGroupMember {
                    user_id,
                    group_id: input.group_id,
                });
            }
        }

        let settlement = self
            .store
            .insert_settlement(NewSettlement {
                group_id: input.group_id,
                paid_by: input.paid_by,
                paid_to: input.paid_to,
                amount: input.amount,
                notes: input.notes,
            })
            .await?;

        let balances = self
            .calculate_balances(input.paid_by, Scope::Group(input.group_id))
            .await?;

        Ok(RecordedSettlement { settlement, balances })
    }
}
