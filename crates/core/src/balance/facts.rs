//! Fact types consumed by balance computation.
//!
//! Facts are immutable or append-only records: an `Expense` (one payment
//! event) carries its `ExpenseSplit`s joined in; a `Settlement` is a direct
//! payment between two users, independent of any specific expense. Balances
//! are derived from facts on every query and are never persisted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use divvy_shared::types::{ExpenseId, GroupId, SettlementId, UserId};

/// Fact-visibility boundary for a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// All facts visible to the authenticated caller, across every group.
    Global,
    /// Facts restricted to a single group.
    Group(GroupId),
}

/// Resolved display profile for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name.
    pub full_name: String,
    /// Email address.
    pub email: String,
}

/// One payment event, owned by a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// The expense ID.
    pub id: ExpenseId,
    /// The group this expense belongs to.
    pub group_id: GroupId,
    /// The user who paid.
    pub paid_by: UserId,
    /// Resolved profile of the payer, when the store joined it in.
    pub paid_by_profile: Option<Profile>,
    /// Total amount paid (positive).
    pub amount: Decimal,
    /// Currency code (fixed per deployment).
    pub currency: String,
    /// The date of the expense.
    pub expense_date: NaiveDate,
    /// The owed shares, created atomically with the expense.
    pub splits: Vec<ExpenseSplit>,
}

/// One user's owed share of an expense.
///
/// The sum of all split amounts for an expense equals the expense amount
/// within the rounding tolerance (see [`super::netting::epsilon`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSplit {
    /// The parent expense.
    pub expense_id: ExpenseId,
    /// The user who owes this share.
    pub user_id: UserId,
    /// The owed amount (non-negative).
    pub amount: Decimal,
    /// Whether this share has been retired at split granularity.
    /// Settled splits are excluded from aggregation entirely so they
    /// cannot double-count against settlement facts.
    pub is_settled: bool,
    /// Resolved profile for `user_id`, when the store joined it in.
    pub profile: Option<Profile>,
}

/// One direct payment from one user to another (append-only).
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// The settlement ID.
    pub id: SettlementId,
    /// The group this settlement belongs to.
    pub group_id: GroupId,
    /// The user who paid.
    pub paid_by: UserId,
    /// Resolved payer profile, when the store joined it in.
    pub paid_by_profile: Option<Profile>,
    /// The user who received the payment.
    pub paid_to: UserId,
    /// Resolved receiver profile, when the store joined it in.
    pub paid_to_profile: Option<Profile>,
    /// Amount paid (positive).
    pub amount: Decimal,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A consistent snapshot of the facts visible to one computation.
///
/// Balance computation is a pure function of a snapshot; re-fetching and
/// re-folding is the only way balances change.
#[derive(Debug, Clone, Default)]
pub struct FactSnapshot {
    /// Expenses with their splits joined in.
    pub expenses: Vec<Expense>,
    /// Settlements.
    pub settlements: Vec<Settlement>,
}
