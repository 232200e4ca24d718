//! Property-based tests for the balance pipeline.
//!
//! Covered properties:
//! - Anti-symmetry: balance(A)[B] == -balance(B)[A] on the same snapshot
//! - Zero-sum: per-user net positions over a closed group sum to ~0
//! - Order independence: permuting fact collections changes nothing
//! - Idempotence: re-folding an unchanged snapshot is bit-identical
//! - Settlement effect: a settlement of X shifts the pairwise delta by X
//! - Negligible filtering: sub-cent balances never reach the output

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use divvy_shared::types::{ExpenseId, GroupId, SettlementId, UserId};

use super::aggregate::aggregate;
use super::facts::{Expense, ExpenseSplit, FactSnapshot, Settlement};
use super::netting::{epsilon, net};
use crate::split::equal_shares;

/// A generated expense: payer index, amount in cents, per-split settled flags.
type RawExpense = (usize, i64, Vec<bool>);
/// A generated settlement: payer index, receiver offset, amount in cents.
type RawSettlement = (usize, usize, i64);

fn amount_cents() -> impl Strategy<Value = i64> {
    1i64..1_000_000
}

/// Builds a snapshot over `users` from generated raw facts. Every expense is
/// split equally across all users so the fact set stays closed.
fn build_snapshot(
    users: &[UserId],
    raw_expenses: &[RawExpense],
    raw_settlements: &[RawSettlement],
) -> FactSnapshot {
    let group = GroupId::from_uuid(uuid::Uuid::nil());
    let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

    let expenses = raw_expenses
        .iter()
        .map(|(payer_idx, cents, settled)| {
            let paid_by = users[payer_idx % users.len()];
            let amount = Decimal::new(*cents, 2);
            let shares = equal_shares(amount, users.len());
            let id = ExpenseId::new();
            Expense {
                id,
                group_id: group,
                paid_by,
                paid_by_profile: None,
                amount,
                currency: "USD".to_string(),
                expense_date: date,
                splits: users
                    .iter()
                    .zip(shares)
                    .enumerate()
                    .map(|(i, (user_id, share))| ExpenseSplit {
                        expense_id: id,
                        user_id: *user_id,
                        amount: share,
                        is_settled: settled.get(i).copied().unwrap_or(false),
                        profile: None,
                    })
                    .collect(),
            }
        })
        .collect();

    let settlements = raw_settlements
        .iter()
        .map(|(payer_idx, receiver_offset, cents)| {
            let paid_by_idx = payer_idx % users.len();
            // Offset by at least one position so payer != receiver.
            let paid_to_idx = (paid_by_idx + 1 + receiver_offset % (users.len() - 1)) % users.len();
            Settlement {
                id: SettlementId::new(),
                group_id: group,
                paid_by: users[paid_by_idx],
                paid_by_profile: None,
                paid_to: users[paid_to_idx],
                paid_to_profile: None,
                amount: Decimal::new(*cents, 2),
                notes: None,
                created_at: Utc::now(),
            }
        })
        .collect();

    FactSnapshot { expenses, settlements }
}

fn snapshot_strategy() -> impl Strategy<Value = (Vec<UserId>, FactSnapshot)> {
    (
        2usize..=4,
        prop::collection::vec(
            (0usize..4, amount_cents(), prop::collection::vec(any::<bool>(), 4)),
            0..6,
        ),
        prop::collection::vec((0usize..4, 0usize..4, amount_cents()), 0..4),
    )
        .prop_map(|(user_count, raw_expenses, raw_settlements)| {
            let users: Vec<UserId> = (0..user_count).map(|_| UserId::new()).collect();
            let snapshot = build_snapshot(&users, &raw_expenses, &raw_settlements);
            (users, snapshot)
        })
}

/// Net rounded amount `viewer` holds against `counterparty`, zero if filtered.
fn pair_amount(viewer: UserId, counterparty: UserId, snapshot: &FactSnapshot) -> Decimal {
    net(aggregate(viewer, snapshot))
        .balances
        .iter()
        .find(|b| b.counterparty_id == counterparty)
        .map_or(Decimal::ZERO, |b| b.amount)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any two users on the same snapshot, balances mirror with
    /// opposite signs.
    #[test]
    fn prop_anti_symmetry((users, snapshot) in snapshot_strategy()) {
        for a in &users {
            for b in &users {
                if a == b {
                    continue;
                }
                prop_assert_eq!(
                    pair_amount(*a, *b, &snapshot),
                    -pair_amount(*b, *a, &snapshot),
                    "anti-symmetry violated between {} and {}", a, b
                );
            }
        }
    }

    /// Over a closed set of users, every user's net position sums to zero
    /// (within one epsilon per user pair of rounding slack).
    #[test]
    fn prop_zero_sum((users, snapshot) in snapshot_strategy()) {
        let mut total = Decimal::ZERO;
        let mut pairs = 0u32;
        for viewer in &users {
            let result = net(aggregate(*viewer, &snapshot));
            pairs += u32::try_from(result.balances.len()).unwrap_or(0);
            total += result.total_owed - result.total_owe;
        }
        let slack = epsilon() * Decimal::from(pairs.max(1));
        prop_assert!(
            total.abs() <= slack,
            "conservation violated: residual {} exceeds slack {}", total, slack
        );
    }

    /// Permuting the fact collections never changes the output.
    #[test]
    fn prop_order_independence((users, snapshot) in snapshot_strategy()) {
        let mut shuffled = snapshot.clone();
        shuffled.expenses.reverse();
        shuffled.settlements.reverse();

        for viewer in &users {
            prop_assert_eq!(
                net(aggregate(*viewer, &snapshot)),
                net(aggregate(*viewer, &shuffled))
            );
        }
    }

    /// Re-folding an unchanged snapshot yields bit-identical results.
    #[test]
    fn prop_idempotence((users, snapshot) in snapshot_strategy()) {
        for viewer in &users {
            let first = net(aggregate(*viewer, &snapshot));
            let second = net(aggregate(*viewer, &snapshot));
            prop_assert_eq!(first, second);
        }
    }

    /// Recording a settlement of X from A to B shifts A's raw delta toward
    /// B by exactly +X, holding all other facts fixed.
    #[test]
    fn prop_settlement_effect(
        (users, snapshot) in snapshot_strategy(),
        cents in amount_cents(),
    ) {
        let a = users[0];
        let b = users[1];
        let x = Decimal::new(cents, 2);

        let before = aggregate(a, &snapshot)
            .deltas
            .get(&b)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let mut with_settlement = snapshot.clone();
        with_settlement.settlements.push(Settlement {
            id: SettlementId::new(),
            group_id: GroupId::from_uuid(uuid::Uuid::nil()),
            paid_by: a,
            paid_by_profile: None,
            paid_to: b,
            paid_to_profile: None,
            amount: x,
            notes: None,
            created_at: Utc::now(),
        });

        let after = aggregate(a, &with_settlement)
            .deltas
            .get(&b)
            .copied()
            .unwrap_or(Decimal::ZERO);

        prop_assert_eq!(after, before + x);
    }

    /// A counterparty whose delta rounds below epsilon never appears.
    #[test]
    fn prop_negligible_filtering(sub_cent in 1i64..50) {
        // Tenths of a cent, strictly below the 0.005 rounding midpoint.
        let tiny = Decimal::new(sub_cent % 5, 3);
        let (a, b) = (UserId::new(), UserId::new());
        let group = GroupId::new();
        let id = ExpenseId::new();
        let snapshot = FactSnapshot {
            expenses: vec![Expense {
                id,
                group_id: group,
                paid_by: a,
                paid_by_profile: None,
                amount: tiny,
                currency: "USD".to_string(),
                expense_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                splits: vec![ExpenseSplit {
                    expense_id: id,
                    user_id: b,
                    amount: tiny,
                    is_settled: false,
                    profile: None,
                }],
            }],
            settlements: vec![],
        };

        let result = net(aggregate(a, &snapshot));
        prop_assert!(result.balances.is_empty());
    }
}
