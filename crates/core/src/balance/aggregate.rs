//! Ledger aggregation: folding facts into directed per-counterparty deltas.
//!
//! The fold is commutative, so the result never depends on fact iteration
//! order, and it is side-effect-free until its final return.

use std::collections::HashMap;

use rust_decimal::Decimal;

use divvy_shared::types::UserId;

use super::facts::{FactSnapshot, Profile};

/// Raw signed deltas between the viewing user and each counterparty.
///
/// Positive means the counterparty owes the viewer; negative means the
/// viewer owes the counterparty. Profiles harvested from the facts along
/// the way are kept so the netting stage can avoid a store round-trip for
/// counterparties already resolved inline.
#[derive(Debug, Clone, Default)]
pub struct LedgerDeltas {
    /// Signed delta per counterparty.
    pub deltas: HashMap<UserId, Decimal>,
    /// Profiles resolved inline on the facts.
    pub profiles: HashMap<UserId, Profile>,
}

impl LedgerDeltas {
    fn add(&mut self, counterparty: UserId, amount: Decimal) {
        *self.deltas.entry(counterparty).or_insert(Decimal::ZERO) += amount;
    }

    fn remember_profile(&mut self, user_id: UserId, profile: Option<&Profile>) {
        if let Some(p) = profile {
            self.profiles.entry(user_id).or_insert_with(|| p.clone());
        }
    }
}

/// Folds a fact snapshot into per-counterparty deltas for `viewer`.
///
/// Four fact shapes contribute:
/// 1. Unsettled splits on expenses the viewer paid: counterparty owes viewer.
/// 2. The viewer's own unsettled splits on expenses paid by someone else:
///    viewer owes the payer.
/// 3. Settlements the viewer paid: credit toward the receiver.
/// 4. Settlements paid to the viewer: debt reduction for the payer.
///
/// Splits with `is_settled == true` are excluded entirely; that debt was
/// already retired at split granularity and must not double-count against
/// settlement facts.
#[must_use]
pub fn aggregate(viewer: UserId, snapshot: &FactSnapshot) -> LedgerDeltas {
    let mut out = LedgerDeltas::default();

    for expense in &snapshot.expenses {
        if expense.paid_by == viewer {
            for split in &expense.splits {
                if split.user_id == viewer || split.is_settled {
                    continue;
                }
                out.add(split.user_id, split.amount);
                out.remember_profile(split.user_id, split.profile.as_ref());
            }
        } else {
            for split in &expense.splits {
                if split.user_id != viewer || split.is_settled {
                    continue;
                }
                out.add(expense.paid_by, -split.amount);
                out.remember_profile(expense.paid_by, expense.paid_by_profile.as_ref());
            }
        }
    }

    for settlement in &snapshot.settlements {
        if settlement.paid_by == viewer && settlement.paid_to != viewer {
            out.add(settlement.paid_to, settlement.amount);
            out.remember_profile(settlement.paid_to, settlement.paid_to_profile.as_ref());
        } else if settlement.paid_to == viewer && settlement.paid_by != viewer {
            out.add(settlement.paid_by, -settlement.amount);
            out.remember_profile(settlement.paid_by, settlement.paid_by_profile.as_ref());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::facts::{Expense, ExpenseSplit, Settlement};
    use chrono::{NaiveDate, Utc};
    use divvy_shared::types::{ExpenseId, GroupId, SettlementId};
    use rust_decimal_macros::dec;

    fn expense(
        group_id: GroupId,
        paid_by: UserId,
        amount: Decimal,
        shares: &[(UserId, Decimal, bool)],
    ) -> Expense {
        let id = ExpenseId::new();
        Expense {
            id,
            group_id,
            paid_by,
            paid_by_profile: None,
            amount,
            currency: "USD".to_string(),
            expense_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            splits: shares
                .iter()
                .map(|(user_id, amount, is_settled)| ExpenseSplit {
                    expense_id: id,
                    user_id: *user_id,
                    amount: *amount,
                    is_settled: *is_settled,
                    profile: None,
                })
                .collect(),
        }
    }

    fn settlement(group_id: GroupId, paid_by: UserId, paid_to: UserId, amount: Decimal) -> Settlement {
        Settlement {
            id: SettlementId::new(),
            group_id,
            paid_by,
            paid_by_profile: None,
            paid_to,
            paid_to_profile: None,
            amount,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_viewer_paid_counterparties_owe() {
        // Expense of 100 paid by A, split 33.34/33.33/33.33 across A/B/C.
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let group = GroupId::new();
        let snapshot = FactSnapshot {
            expenses: vec![expense(
                group,
                a,
                dec!(100),
                &[(a, dec!(33.34), false), (b, dec!(33.33), false), (c, dec!(33.33), false)],
            )],
            settlements: vec![],
        };

        let result = aggregate(a, &snapshot);
        assert_eq!(result.deltas[&b], dec!(33.33));
        assert_eq!(result.deltas[&c], dec!(33.33));
        // The viewer's own share never produces a delta.
        assert!(!result.deltas.contains_key(&a));
    }

    #[test]
    fn test_viewer_owes_payer() {
        let (a, b) = (UserId::new(), UserId::new());
        let group = GroupId::new();
        let snapshot = FactSnapshot {
            expenses: vec![expense(
                group,
                b,
                dec!(50),
                &[(b, dec!(25), false), (a, dec!(25), false)],
            )],
            settlements: vec![],
        };

        let result = aggregate(a, &snapshot);
        assert_eq!(result.deltas[&b], dec!(-25));
    }

    #[test]
    fn test_cross_expenses_net_into_one_delta() {
        // A pays 50 split evenly with B; B pays 40 split evenly with A.
        let (a, b) = (UserId::new(), UserId::new());
        let group = GroupId::new();
        let snapshot = FactSnapshot {
            expenses: vec![
                expense(group, a, dec!(50), &[(a, dec!(25), false), (b, dec!(25), false)]),
                expense(group, b, dec!(40), &[(b, dec!(20), false), (a, dec!(20), false)]),
            ],
            settlements: vec![],
        };

        let result = aggregate(a, &snapshot);
        assert_eq!(result.deltas[&b], dec!(5));
    }

    #[test]
    fn test_settled_splits_excluded() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let group = GroupId::new();
        let snapshot = FactSnapshot {
            expenses: vec![expense(
                group,
                a,
                dec!(60),
                &[(b, dec!(30), true), (c, dec!(30), false)],
            )],
            settlements: vec![],
        };

        let result = aggregate(a, &snapshot);
        assert!(!result.deltas.contains_key(&b));
        assert_eq!(result.deltas[&c], dec!(30));
    }

    #[test]
    fn test_settlement_credits_payer() {
        let (a, b) = (UserId::new(), UserId::new());
        let group = GroupId::new();
        let snapshot = FactSnapshot {
            expenses: vec![expense(
                group,
                b,
                dec!(50),
                &[(a, dec!(25), false), (b, dec!(25), false)],
            )],
            settlements: vec![settlement(group, a, b, dec!(25))],
        };

        // A owed B 25, then paid B 25 directly.
        let result = aggregate(a, &snapshot);
        assert_eq!(result.deltas[&b], dec!(0));

        // From B's side the signs mirror.
        let result = aggregate(b, &snapshot);
        assert_eq!(result.deltas[&a], dec!(0));
    }

    #[test]
    fn test_facts_not_involving_viewer_ignored() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let group = GroupId::new();
        let snapshot = FactSnapshot {
            expenses: vec![expense(group, b, dec!(10), &[(c, dec!(10), false)])],
            settlements: vec![settlement(group, b, c, dec!(4))],
        };

        let result = aggregate(a, &snapshot);
        assert!(result.deltas.is_empty());
    }

    #[test]
    fn test_inline_profiles_harvested() {
        let (a, b) = (UserId::new(), UserId::new());
        let group = GroupId::new();
        let mut e = expense(group, a, dec!(20), &[(b, dec!(10), false)]);
        e.splits[0].profile = Some(Profile {
            full_name: "Billie".to_string(),
            email: "billie@example.com".to_string(),
        });

        let result = aggregate(a, &FactSnapshot { expenses: vec![e], settlements: vec![] });
        assert_eq!(result.profiles[&b].full_name, "Billie");
    }

    #[test]
    fn test_order_independent() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let group = GroupId::new();
        let expenses = vec![
            expense(group, a, dec!(90), &[(b, dec!(30), false), (c, dec!(30), false)]),
            expense(group, b, dec!(40), &[(a, dec!(20), false)]),
        ];
        let settlements = vec![settlement(group, c, a, dec!(10)), settlement(group, a, b, dec!(5))];

        let forward = aggregate(
            a,
            &FactSnapshot { expenses: expenses.clone(), settlements: settlements.clone() },
        );
        let reversed = aggregate(
            a,
            &FactSnapshot {
                expenses: expenses.into_iter().rev().collect(),
                settlements: settlements.into_iter().rev().collect(),
            },
        );

        assert_eq!(forward.deltas, reversed.deltas);
    }
}
