//! Balance netting: reducing raw deltas into rounded, filtered balances.

use rust_decimal::{Decimal, RoundingStrategy};

use divvy_shared::types::UserId;

use super::aggregate::LedgerDeltas;
use super::facts::Profile;

/// The negligibility tolerance: one cent.
///
/// A counterparty whose rounded absolute balance falls below this is
/// treated as settled and dropped from the output.
#[must_use]
pub fn epsilon() -> Decimal {
    Decimal::new(1, 2)
}

/// One netted balance against a single counterparty.
///
/// Positive: the counterparty owes the viewer. Negative: the viewer owes
/// the counterparty.
#[derive(Debug, Clone, PartialEq)]
pub struct NetBalance {
    /// The counterparty.
    pub counterparty_id: UserId,
    /// Net signed amount, rounded to 2 decimal places.
    pub amount: Decimal,
    /// Profile when it was resolved inline on the facts.
    pub profile: Option<Profile>,
}

/// The netting engine's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NettedBalances {
    /// Per-counterparty balances, sorted by counterparty id for stable
    /// output within one call. Callers must not depend on the order.
    pub balances: Vec<NetBalance>,
    /// Sum of positive balances.
    pub total_owed: Decimal,
    /// Sum of absolute negative balances.
    pub total_owe: Decimal,
}

/// Nets aggregated deltas into the final balance list.
///
/// Each delta is rounded to 2 decimal places with standard rounding
/// (midpoint away from zero, not truncation), then counterparties whose
/// rounded absolute amount falls below [`epsilon`] are dropped. Totals are
/// summed from the rounded per-counterparty list, so the headline numbers
/// always match the rows they summarize.
#[must_use]
pub fn net(deltas: LedgerDeltas) -> NettedBalances {
    let LedgerDeltas { deltas, mut profiles } = deltas;

    let mut balances: Vec<NetBalance> = deltas
        .into_iter()
        .filter_map(|(counterparty_id, delta)| {
            let amount = delta.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            if amount.abs() < epsilon() {
                return None;
            }
            Some(NetBalance {
                counterparty_id,
                amount,
                profile: profiles.remove(&counterparty_id),
            })
        })
        .collect();

    balances.sort_by_key(|b| b.counterparty_id);

    let total_owed: Decimal = balances
        .iter()
        .filter(|b| b.amount > Decimal::ZERO)
        .map(|b| b.amount)
        .sum();
    let total_owe: Decimal = balances
        .iter()
        .filter(|b| b.amount < Decimal::ZERO)
        .map(|b| b.amount.abs())
        .sum();

    NettedBalances { balances, total_owed, total_owe }
}
