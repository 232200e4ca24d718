//! Expense share allocation.
//!
//! Splitting an expense must never create or destroy cents: the shares of
//! an expense always sum back to the expense amount. Equal splits use the
//! largest-remainder method with leftover cents absorbed by the first
//! shares (100 across three people is 33.34 / 33.33 / 33.33); percentage
//! splits hand leftover cents to the shares with the largest fractional
//! parts; exact splits are validated as provided.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Errors that can occur while building or validating expense shares.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    /// An expense needs at least one participant.
    #[error("An expense needs at least one participant")]
    NoParticipants,

    /// Expense amount must be positive.
    #[error("Expense amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// A share amount cannot be negative.
    #[error("Share amount cannot be negative, got {0}")]
    NegativeShare(Decimal),

    /// Percentages must sum to 100.
    #[error("Percentages must sum to 100, got {0}")]
    PercentagesNotHundred(Decimal),

    /// The shares do not add up to the expense amount.
    #[error("Shares sum to {actual}, expected {expected}")]
    SharesMismatch {
        /// The expense amount.
        expected: Decimal,
        /// What the shares actually sum to.
        actual: Decimal,
    },
}

/// Splits `total` equally across `count` participants.
///
/// Leftover cents go to the first shares so the sum exactly equals the
/// (2-decimal-rounded) total.
#[must_use]
pub fn equal_shares(total: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 {
        return vec![];
    }
    let total_rounded = total.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    if count == 1 {
        return vec![total_rounded];
    }

    let count_dec = Decimal::from(count as u64);
    let cent = Decimal::new(1, 2);

    let base = (total_rounded / count_dec).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let remainder = total_rounded - base * count_dec;

    let extra_count = (remainder / cent)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_u64()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);

    (0..count)
        .map(|i| if i < extra_count { base + cent } else { base })
        .collect()
}

/// Splits `total` by percentages using the largest-remainder method.
///
/// # Errors
///
/// Returns `SplitError::NoParticipants` for an empty percentage list,
/// `SplitError::NegativeShare` for a negative percentage, or
/// `SplitError::PercentagesNotHundred` if they do not sum to 100.
pub fn percentage_shares(total: Decimal, percentages: &[Decimal]) -> Result<Vec<Decimal>, SplitError> {
    if percentages.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    if let Some(p) = percentages.iter().find(|p| p.is_sign_negative()) {
        return Err(SplitError::NegativeShare(*p));
    }
    let percent_sum: Decimal = percentages.iter().copied().sum();
    if percent_sum != Decimal::ONE_HUNDRED {
        return Err(SplitError::PercentagesNotHundred(percent_sum));
    }

    let cent = Decimal::new(1, 2);
    let total_rounded = total.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);

    let exact: Vec<Decimal> = percentages
        .iter()
        .map(|p| total_rounded * *p / Decimal::ONE_HUNDRED)
        .collect();

    let mut shares: Vec<Decimal> = exact
        .iter()
        .map(|a| a.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .collect();

    let allocated: Decimal = shares.iter().copied().sum();
    let remainder = total_rounded - allocated;
    let units = (remainder / cent)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_u64()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);

    if units == 0 {
        return Ok(shares);
    }

    // Rank shares by fractional remainder, largest first.
    let mut remainders: Vec<(usize, Decimal)> = exact
        .iter()
        .zip(shares.iter())
        .enumerate()
        .map(|(i, (e, s))| (i, *e - *s))
        .collect();
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (idx, _) in remainders.iter().take(units) {
        shares[*idx] += cent;
    }

    Ok(shares)
}

/// Validates caller-provided shares against the expense amount.
///
/// The sum must match the expense amount within the one-cent rounding
/// tolerance and no share may be negative.
///
/// # Errors
///
/// Returns `SplitError` describing the first violation found.
pub fn validate_shares(expense_amount: Decimal, shares: &[Decimal]) -> Result<(), SplitError> {
    if expense_amount <= Decimal::ZERO {
        return Err(SplitError::NonPositiveAmount(expense_amount));
    }
    if shares.is_empty() {
        return Err(SplitError::NoParticipants);
    }
    if let Some(share) = shares.iter().find(|s| s.is_sign_negative()) {
        return Err(SplitError::NegativeShare(*share));
    }

    let actual: Decimal = shares.iter().copied().sum();
    let tolerance = Decimal::new(1, 2);
    if (actual - expense_amount).abs() > tolerance {
        return Err(SplitError::SharesMismatch { expected: expense_amount, actual });
    }

    Ok(())
}
