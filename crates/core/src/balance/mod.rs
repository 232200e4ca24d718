//! Pairwise balance computation from ledger facts.
//!
//! This module implements the core balance pipeline:
//! - Fact types (expenses, splits, settlements)
//! - Ledger aggregation into directed per-counterparty deltas
//! - Netting into rounded, filtered signed balances
//! - The fact store seam to the backing database
//! - The balance service (query facade and settlement recorder)
//! - Error types for balance operations

pub mod aggregate;
pub mod error;
pub mod facts;
pub mod netting;
pub mod service;
pub mod store;

#[cfg(test)]
mod service_props;

pub use aggregate::{LedgerDeltas, aggregate};
pub use error::{BalanceError, StoreError};
pub use facts::{Expense, ExpenseSplit, FactSnapshot, Profile, Scope, Settlement};
pub use netting::{NetBalance, NettedBalances, epsilon, net};
pub use service::{Balance, BalanceResult, BalanceService, RecordSettlementInput, RecordedSettlement};
pub use store::{FactStore, NewSettlement};
