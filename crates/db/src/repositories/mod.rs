//! Repository abstractions for data access.

pub mod expense;
pub mod fact_store;

pub use expense::{ExpenseRepository, NewExpense};
pub use fact_store::SeaOrmFactStore;
