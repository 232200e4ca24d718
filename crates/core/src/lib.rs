//! Core business logic for Divvy.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `balance` - Pairwise balance computation from ledger facts
//! - `split` - Expense share allocation

pub mod balance;
pub mod split;
