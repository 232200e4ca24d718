//! The fact store seam.
//!
//! The core never talks to a database directly; it consumes this trait.
//! The production implementation lives in the db crate; tests mock it.
//! Visibility and authorization are the store's responsibility: `Global`
//! scope means "all facts visible to the viewer", not "all facts".

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use divvy_shared::types::{GroupId, UserId};

use super::error::StoreError;
use super::facts::{Expense, Profile, Scope, Settlement};

/// Input for appending a new settlement fact.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSettlement {
    /// The group the settlement belongs to.
    pub group_id: GroupId,
    /// The paying user.
    pub paid_by: UserId,
    /// The receiving user.
    pub paid_to: UserId,
    /// Amount paid (validated positive before reaching the store).
    pub amount: Decimal,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// Read/append access to the ledger facts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Lists the expenses visible to `viewer` in `scope`, splits joined in.
    async fn list_expenses(&self, viewer: UserId, scope: Scope)
    -> Result<Vec<Expense>, StoreError>;

    /// Lists the settlements visible to `viewer` in `scope`.
    async fn list_settlements(
        &self,
        viewer: UserId,
        scope: Scope,
    ) -> Result<Vec<Settlement>, StoreError>;

    /// Resolves profiles for the given user ids. Ids with no profile are
    /// simply absent from the returned map.
    async fn lookup_profiles(
        &self,
        user_ids: Vec<UserId>,
    ) -> Result<HashMap<UserId, Profile>, StoreError>;

    /// Appends one settlement fact. The write is atomic: it either fully
    /// succeeds or leaves no partial row behind.
    async fn insert_settlement(&self, settlement: NewSettlement)
    -> Result<Settlement, StoreError>;

    /// Returns whether `user_id` is a member of `group_id`.
    async fn is_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<bool, StoreError>;
}
