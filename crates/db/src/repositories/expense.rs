//! Expense persistence with atomic split writes.
//!
//! An expense and its splits always change together inside one transaction.
//! Editing replaces the full split set; partial split updates are not
//! supported, which keeps the share-sum invariant checkable in one place.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use divvy_shared::types::{ExpenseId, GroupId, UserId};

use crate::entities::{expense_splits, expenses};

/// Input for creating an expense together with its splits.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub group_id: GroupId,
    pub paid_by: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    /// Per-participant shares. Must already sum to `amount`.
    pub shares: Vec<(UserId, Decimal)>,
}

/// Repository for expense write and read paths outside balance queries.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts an expense and its splits atomically.
    pub async fn create_with_splits(
        &self,
        input: NewExpense,
    ) -> Result<(expenses::Model, Vec<expense_splits::Model>), DbErr> {
        let txn = self.db.begin().await?;
        let now = Utc::now();
        let expense_id = Uuid::now_v7();

        let expense = expenses::ActiveModel {
            id: Set(expense_id),
            group_id: Set(input.group_id.into_inner()),
            paid_by: Set(input.paid_by.into_inner()),
            amount: Set(input.amount),
            currency: Set(input.currency),
            description: Set(input.description),
            expense_date: Set(input.expense_date),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let splits = insert_splits(&txn, expense_id, input.shares).await?;
        txn.commit().await?;
        Ok((expense, splits))
    }

    /// Replaces an expense's amount, description, date and split set atomically.
    ///
    /// Returns `Ok(None)` when the expense does not exist in the given group.
    pub async fn update_with_splits(
        &self,
        group_id: GroupId,
        expense_id: ExpenseId,
        amount: Decimal,
        description: Option<String>,
        expense_date: NaiveDate,
        shares: Vec<(UserId, Decimal)>,
    ) -> Result<Option<(expenses::Model, Vec<expense_splits::Model>)>, DbErr> {
        let txn = self.db.begin().await?;

        let Some(existing) = expenses::Entity::find_by_id(expense_id.into_inner())
            .filter(expenses::Column::GroupId.eq(group_id.into_inner()))
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };

        let mut active: expenses::ActiveModel = existing.into();
        active.amount = Set(amount);
        active.description = Set(description);
        active.expense_date = Set(expense_date);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        // Replace the whole split set rather than diffing rows.
        expense_splits::Entity::delete_many()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id.into_inner()))
            .exec(&txn)
            .await?;
        let splits = insert_splits(&txn, expense_id.into_inner(), shares).await?;

        txn.commit().await?;
        Ok(Some((updated, splits)))
    }

    /// Lists a group's expenses, newest expense date first.
    pub async fn list_for_group(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<(expenses::Model, Vec<expense_splits::Model>)>, DbErr> {
        let rows = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.into_inner()))
            .order_by_desc(expenses::Column::ExpenseDate)
            .find_with_related(expense_splits::Entity)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Loads one expense with its splits.
    pub async fn find_by_id(
        &self,
        group_id: GroupId,
        expense_id: ExpenseId,
    ) -> Result<Option<(expenses::Model, Vec<expense_splits::Model>)>, DbErr> {
        let Some(expense) = expenses::Entity::find_by_id(expense_id.into_inner())
            .filter(expenses::Column::GroupId.eq(group_id.into_inner()))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id.into_inner()))
            .all(&self.db)
            .await?;
        Ok(Some((expense, splits)))
    }
}

async fn insert_splits(
    txn: &sea_orm::DatabaseTransaction,
    expense_id: Uuid,
    shares: Vec<(UserId, Decimal)>,
) -> Result<Vec<expense_splits::Model>, DbErr> {
    let models: Vec<expense_splits::ActiveModel> = shares
        .into_iter()
        .map(|(user_id, amount)| expense_splits::ActiveModel {
            expense_id: Set(expense_id),
            user_id: Set(user_id.into_inner()),
            amount: Set(amount),
            is_settled: Set(false),
        })
        .collect();
    if !models.is_empty() {
        expense_splits::Entity::insert_many(models).exec(txn).await?;
    }
    expense_splits::Entity::find()
        .filter(expense_splits::Column::ExpenseId.eq(expense_id))
        .all(txn)
        .await
}
