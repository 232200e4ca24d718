//! The production fact store adapter.
//!
//! Implements the core's `FactStore` trait on top of PostgreSQL. All
//! legacy-schema normalization happens here: the core only ever sees
//! canonical typed ids and joined-in profiles. Visibility is enforced via
//! group membership — global scope means the viewer's groups, and a group
//! scope outside the viewer's membership yields no facts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use divvy_core::balance::{
    Expense, ExpenseSplit, FactStore, NewSettlement, Profile, Scope, Settlement, StoreError,
};
use divvy_shared::types::{ExpenseId, GroupId, SettlementId, UserId};

use crate::entities::{expense_splits, expenses, group_members, settlements, users};

/// Fact store backed by `SeaORM`.
#[derive(Debug, Clone)]
pub struct SeaOrmFactStore {
    db: DatabaseConnection,
}

impl SeaOrmFactStore {
    /// Creates a new fact store over a database connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Group ids the viewer is a member of.
    async fn visible_group_ids(&self, viewer: UserId) -> Result<Vec<Uuid>, DbErr> {
        let memberships = group_members::Entity::find()
            .filter(group_members::Column::UserId.eq(viewer.into_inner()))
            .all(&self.db)
            .await?;
        Ok(memberships.into_iter().map(|m| m.group_id).collect())
    }

    /// Resolves a scope to the concrete group ids it covers for the viewer.
    async fn scoped_group_ids(&self, viewer: UserId, scope: Scope) -> Result<Vec<Uuid>, DbErr> {
        let visible = self.visible_group_ids(viewer).await?;
        Ok(match scope {
            Scope::Global => visible,
            Scope::Group(group_id) => visible
                .into_iter()
                .filter(|id| *id == group_id.into_inner())
                .collect(),
        })
    }

    /// Loads profiles for a set of user ids.
    async fn load_profiles(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, Profile>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(|u| (u.id, profile_of(&u))).collect())
    }
}

fn store_err(err: DbErr) -> StoreError {
    StoreError(err.to_string())
}

fn profile_of(user: &users::Model) -> Profile {
    Profile {
        full_name: user.full_name.clone(),
        email: user.email.clone(),
    }
}

/// Groups split rows under their parent expense id.
fn splits_by_expense(
    splits: Vec<expense_splits::Model>,
) -> HashMap<Uuid, Vec<expense_splits::Model>> {
    let mut grouped: HashMap<Uuid, Vec<expense_splits::Model>> = HashMap::new();
    for split in splits {
        grouped.entry(split.expense_id).or_default().push(split);
    }
    grouped
}

fn to_core_expense(
    model: expenses::Model,
    splits: Vec<expense_splits::Model>,
    profiles: &HashMap<Uuid, Profile>,
) -> Expense {
    Expense {
        id: ExpenseId::from_uuid(model.id),
        group_id: GroupId::from_uuid(model.group_id),
        paid_by: UserId::from_uuid(model.paid_by),
        paid_by_profile: profiles.get(&model.paid_by).cloned(),
        amount: model.amount,
        currency: model.currency,
        expense_date: model.expense_date,
        splits: splits
            .into_iter()
            .map(|s| ExpenseSplit {
                expense_id: ExpenseId::from_uuid(s.expense_id),
                user_id: UserId::from_uuid(s.user_id),
                amount: s.amount,
                is_settled: s.is_settled,
                profile: profiles.get(&s.user_id).cloned(),
            })
            .collect(),
    }
}

fn to_core_settlement(model: settlements::Model, profiles: &HashMap<Uuid, Profile>) -> Settlement {
    Settlement {
        id: SettlementId::from_uuid(model.id),
        group_id: GroupId::from_uuid(model.group_id),
        paid_by: UserId::from_uuid(model.paid_by),
        paid_by_profile: profiles.get(&model.paid_by).cloned(),
        paid_to: UserId::from_uuid(model.paid_to),
        paid_to_profile: profiles.get(&model.paid_to).cloned(),
        amount: model.amount,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl FactStore for SeaOrmFactStore {
    async fn list_expenses(
        &self,
        viewer: UserId,
        scope: Scope,
    ) -> Result<Vec<Expense>, StoreError> {
        let group_ids = self
            .scoped_group_ids(viewer, scope)
            .await
            .map_err(store_err)?;
        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        let expense_models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.is_in(group_ids))
            .all(&self.db)
            .await
            .map_err(store_err)?;

        let expense_ids: Vec<Uuid> = expense_models.iter().map(|e| e.id).collect();
        let split_models = if expense_ids.is_empty() {
            vec![]
        } else {
            expense_splits::Entity::find()
                .filter(expense_splits::Column::ExpenseId.is_in(expense_ids))
                .all(&self.db)
                .await
                .map_err(store_err)?
        };

        let mut user_ids: Vec<Uuid> = expense_models.iter().map(|e| e.paid_by).collect();
        user_ids.extend(split_models.iter().map(|s| s.user_id));
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles = self.load_profiles(user_ids).await.map_err(store_err)?;

        let mut grouped = splits_by_expense(split_models);
        Ok(expense_models
            .into_iter()
            .map(|e| {
                let splits = grouped.remove(&e.id).unwrap_or_default();
                to_core_expense(e, splits, &profiles)
            })
            .collect())
    }

    async fn list_settlements(
        &self,
        viewer: UserId,
        scope: Scope,
    ) -> Result<Vec<Settlement>, StoreError> {
        let group_ids = self
            .scoped_group_ids(viewer, scope)
            .await
            .map_err(store_err)?;
        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        let models = settlements::Entity::find()
            .filter(settlements::Column::GroupId.is_in(group_ids))
            .all(&self.db)
            .await
            .map_err(store_err)?;

        let mut user_ids: Vec<Uuid> = models
            .iter()
            .flat_map(|s| [s.paid_by, s.paid_to])
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let profiles = self.load_profiles(user_ids).await.map_err(store_err)?;

        Ok(models
            .into_iter()
            .map(|s| to_core_settlement(s, &profiles))
            .collect())
    }

    async fn lookup_profiles(
        &self,
        user_ids: Vec<UserId>,
    ) -> Result<HashMap<UserId, Profile>, StoreError> {
        let ids: Vec<Uuid> = user_ids.into_iter().map(UserId::into_inner).collect();
        let profiles = self.load_profiles(ids).await.map_err(store_err)?;
        Ok(profiles
            .into_iter()
            .map(|(id, profile)| (UserId::from_uuid(id), profile))
            .collect())
    }

    async fn insert_settlement(
        &self,
        settlement: NewSettlement,
    ) -> Result<Settlement, StoreError> {
        let now = Utc::now();
        let model = settlements::ActiveModel {
            id: Set(Uuid::now_v7()),
            group_id: Set(settlement.group_id.into_inner()),
            paid_by: Set(settlement.paid_by.into_inner()),
            paid_to: Set(settlement.paid_to.into_inner()),
            amount: Set(settlement.amount),
            notes: Set(settlement.notes),
            created_at: Set(now.into()),
        };
        let inserted = model.insert(&self.db).await.map_err(store_err)?;
        Ok(to_core_settlement(inserted, &HashMap::new()))
    }

    async fn is_group_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let count = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.into_inner()))
            .filter(group_members::Column::UserId.eq(user_id.into_inner()))
            .count(&self.db)
            .await
            .map_err(store_err)?;
        Ok(count > 0)
    }
}
