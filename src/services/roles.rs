use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::entities::{user_role, Role, UserId};
use crate::errors::{ServiceError, ServiceResult};

/// Role membership lookup.
///
/// `members` returns `None` when the role group is not configured at all, which callers
/// treat differently from a configured but empty group.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn members(&self, role: Role) -> ServiceResult<Option<Vec<UserId>>>;

    async fn has_role(&self, user: UserId, role: Role) -> ServiceResult<bool> {
        Ok(self
            .members(role)
            .await?
            .map_or(false, |members| members.contains(&user)))
    }
}

/// In-memory capability table: role -> set of user ids.
#[derive(Debug, Default)]
pub struct RoleTable {
    groups: DashMap<Role, BTreeSet<UserId>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(self, role: Role, user: UserId) -> Self {
        self.grant(role, user);
        self
    }

    /// Registers an empty group so lookups report it as configured.
    pub fn define(&self, role: Role) {
        self.groups.entry(role).or_default();
    }

    pub fn grant(&self, role: Role, user: UserId) {
        self.groups.entry(role).or_default().insert(user);
    }

    pub fn revoke(&self, role: Role, user: UserId) {
        if let Some(mut group) = self.groups.get_mut(&role) {
            group.remove(&user);
        }
    }
}

#[async_trait]
impl RoleDirectory for RoleTable {
    async fn members(&self, role: Role) -> ServiceResult<Option<Vec<UserId>>> {
        Ok(self
            .groups
            .get(&role)
            .map(|group| group.iter().copied().collect()))
    }
}

/// Role directory backed by the `user_role` table. A role with no rows is reported
/// as not configured.
#[derive(Clone)]
pub struct DbRoleDirectory {
    db: Arc<DatabaseConnection>,
}

impl DbRoleDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleDirectory for DbRoleDirectory {
    async fn members(&self, role: Role) -> ServiceResult<Option<Vec<UserId>>> {
        let db = &*self.db;
        let rows = user_role::Entity::find()
            .filter(user_role::Column::Role.eq(role))
            .order_by_asc(user_role::Column::UserId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if rows.is_empty() {
            return Ok(None);
        }
        let mut members: Vec<UserId> = rows.into_iter().map(|row| row.user_id).collect();
        members.dedup();
        Ok(Some(members))
    }
}
