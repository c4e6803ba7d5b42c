use sea_orm::{
    sea_query::Condition, ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use tracing::{info, instrument};

use crate::context::ExecutionContext;
use crate::entities::{mrp_workorder, ProductionId, Role, UserId, WorkorderId, WorkorderState};
use crate::errors::{ServiceError, ServiceResult};

use super::MrpWorkflow;

/// Workorder search filters.
#[derive(Debug, Clone, Default)]
pub struct WorkorderQuery {
    pub production_id: Option<ProductionId>,
    pub state: Option<WorkorderState>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl WorkorderQuery {
    pub fn for_production(production_id: ProductionId) -> Self {
        Self {
            production_id: Some(production_id),
            ..Default::default()
        }
    }
}

impl MrpWorkflow {
    /// Workorders visible to the acting user.
    ///
    /// Product owners and admins see everything; other users only see unassigned
    /// workorders and their own. This narrows reads, it does not guard writes.
    #[instrument(skip(self, ctx))]
    pub async fn search_workorders(
        &self,
        ctx: &ExecutionContext,
        query: WorkorderQuery,
    ) -> ServiceResult<Vec<mrp_workorder::Model>> {
        let mut select = self.visible_workorders(ctx, &query).await?;
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = query.offset {
            select = select.offset(offset);
        }
        select
            .order_by_asc(mrp_workorder::Column::Id)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn count_workorders(
        &self,
        ctx: &ExecutionContext,
        query: WorkorderQuery,
    ) -> ServiceResult<u64> {
        self.visible_workorders(ctx, &query)
            .await?
            .count(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, ctx))]
    pub async fn assign_workorder(
        &self,
        ctx: &ExecutionContext,
        workorder_id: WorkorderId,
        user_id: Option<UserId>,
    ) -> ServiceResult<mrp_workorder::Model> {
        let db = &*self.db;
        let workorder = mrp_workorder::Entity::find_by_id(workorder_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Workorder", workorder_id))?;

        let mut model: mrp_workorder::ActiveModel = workorder.into();
        model.assigned_user_id = Set(user_id);
        let updated = model.update(db).await.map_err(ServiceError::db_error)?;
        info!(workorder = %updated.name, assignee = ?user_id, actor = ctx.actor(), "Workorder assigned");
        Ok(updated)
    }

    async fn visible_workorders(
        &self,
        ctx: &ExecutionContext,
        query: &WorkorderQuery,
    ) -> ServiceResult<Select<mrp_workorder::Entity>> {
        let mut select = mrp_workorder::Entity::find();
        if let Some(production_id) = query.production_id {
            select = select.filter(mrp_workorder::Column::ProductionId.eq(production_id));
        }
        if let Some(state) = query.state {
            select = select.filter(mrp_workorder::Column::State.eq(state));
        }
        if !self.sees_all_workorders(ctx).await? {
            select = select.filter(
                Condition::any()
                    .add(mrp_workorder::Column::AssignedUserId.is_null())
                    .add(mrp_workorder::Column::AssignedUserId.eq(ctx.actor())),
            );
        }
        Ok(select)
    }

    async fn sees_all_workorders(&self, ctx: &ExecutionContext) -> ServiceResult<bool> {
        if ctx.workorder_filter_disabled() {
            return Ok(true);
        }
        Ok(self.roles.has_role(ctx.actor(), Role::ProductOwner).await?
            || self.roles.has_role(ctx.actor(), Role::Admin).await?)
    }
}
