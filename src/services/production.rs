use async_recursion::async_recursion;
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};
use tracing::{error, info, info_span, instrument, Instrument};
use validator::Validate;

use crate::context::ExecutionContext;
use crate::entities::{
    mrp_operation, mrp_production, mrp_request, mrp_workorder, BomId, ProductId, ProductionId,
    ProductionState, RequestId, RequestState, UomId, UserId, WorkorderState,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::Event;

use super::bom_defaults::load_bom;
use super::change_tracking::{production_labels as label, ChangeLog, NoteLog, TrackedValue};
use super::references;
use super::requests::{validate_positive_qty, NewRequest};
use super::sequence::production_name;
use super::sync::{request_changes_from_production, ProductionChanges, RequestChanges};
use super::MrpWorkflow;

pub const DUPLICATE_ORDER_MESSAGE: &str = "A Manufacturing Order already exists for this request.";
pub const NOT_APPROVED_MESSAGE: &str =
    "Cannot move the Manufacturing Order to 'Done' as the request is pending admin approval.";

/// Input for a new production order.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewProduction {
    /// Derived from the request name when absent
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub origin: Option<String>,
    pub product_id: ProductId,
    #[validate(custom = "validate_positive_qty")]
    pub product_qty: f64,
    pub product_uom_id: Option<UomId>,
    pub bom_id: Option<BomId>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_deadline: Option<DateTime<Utc>>,
    pub requested_date: Option<DateTime<Utc>>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub user_id: Option<UserId>,
    /// A request is synthesized when absent
    pub mrp_request_id: Option<RequestId>,
}

impl NewProduction {
    pub fn new(product_id: ProductId, product_qty: f64) -> Self {
        Self {
            product_id,
            product_qty,
            ..Default::default()
        }
    }
}

/// Read-only mirror of the owning request's approval state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionApproval {
    pub request_id: Option<RequestId>,
    pub request_state: Option<RequestState>,
    /// True when approved, or when no request is linked
    pub request_approved: bool,
}

impl MrpWorkflow {
    pub async fn find_production(
        &self,
        production_id: ProductionId,
    ) -> ServiceResult<mrp_production::Model> {
        let db = &*self.db;
        mrp_production::Entity::find_by_id(production_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Manufacturing order", production_id))
    }

    /// Production order linked to a request, if any.
    pub async fn production_for_request(
        &self,
        request_id: RequestId,
    ) -> ServiceResult<Option<mrp_production::Model>> {
        let db = &*self.db;
        mrp_production::Entity::find()
            .filter(mrp_production::Column::MrpRequestId.eq(request_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Creates a production order.
    ///
    /// An order without a request gets one synthesized, which skips product-owner
    /// review and goes straight to `waiting_admin`. Such an order takes its BOM and
    /// unit from the synthesized request when the input leaves them unset. The request
    /// is then aligned with the new order in a suppressed write.
    #[instrument(skip(self, ctx, input), fields(product_id = input.product_id))]
    pub async fn create_production(
        &self,
        ctx: &ExecutionContext,
        mut input: NewProduction,
    ) -> ServiceResult<mrp_production::Model> {
        input.validate()?;
        let db = &*self.db;
        let now = ctx.now();

        let request = match input.mrp_request_id {
            Some(request_id) => self.find_request(request_id).await?,
            None => {
                let request = self.create_orphan_request(ctx, &input).await?;
                input.bom_id = input.bom_id.or(request.bom_id);
                input.product_uom_id = input.product_uom_id.or(request.uom_id);
                request
            }
        };

        if self.production_for_request(request.id).await?.is_some() {
            return Err(ServiceError::Conflict(DUPLICATE_ORDER_MESSAGE.to_string()));
        }

        let name = input
            .name
            .unwrap_or_else(|| production_name(&request.name));
        let created = mrp_production::ActiveModel {
            name: Set(name),
            origin: Set(input.origin),
            product_id: Set(input.product_id),
            product_qty: Set(input.product_qty),
            product_uom_id: Set(input.product_uom_id),
            bom_id: Set(input.bom_id),
            date_start: Set(input.date_start),
            date_deadline: Set(input.date_deadline),
            date_finished: Set(None),
            requested_date: Set(input.requested_date),
            expected_delivery_date: Set(input.expected_delivery_date),
            user_id: Set(input.user_id),
            state: Set(ProductionState::Draft),
            mrp_request_id: Set(Some(request.id)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(request = %request.name, "Failed to create manufacturing order: {}", e);
            ServiceError::db_error(e)
        })?;

        info!(production = %created.name, request = %request.name, "Manufacturing order created");
        self.emit(Event::ProductionCreated {
            production_id: created.id,
            request_id: Some(request.id),
        })
        .await;

        let back = RequestChanges {
            start_date: Some(created.date_start.or(created.date_deadline)),
            product_id: Some(created.product_id),
            bom_id: Some(created.bom_id),
            qty: Some(created.product_qty),
            uom_id: Some(created.product_uom_id),
            requested_date: created.requested_date,
            expected_delivery_date: Some(created.expected_delivery_date),
            mrp_production_id: Some(Some(created.id)),
            ..Default::default()
        };
        self.write_request(&ctx.suppressed(), request.id, back)
            .await?;

        Ok(created)
    }

    async fn create_orphan_request(
        &self,
        ctx: &ExecutionContext,
        input: &NewProduction,
    ) -> ServiceResult<mrp_request::Model> {
        let actor_name = references::user_name(&*self.db, ctx.actor()).await?;
        let request = self
            .create_request(
                ctx,
                NewRequest {
                    product_id: input.product_id,
                    qty: input.product_qty,
                    uom_id: input.product_uom_id,
                    start_date: input.date_start.or(input.date_deadline),
                    requested_date: input.requested_date,
                    expected_delivery_date: input.expected_delivery_date,
                    bom_id: input.bom_id,
                    note: Some(format!("Created automatically from MO by {}", actor_name)),
                    ..Default::default()
                },
            )
            .await?;
        self.write_request(
            &ctx.suppressed(),
            request.id,
            RequestChanges::state(RequestState::WaitingAdmin),
        )
        .await
    }

    /// Production order write interceptor.
    ///
    /// Tracked changes flag the linked request as `change_requested` unless the call is
    /// suppressed, moves the order to done, or is a completion call. Mirrored fields are
    /// pushed to the request in one suppressed write whose failure is only logged.
    #[async_recursion]
    pub async fn write_production(
        &self,
        ctx: &ExecutionContext,
        production_id: ProductionId,
        changes: ProductionChanges,
    ) -> ServiceResult<mrp_production::Model> {
        let span = info_span!(
            "write_production",
            production_id,
            suppressed = ctx.is_sync_suppressed(),
            completion = ctx.is_completion()
        );
        self.apply_production_write(ctx, production_id, changes)
            .instrument(span)
            .await
    }

    async fn apply_production_write(
        &self,
        ctx: &ExecutionContext,
        production_id: ProductionId,
        changes: ProductionChanges,
    ) -> ServiceResult<mrp_production::Model> {
        let db = &*self.db;
        let current = self.find_production(production_id).await?;

        let may_flag = !ctx.is_sync_suppressed()
            && changes.state != Some(ProductionState::Done)
            && !ctx.is_completion();
        if let (Some(request_id), true) = (current.mrp_request_id, may_flag) {
            let log = detect_production_changes(db, &current, &changes).await?;
            if let Some(summary) = log.summary() {
                let request = self.find_request(request_id).await?;
                let mut notes = NoteLog::parse(request.note.as_deref());
                notes.append(ctx.now(), summary);
                info!(
                    production = %current.name,
                    request = %request.name,
                    changes = log.len(),
                    "Manufacturing order changed; flagging request"
                );
                self.write_request(
                    &ctx.suppressed(),
                    request_id,
                    RequestChanges {
                        state: Some(RequestState::ChangeRequested),
                        note: Some(notes.render()),
                        ..Default::default()
                    },
                )
                .await?;
            }
        }

        let mut model: mrp_production::ActiveModel = current.clone().into();
        changes.apply_to(&mut model);
        model.updated_at = Set(ctx.now());
        let updated = model.update(db).await.map_err(|e| {
            error!(production = %current.name, "Failed to write manufacturing order: {}", e);
            ServiceError::db_error(e)
        })?;

        if updated.state != current.state {
            info!(
                production = %updated.name,
                from = %current.state,
                to = %updated.state,
                "Manufacturing order state changed"
            );
        }

        if ctx.is_sync_suppressed() {
            return Ok(updated);
        }

        if let Some(request_id) = updated.mrp_request_id {
            let counterpart = request_changes_from_production(&changes, &updated);
            if !counterpart.is_empty() {
                match self
                    .write_request(&ctx.suppressed(), request_id, counterpart)
                    .await
                {
                    Ok(_) => {
                        counter!("mrp.sync.propagations", 1);
                    }
                    Err(e) => {
                        error!(
                            production = %updated.name,
                            request_id,
                            "Failed to sync manufacturing order to request: {}",
                            e
                        );
                        counter!("mrp.sync.propagation_failures", 1);
                        self.emit(Event::SyncPropagationFailed {
                            source: updated.name.clone(),
                            record_id: request_id,
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }
        }

        Ok(updated)
    }

    /// Confirms a draft order, creating one workorder per BOM operation.
    #[instrument(skip(self, ctx))]
    pub async fn confirm_production(
        &self,
        ctx: &ExecutionContext,
        production_id: ProductionId,
    ) -> ServiceResult<mrp_production::Model> {
        let db = &*self.db;
        let production = self.find_production(production_id).await?;
        if production.state != ProductionState::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "Manufacturing order {} is {}, only draft orders can be confirmed",
                production.name, production.state
            )));
        }

        let operations = match production.bom_id {
            Some(bom_id) => mrp_operation::Entity::find()
                .filter(mrp_operation::Column::BomId.eq(bom_id))
                .order_by_asc(mrp_operation::Column::Sequence)
                .order_by_asc(mrp_operation::Column::Id)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?,
            None => Vec::new(),
        };

        for operation in &operations {
            mrp_workorder::ActiveModel {
                name: Set(operation.name.clone()),
                production_id: Set(production.id),
                operation_id: Set(Some(operation.id)),
                assigned_user_id: Set(operation.assigned_user_id),
                state: Set(WorkorderState::Pending),
                created_at: Set(ctx.now()),
                ..Default::default()
            }
            .insert(db)
            .await
            .map_err(ServiceError::db_error)?;
        }

        let confirmed = self
            .write_production(
                ctx,
                production.id,
                ProductionChanges::state(ProductionState::Confirmed),
            )
            .await?;

        info!(production = %confirmed.name, workorders = operations.len(), "Manufacturing order confirmed");
        self.emit(Event::ProductionConfirmed {
            production_id: confirmed.id,
            workorders: operations.len(),
        })
        .await;
        Ok(confirmed)
    }

    /// Bulk "mark done". Rejected as a whole when any linked request is not approved.
    #[instrument(skip(self, ctx))]
    pub async fn mark_production_done(
        &self,
        ctx: &ExecutionContext,
        production_ids: &[ProductionId],
    ) -> ServiceResult<Vec<mrp_production::Model>> {
        let mut productions = Vec::with_capacity(production_ids.len());
        for production_id in production_ids {
            let production = self.find_production(*production_id).await?;
            if matches!(
                production.state,
                ProductionState::Done | ProductionState::Cancel
            ) {
                return Err(ServiceError::InvalidStatus(format!(
                    "Manufacturing order {} is already {}",
                    production.name, production.state
                )));
            }
            if let Some(request_id) = production.mrp_request_id {
                let request = self.find_request(request_id).await?;
                if request.state != RequestState::Approved {
                    return Err(ServiceError::PreconditionFailed(
                        NOT_APPROVED_MESSAGE.to_string(),
                    ));
                }
            }
            productions.push(production);
        }

        let completion = ctx.for_completion();
        let mut done = Vec::with_capacity(productions.len());
        for production in productions {
            let changes = ProductionChanges {
                state: Some(ProductionState::Done),
                date_finished: Some(Some(ctx.now())),
                date_start: production.date_start.is_none().then(|| Some(ctx.now())),
                ..Default::default()
            };
            let updated = self
                .write_production(&completion, production.id, changes)
                .await?;
            info!(production = %updated.name, "Manufacturing order done");
            self.emit(Event::ProductionCompleted(updated.id)).await;
            done.push(updated);
        }
        Ok(done)
    }

    /// Sets the BOM of an order; the BOM's owner becomes the responsible user and its
    /// unit the order unit. Owner, admin and unit are pushed to the linked request.
    #[instrument(skip(self, ctx))]
    pub async fn select_production_bom(
        &self,
        ctx: &ExecutionContext,
        production_id: ProductionId,
        bom_id: BomId,
    ) -> ServiceResult<mrp_production::Model> {
        let bom = load_bom(&*self.db, bom_id).await?;
        let mut changes = ProductionChanges {
            bom_id: Some(Some(bom.id)),
            ..Default::default()
        };
        if bom.product_owner_id.is_some() {
            changes.user_id = Some(bom.product_owner_id);
        }
        if bom.product_uom_id.is_some() {
            changes.product_uom_id = Some(bom.product_uom_id);
        }
        let updated = self.write_production(ctx, production_id, changes).await?;

        if let Some(request_id) = updated.mrp_request_id {
            self.write_request(
                &ctx.suppressed(),
                request_id,
                RequestChanges {
                    product_owner_id: Some(bom.product_owner_id),
                    admin_id: Some(bom.admin_id),
                    uom_id: Some(bom.product_uom_id),
                    ..Default::default()
                },
            )
            .await?;
        }
        Ok(updated)
    }

    pub async fn production_approval(
        &self,
        production_id: ProductionId,
    ) -> ServiceResult<ProductionApproval> {
        let production = self.find_production(production_id).await?;
        let request_state = match production.mrp_request_id {
            Some(request_id) => Some(self.find_request(request_id).await?.state),
            None => None,
        };
        Ok(ProductionApproval {
            request_id: production.mrp_request_id,
            request_state,
            request_approved: request_state.map_or(true, |s| s == RequestState::Approved),
        })
    }

    /// Deletes an order and its workorders, clearing the request's link to it.
    #[instrument(skip(self, ctx))]
    pub async fn delete_production(
        &self,
        ctx: &ExecutionContext,
        production_id: ProductionId,
    ) -> ServiceResult<()> {
        let db = &*self.db;
        let production = self.find_production(production_id).await?;

        mrp_workorder::Entity::delete_many()
            .filter(mrp_workorder::Column::ProductionId.eq(production.id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        let request_id = production.mrp_request_id;
        let name = production.name.clone();
        production
            .delete(db)
            .await
            .map_err(ServiceError::db_error)?;

        if let Some(request_id) = request_id {
            self.write_request(
                &ctx.suppressed(),
                request_id,
                RequestChanges {
                    mrp_production_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        }

        info!(production = %name, "Manufacturing order deleted");
        self.emit(Event::ProductionDeleted(production_id)).await;
        Ok(())
    }
}

async fn detect_production_changes<C: ConnectionTrait>(
    db: &C,
    current: &mrp_production::Model,
    changes: &ProductionChanges,
) -> ServiceResult<ChangeLog> {
    let mut log = ChangeLog::new();
    if let Some(product_id) = changes.product_id {
        log.record(
            label::PRODUCT,
            references::product_value(db, current.product_id).await?,
            references::product_value(db, product_id).await?,
        );
    }
    if let Some(qty) = changes.product_qty {
        log.record(
            label::QUANTITY,
            TrackedValue::Number(current.product_qty),
            TrackedValue::Number(qty),
        );
    }
    if let Some(uom_id) = changes.product_uom_id {
        log.record(
            label::UOM,
            references::uom_value(db, current.product_uom_id).await?,
            references::uom_value(db, uom_id).await?,
        );
    }
    if let Some(date_start) = changes.date_start {
        log.record(
            label::DATE_START,
            TrackedValue::timestamp(current.date_start),
            TrackedValue::timestamp(date_start),
        );
    }
    if let Some(date_deadline) = changes.date_deadline {
        log.record(
            label::DATE_DEADLINE,
            TrackedValue::timestamp(current.date_deadline),
            TrackedValue::timestamp(date_deadline),
        );
    }
    if let Some(requested_date) = changes.requested_date {
        log.record(
            label::REQUESTED_DATE,
            TrackedValue::timestamp(current.requested_date),
            TrackedValue::timestamp(requested_date),
        );
    }
    if let Some(expected) = changes.expected_delivery_date {
        log.record(
            label::EXPECTED_DELIVERY_DATE,
            TrackedValue::timestamp(current.expected_delivery_date),
            TrackedValue::timestamp(expected),
        );
    }
    if let Some(bom_id) = changes.bom_id {
        log.record(
            label::BOM,
            references::bom_value(db, current.bom_id).await?,
            references::bom_value(db, bom_id).await?,
        );
    }
    Ok(log)
}
