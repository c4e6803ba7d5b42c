use async_recursion::async_recursion;
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use tracing::{error, info, info_span, instrument, warn, Instrument};
use validator::{Validate, ValidationError};

use crate::context::ExecutionContext;
use crate::entities::{
    mrp_request, user, BomId, ProductId, RequestId, RequestState, Role, UomId, UserId,
    REQUEST_MODEL,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::Event;

use super::bom_defaults::{
    bom_exists_for_template, latest_bom_for_template, load_bom, load_product, BomDefaults,
};
use super::change_tracking::{request_labels as label, ChangeLog, NoteLog, TrackedValue};
use super::notifier::OutgoingMessage;
use super::references;
use super::sequence::next_request_name;
use super::sync::{production_changes_from_request, RequestChanges};
use super::MrpWorkflow;

pub const DESIGN_ROUTING_MESSAGE: &str = "No BOM found. Routed to Design team for BOM creation.";

/// Input for a new manufacturing request.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewRequest {
    /// Generated as `RQ<DDMMYY><seq>` when absent
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub external_order_ref: Option<String>,
    pub product_id: ProductId,
    #[validate(custom = "validate_positive_qty")]
    pub qty: f64,
    pub uom_id: Option<UomId>,
    pub start_date: Option<DateTime<Utc>>,
    /// Defaults to the creation instant
    pub requested_date: Option<DateTime<Utc>>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub bom_id: Option<BomId>,
    pub product_owner_id: Option<UserId>,
    pub admin_id: Option<UserId>,
    pub note: Option<String>,
}

impl NewRequest {
    pub fn new(product_id: ProductId, qty: f64) -> Self {
        Self {
            product_id,
            qty,
            ..Default::default()
        }
    }
}

pub(crate) fn validate_positive_qty(qty: f64) -> Result<(), ValidationError> {
    if qty.is_finite() && qty > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("qty");
        err.message = Some("Quantity must be positive".into());
        Err(err)
    }
}

impl MrpWorkflow {
    pub async fn find_request(&self, request_id: RequestId) -> ServiceResult<mrp_request::Model> {
        let db = &*self.db;
        mrp_request::Entity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::not_found("Request", request_id))
    }

    /// Creates a request, naming it and applying BOM defaults.
    ///
    /// Without any BOM for the product the request is routed to the design team.
    #[instrument(skip(self, ctx, input), fields(product_id = input.product_id))]
    pub async fn create_request(
        &self,
        ctx: &ExecutionContext,
        input: NewRequest,
    ) -> ServiceResult<mrp_request::Model> {
        input.validate()?;
        let db = &*self.db;
        let now = ctx.now();

        let (product, template) = load_product(db, input.product_id).await?;
        let name = match input.name {
            Some(name) => name,
            None => next_request_name(db, now).await?,
        };

        let bom = match input.bom_id {
            Some(bom_id) => Some(load_bom(db, bom_id).await?),
            None => latest_bom_for_template(db, product.product_tmpl_id).await?,
        };
        let defaults = bom.as_ref().map(BomDefaults::from);
        let bom_exists = bom_exists_for_template(db, product.product_tmpl_id).await?;

        let uom_id = input
            .uom_id
            .or_else(|| defaults.as_ref().and_then(|d| d.uom_id))
            .or_else(|| template.as_ref().and_then(|t| t.uom_id));
        let product_owner_id = input
            .product_owner_id
            .or_else(|| defaults.as_ref().and_then(|d| d.product_owner_id));
        let admin_id = input
            .admin_id
            .or_else(|| defaults.as_ref().and_then(|d| d.admin_id));

        let created = mrp_request::ActiveModel {
            name: Set(name),
            external_order_ref: Set(input.external_order_ref),
            product_id: Set(product.id),
            product_tmpl_id: Set(product.product_tmpl_id),
            qty: Set(input.qty),
            uom_id: Set(uom_id),
            start_date: Set(input.start_date),
            requested_date: Set(input.requested_date.unwrap_or(now)),
            expected_delivery_date: Set(input.expected_delivery_date),
            bom_id: Set(defaults.as_ref().map(|d| d.bom_id)),
            bom_exists: Set(bom_exists),
            product_owner_id: Set(product_owner_id),
            admin_id: Set(admin_id),
            note: Set(input.note.filter(|n| !n.trim().is_empty())),
            state: Set(RequestState::New),
            mrp_production_id: Set(None),
            notified_po: Set(false),
            auto_submitted_po: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!("Failed to create request: {}", e);
            ServiceError::db_error(e)
        })?;

        counter!("mrp.requests.created", 1);
        info!(request = %created.name, id = created.id, "Request created");
        self.emit(Event::RequestCreated {
            request_id: created.id,
            name: created.name.clone(),
        })
        .await;

        if created.bom_exists {
            Ok(created)
        } else {
            self.route_to_design_team(ctx, created).await
        }
    }

    /// Assigns the first design-team member as admin and notifies them.
    ///
    /// The assignment is a suppressed write, so the request keeps its state.
    async fn route_to_design_team(
        &self,
        ctx: &ExecutionContext,
        request: mrp_request::Model,
    ) -> ServiceResult<mrp_request::Model> {
        let assignee = match self.roles.members(Role::DesignTeam).await? {
            Some(members) => members.first().copied(),
            None => {
                warn!(request = %request.name, "Design team group is not configured");
                None
            }
        };

        let Some(assignee) = assignee else {
            warn!(request = %request.name, "No design team member to route request to");
            self.emit(Event::RequestRoutedToDesign {
                request_id: request.id,
                assignee_id: None,
            })
            .await;
            return Ok(request);
        };

        let updated = self
            .write_request(
                &ctx.suppressed(),
                request.id,
                RequestChanges {
                    admin_id: Some(Some(assignee)),
                    ..Default::default()
                },
            )
            .await?;

        let message = OutgoingMessage::note(REQUEST_MODEL, updated.id, DESIGN_ROUTING_MESSAGE)
            .notify(assignee)
            .by(ctx.actor())
            .at(ctx.now());
        if let Err(e) = self.notifier.post_message(message).await {
            warn!(request = %updated.name, "Failed to notify design team: {}", e);
        }

        info!(request = %updated.name, assignee, "Request routed to design team");
        self.emit(Event::RequestRoutedToDesign {
            request_id: updated.id,
            assignee_id: Some(assignee),
        })
        .await;
        Ok(updated)
    }

    /// Request write interceptor.
    ///
    /// Unsuppressed writes that change a tracked field force the request into
    /// `change_requested` and append the change summary to its note. Mirrored fields are
    /// then pushed to the linked production order in one suppressed write; a failure
    /// there is logged and does not fail this write.
    #[async_recursion]
    pub async fn write_request(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
        changes: RequestChanges,
    ) -> ServiceResult<mrp_request::Model> {
        let span = info_span!(
            "write_request",
            request_id,
            suppressed = ctx.is_sync_suppressed()
        );
        self.apply_request_write(ctx, request_id, changes)
            .instrument(span)
            .await
    }

    async fn apply_request_write(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
        mut changes: RequestChanges,
    ) -> ServiceResult<mrp_request::Model> {
        let db = &*self.db;
        let current = self.find_request(request_id).await?;

        let mut product_template = None;
        if let Some(product_id) = changes.product_id.filter(|id| *id != current.product_id) {
            let (product, _) = load_product(db, product_id).await?;
            let exists = bom_exists_for_template(db, product.product_tmpl_id).await?;
            product_template = Some((product.product_tmpl_id, exists));
        }

        if !ctx.is_sync_suppressed() {
            let log = detect_request_changes(db, &current, &changes).await?;
            if let Some(summary) = log.summary() {
                let base = match &changes.note {
                    Some(note) => note.clone(),
                    None => current.note.clone(),
                };
                let mut notes = NoteLog::parse(base.as_deref());
                notes.append(ctx.now(), summary);
                changes.note = Some(notes.render());
                changes.state = Some(RequestState::ChangeRequested);
                info!(request = %current.name, changes = log.len(), "Tracked fields changed");
            }
        }

        let mut model: mrp_request::ActiveModel = current.clone().into();
        changes.apply_to(&mut model);
        if let Some((tmpl_id, exists)) = product_template {
            model.product_tmpl_id = Set(tmpl_id);
            model.bom_exists = Set(exists);
        }
        model.updated_at = Set(ctx.now());
        let updated = model.update(db).await.map_err(|e| {
            error!(request = %current.name, "Failed to write request: {}", e);
            ServiceError::db_error(e)
        })?;

        if updated.state != current.state {
            info!(
                request = %updated.name,
                from = %current.state,
                to = %updated.state,
                "Request state changed"
            );
            counter!("mrp.requests.transitions", 1);
            self.emit(Event::RequestStateChanged {
                request_id: updated.id,
                from: current.state,
                to: updated.state,
            })
            .await;
        }

        if ctx.is_sync_suppressed() {
            return Ok(updated);
        }

        if let Some(production_id) = updated.mrp_production_id {
            let counterpart = production_changes_from_request(&changes, &updated);
            if !counterpart.is_empty() {
                match self
                    .write_production(&ctx.suppressed(), production_id, counterpart)
                    .await
                {
                    Ok(_) => {
                        counter!("mrp.sync.propagations", 1);
                    }
                    Err(e) => {
                        error!(
                            request = %updated.name,
                            production_id,
                            "Failed to sync request to production order: {}",
                            e
                        );
                        counter!("mrp.sync.propagation_failures", 1);
                        self.emit(Event::SyncPropagationFailed {
                            source: updated.name.clone(),
                            record_id: production_id,
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }
        }

        Ok(updated)
    }

    /// Selects a product: re-runs the BOM lookup and fills unset unit/owner/admin from it.
    /// Without a BOM the request's BOM is cleared and the design team is involved.
    #[instrument(skip(self, ctx))]
    pub async fn select_product(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
        product_id: ProductId,
    ) -> ServiceResult<mrp_request::Model> {
        let db = &*self.db;
        let current = self.find_request(request_id).await?;
        let (product, _) = load_product(db, product_id).await?;
        let bom = latest_bom_for_template(db, product.product_tmpl_id).await?;

        let mut changes = RequestChanges {
            product_id: Some(product_id),
            ..Default::default()
        };
        match bom.as_ref().map(BomDefaults::from) {
            Some(defaults) => {
                changes.bom_id = Some(Some(defaults.bom_id));
                if current.uom_id.is_none() && defaults.uom_id.is_some() {
                    changes.uom_id = Some(defaults.uom_id);
                }
                if current.product_owner_id.is_none() && defaults.product_owner_id.is_some() {
                    changes.product_owner_id = Some(defaults.product_owner_id);
                }
                if current.admin_id.is_none() && defaults.admin_id.is_some() {
                    changes.admin_id = Some(defaults.admin_id);
                }
            }
            None => changes.bom_id = Some(None),
        }

        let updated = self.write_request(ctx, request_id, changes).await?;
        if updated.bom_exists {
            Ok(updated)
        } else {
            self.route_to_design_team(ctx, updated).await
        }
    }

    /// Selects a BOM; its unit, owner and admin overwrite the current values.
    #[instrument(skip(self, ctx))]
    pub async fn select_bom(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
        bom_id: BomId,
    ) -> ServiceResult<mrp_request::Model> {
        let bom = load_bom(&*self.db, bom_id).await?;
        let mut changes = RequestChanges {
            bom_id: Some(Some(bom.id)),
            ..Default::default()
        };
        if bom.product_uom_id.is_some() {
            changes.uom_id = Some(bom.product_uom_id);
        }
        if bom.product_owner_id.is_some() {
            changes.product_owner_id = Some(bom.product_owner_id);
        }
        if bom.admin_id.is_some() {
            changes.admin_id = Some(bom.admin_id);
        }
        self.write_request(ctx, request_id, changes).await
    }

    /// Users selectable as product owner; everyone when the role is not configured.
    pub async fn eligible_product_owners(&self) -> ServiceResult<Vec<user::Model>> {
        self.eligible_users(Role::ProductOwner).await
    }

    /// Users selectable as production manager; everyone when the role is not configured.
    pub async fn eligible_admins(&self) -> ServiceResult<Vec<user::Model>> {
        self.eligible_users(Role::Admin).await
    }

    async fn eligible_users(&self, role: Role) -> ServiceResult<Vec<user::Model>> {
        let db = &*self.db;
        let mut query = user::Entity::find().order_by_asc(user::Column::Id);
        if let Some(members) = self.roles.members(role).await? {
            query = query.filter(user::Column::Id.is_in(members));
        }
        query.all(db).await.map_err(ServiceError::db_error)
    }
}

async fn detect_request_changes<C: ConnectionTrait>(
    db: &C,
    current: &mrp_request::Model,
    changes: &RequestChanges,
) -> ServiceResult<ChangeLog> {
    let mut log = ChangeLog::new();
    if let Some(product_id) = changes.product_id {
        log.record(
            label::PRODUCT,
            references::product_value(db, current.product_id).await?,
            references::product_value(db, product_id).await?,
        );
    }
    if let Some(qty) = changes.qty {
        log.record(
            label::QUANTITY,
            TrackedValue::Number(current.qty),
            TrackedValue::Number(qty),
        );
    }
    if let Some(uom_id) = changes.uom_id {
        log.record(
            label::UOM,
            references::uom_value(db, current.uom_id).await?,
            references::uom_value(db, uom_id).await?,
        );
    }
    if let Some(start_date) = changes.start_date {
        log.record(
            label::START_DATE,
            TrackedValue::timestamp(current.start_date),
            TrackedValue::timestamp(start_date),
        );
    }
    if let Some(requested_date) = changes.requested_date {
        log.record(
            label::REQUESTED_DATE,
            TrackedValue::Timestamp(current.requested_date),
            TrackedValue::Timestamp(requested_date),
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
    if let Some(owner) = changes.product_owner_id {
        log.record(
            label::PRODUCT_OWNER,
            references::user_value(db, current.product_owner_id).await?,
            references::user_value(db, owner).await?,
        );
    }
    if let Some(admin) = changes.admin_id {
        log.record(
            label::ADMIN,
            references::user_value(db, current.admin_id).await?,
            references::user_value(db, admin).await?,
        );
    }
    if let Some(note) = &changes.note {
        log.record(
            label::NOTE,
            TrackedValue::text(current.note.as_deref()),
            TrackedValue::text(note.as_deref()),
        );
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(NewRequest::new(1, 0.0).validate().is_err());
        assert!(NewRequest::new(1, -2.0).validate().is_err());
        assert!(NewRequest::new(1, f64::NAN).validate().is_err());
        assert!(NewRequest::new(1, 0.5).validate().is_ok());
    }

    #[test]
    fn rejects_empty_explicit_name() {
        let input = NewRequest {
            name: Some(String::new()),
            ..NewRequest::new(1, 1.0)
        };
        assert!(input.validate().is_err());
    }
}
