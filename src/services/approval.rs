//! Interactive request actions: submit, accept, request change, approve, reject.
//!
//! Each action checks the transition table first, then the acting user, then any
//! field precondition.

use tracing::{info, instrument, warn};

use crate::context::ExecutionContext;
use crate::entities::{mrp_request, ProductionState, RequestId, REQUEST_MODEL};
use crate::errors::{ServiceError, ServiceResult};

use super::change_tracking::NoteLog;
use super::notifier::OutgoingMessage;
use super::production::NewProduction;
use super::references;
use super::state_machine::{transition, RequestAction};
use super::sync::RequestChanges;
use super::MrpWorkflow;

pub const OWNER_ONLY_MESSAGE: &str = "Only the assigned Product Owner can verify this request.";
pub const ADMIN_APPROVE_MESSAGE: &str =
    "Only the assigned Production Manager can approve this request.";
pub const ADMIN_REJECT_MESSAGE: &str = "Only the assigned Production Manager can reject this request.";
pub const MISSING_REASON_MESSAGE: &str =
    "Please provide a reason for the change request in the Notes tab.";

impl MrpWorkflow {
    /// Sends a request to its product owner, creating the production order when the
    /// request has none yet.
    #[instrument(skip(self, ctx))]
    pub async fn submit_to_product_owner(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
    ) -> ServiceResult<mrp_request::Model> {
        let request = self.find_request(request_id).await?;
        let target = transition(request.state, RequestAction::SubmitToProductOwner)?;

        if self.production_for_request(request.id).await?.is_none() {
            self.create_production(
                ctx,
                NewProduction {
                    name: None,
                    origin: Some(request.name.clone()),
                    product_id: request.product_id,
                    product_qty: request.qty,
                    product_uom_id: request.uom_id,
                    bom_id: request.bom_id,
                    date_start: request.start_date,
                    date_deadline: request.start_date,
                    requested_date: Some(request.requested_date),
                    expected_delivery_date: request.expected_delivery_date,
                    user_id: request.product_owner_id,
                    mrp_request_id: Some(request.id),
                },
            )
            .await?;
        }

        let submitted = self
            .write_request(ctx, request.id, RequestChanges::state(target))
            .await?;
        info!(request = %submitted.name, "Request submitted to product owner");
        Ok(submitted)
    }

    #[instrument(skip(self, ctx))]
    pub async fn accept_by_product_owner(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
    ) -> ServiceResult<mrp_request::Model> {
        let request = self.find_request(request_id).await?;
        let target = transition(request.state, RequestAction::AcceptByProductOwner)?;
        if request.product_owner_id != Some(ctx.actor()) {
            return Err(ServiceError::Forbidden(OWNER_ONLY_MESSAGE.to_string()));
        }
        self.write_request(ctx, request.id, RequestChanges::state(target))
            .await
    }

    /// Sends a request back for changes. `reason` is appended to the note; without one
    /// the note must already explain the change. The admin is notified.
    #[instrument(skip(self, ctx, reason))]
    pub async fn request_change(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
        reason: Option<&str>,
    ) -> ServiceResult<mrp_request::Model> {
        let request = self.find_request(request_id).await?;
        let target = transition(request.state, RequestAction::RequestChange)?;

        let mut notes = NoteLog::parse(request.note.as_deref());
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let explanation = match reason {
            Some(reason) => {
                notes.append(ctx.now(), reason);
                reason.to_string()
            }
            None if !notes.is_empty() => notes
                .latest()
                .map(|entry| entry.text.clone())
                .unwrap_or_default(),
            None => {
                return Err(ServiceError::PreconditionFailed(
                    MISSING_REASON_MESSAGE.to_string(),
                ))
            }
        };

        let updated = self
            .write_request(
                &ctx.suppressed(),
                request.id,
                RequestChanges {
                    state: Some(target),
                    note: Some(notes.render()),
                    ..Default::default()
                },
            )
            .await?;

        match updated.admin_id {
            Some(admin_id) => {
                let message = OutgoingMessage::note(
                    REQUEST_MODEL,
                    updated.id,
                    format!("Change requested by Product Owner: {}", explanation),
                )
                .notify(admin_id)
                .by(ctx.actor())
                .at(ctx.now());
                if let Err(e) = self.notifier.post_message(message).await {
                    warn!(request = %updated.name, "Failed to notify admin of change request: {}", e);
                }
            }
            None => warn!(request = %updated.name, "Change requested on a request without admin"),
        }
        Ok(updated)
    }

    /// Approves a request and confirms its production order when still a draft.
    #[instrument(skip(self, ctx))]
    pub async fn approve_by_admin(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
    ) -> ServiceResult<mrp_request::Model> {
        let request = self.find_request(request_id).await?;
        let target = transition(request.state, RequestAction::ApproveByAdmin)?;
        if request.admin_id != Some(ctx.actor()) {
            return Err(ServiceError::Forbidden(ADMIN_APPROVE_MESSAGE.to_string()));
        }
        if request.bom_id.is_none() {
            let product = references::product_name(&*self.db, request.product_id).await?;
            return Err(ServiceError::PreconditionFailed(format!(
                "Please select a Bill of Materials (BOM) for product {}",
                product
            )));
        }

        let approved = self
            .write_request(ctx, request.id, RequestChanges::state(target))
            .await?;

        if let Some(production) = self.production_for_request(approved.id).await? {
            if production.state == ProductionState::Draft {
                self.confirm_production(ctx, production.id).await?;
            }
        }
        info!(request = %approved.name, "Request approved");
        Ok(approved)
    }

    /// Rejects a request, deleting its production order.
    #[instrument(skip(self, ctx))]
    pub async fn reject_by_admin(
        &self,
        ctx: &ExecutionContext,
        request_id: RequestId,
    ) -> ServiceResult<mrp_request::Model> {
        let request = self.find_request(request_id).await?;
        let target = transition(request.state, RequestAction::RejectByAdmin)?;
        if request.admin_id != Some(ctx.actor()) {
            return Err(ServiceError::Forbidden(ADMIN_REJECT_MESSAGE.to_string()));
        }

        if let Some(production) = self.production_for_request(request.id).await? {
            self.delete_production(ctx, production.id).await?;
        }

        let rejected = self
            .write_request(
                ctx,
                request.id,
                RequestChanges {
                    state: Some(target),
                    mrp_production_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!(request = %rejected.name, "Request rejected");
        Ok(rejected)
    }
}
