//! Change-sets for the two write paths and the field mapping between them.
//!
//! `None` means "field not part of this write"; nullable columns use a nested
//! `Option` so a write can clear them.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;

use crate::entities::{
    mrp_production, mrp_request, BomId, ProductId, ProductionId, ProductionState, RequestId,
    RequestState, UomId, UserId,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestChanges {
    pub product_id: Option<ProductId>,
    pub qty: Option<f64>,
    pub uom_id: Option<Option<UomId>>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub requested_date: Option<DateTime<Utc>>,
    pub expected_delivery_date: Option<Option<DateTime<Utc>>>,
    pub bom_id: Option<Option<BomId>>,
    pub product_owner_id: Option<Option<UserId>>,
    pub admin_id: Option<Option<UserId>>,
    pub note: Option<Option<String>>,
    pub external_order_ref: Option<Option<String>>,
    pub state: Option<RequestState>,
    pub mrp_production_id: Option<Option<ProductionId>>,
    pub notified_po: Option<bool>,
    pub auto_submitted_po: Option<bool>,
}

impl RequestChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn state(state: RequestState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub(crate) fn apply_to(&self, model: &mut mrp_request::ActiveModel) {
        if let Some(v) = self.product_id {
            model.product_id = Set(v);
        }
        if let Some(v) = self.qty {
            model.qty = Set(v);
        }
        if let Some(v) = self.uom_id {
            model.uom_id = Set(v);
        }
        if let Some(v) = self.start_date {
            model.start_date = Set(v);
        }
        if let Some(v) = self.requested_date {
            model.requested_date = Set(v);
        }
        if let Some(v) = self.expected_delivery_date {
            model.expected_delivery_date = Set(v);
        }
        if let Some(v) = self.bom_id {
            model.bom_id = Set(v);
        }
        if let Some(v) = self.product_owner_id {
            model.product_owner_id = Set(v);
        }
        if let Some(v) = self.admin_id {
            model.admin_id = Set(v);
        }
        if let Some(v) = &self.note {
            model.note = Set(v.clone());
        }
        if let Some(v) = &self.external_order_ref {
            model.external_order_ref = Set(v.clone());
        }
        if let Some(v) = self.state {
            model.state = Set(v);
        }
        if let Some(v) = self.mrp_production_id {
            model.mrp_production_id = Set(v);
        }
        if let Some(v) = self.notified_po {
            model.notified_po = Set(v);
        }
        if let Some(v) = self.auto_submitted_po {
            model.auto_submitted_po = Set(v);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionChanges {
    pub product_id: Option<ProductId>,
    pub product_qty: Option<f64>,
    pub product_uom_id: Option<Option<UomId>>,
    pub bom_id: Option<Option<BomId>>,
    pub date_start: Option<Option<DateTime<Utc>>>,
    pub date_deadline: Option<Option<DateTime<Utc>>>,
    pub requested_date: Option<Option<DateTime<Utc>>>,
    pub expected_delivery_date: Option<Option<DateTime<Utc>>>,
    pub date_finished: Option<Option<DateTime<Utc>>>,
    pub user_id: Option<Option<UserId>>,
    pub origin: Option<Option<String>>,
    pub state: Option<ProductionState>,
    pub mrp_request_id: Option<Option<RequestId>>,
}

impl ProductionChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn state(state: ProductionState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub(crate) fn apply_to(&self, model: &mut mrp_production::ActiveModel) {
        if let Some(v) = self.product_id {
            model.product_id = Set(v);
        }
        if let Some(v) = self.product_qty {
            model.product_qty = Set(v);
        }
        if let Some(v) = self.product_uom_id {
            model.product_uom_id = Set(v);
        }
        if let Some(v) = self.bom_id {
            model.bom_id = Set(v);
        }
        if let Some(v) = self.date_start {
            model.date_start = Set(v);
        }
        if let Some(v) = self.date_deadline {
            model.date_deadline = Set(v);
        }
        if let Some(v) = self.requested_date {
            model.requested_date = Set(v);
        }
        if let Some(v) = self.expected_delivery_date {
            model.expected_delivery_date = Set(v);
        }
        if let Some(v) = self.date_finished {
            model.date_finished = Set(v);
        }
        if let Some(v) = self.user_id {
            model.user_id = Set(v);
        }
        if let Some(v) = &self.origin {
            model.origin = Set(v.clone());
        }
        if let Some(v) = self.state {
            model.state = Set(v);
        }
        if let Some(v) = self.mrp_request_id {
            model.mrp_request_id = Set(v);
        }
    }
}

/// Counterpart write for a production order after its request was written.
///
/// Values come from the stored request so the mirror matches what was persisted.
pub fn production_changes_from_request(
    changes: &RequestChanges,
    request: &mrp_request::Model,
) -> ProductionChanges {
    let mut out = ProductionChanges::default();
    if changes.start_date.is_some() {
        out.date_start = Some(request.start_date);
        out.date_deadline = Some(request.start_date);
    }
    if changes.requested_date.is_some() {
        out.requested_date = Some(Some(request.requested_date));
    }
    if changes.expected_delivery_date.is_some() {
        out.expected_delivery_date = Some(request.expected_delivery_date);
    }
    if changes.product_id.is_some() {
        out.product_id = Some(request.product_id);
    }
    if changes.bom_id.is_some() {
        out.bom_id = Some(request.bom_id);
    }
    if changes.qty.is_some() {
        out.product_qty = Some(request.qty);
    }
    if changes.uom_id.is_some() {
        out.product_uom_id = Some(request.uom_id);
    }
    out
}

/// Counterpart write for a request after its production order was written.
///
/// The request's start date follows the call's start, falling back to its deadline.
/// A cleared requested date is not mirrored; the request column is mandatory.
pub fn request_changes_from_production(
    changes: &ProductionChanges,
    production: &mrp_production::Model,
) -> RequestChanges {
    let mut out = RequestChanges::default();
    if changes.date_start.is_some() || changes.date_deadline.is_some() {
        let start = changes
            .date_start
            .flatten()
            .or(changes.date_deadline.flatten())
            .or(production.date_start)
            .or(production.date_deadline);
        out.start_date = Some(start);
    }
    if changes.requested_date.is_some() {
        out.requested_date = production.requested_date;
    }
    if changes.expected_delivery_date.is_some() {
        out.expected_delivery_date = Some(production.expected_delivery_date);
    }
    if changes.product_id.is_some() {
        out.product_id = Some(production.product_id);
    }
    if changes.bom_id.is_some() {
        out.bom_id = Some(production.bom_id);
    }
    if changes.product_qty.is_some() {
        out.qty = Some(production.product_qty);
    }
    if changes.product_uom_id.is_some() {
        out.uom_id = Some(production.product_uom_id);
    }
    out
}
