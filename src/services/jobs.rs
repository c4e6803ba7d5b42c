//! Scheduled sweeps over requests.
//!
//! Every sweep isolates per-record failures: an error is logged and counted, and the
//! batch moves on.

use chrono::{Duration, NaiveTime, TimeZone, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use crate::context::ExecutionContext;
use crate::entities::{
    mrp_production, mrp_request, RequestState, UserId, REQUEST_MODEL, USER_MODEL,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::Event;

use super::notifier::{ActivityRequest, OutgoingMessage};
use super::references;
use super::sync::RequestChanges;
use super::MrpWorkflow;

pub const DAILY_SUMMARY_HEADER: &str = "Pending Manufacturing Requests from yesterday:";

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub processed: usize,
    pub failed: usize,
    /// Records still matching the sweep after this batch
    pub remaining: u64,
}

impl JobReport {
    fn record(&mut self, job: &'static str, result: ServiceResult<()>, record: &str) {
        match result {
            Ok(()) => self.processed += 1,
            Err(e) => {
                error!(job, record, "Scheduled job failed for record: {}", e);
                self.failed += 1;
            }
        }
    }
}

impl MrpWorkflow {
    /// Submits `new` requests that have a product owner and are older than the
    /// configured delay. Each request is auto-submitted at most once.
    #[instrument(skip(self, ctx))]
    pub async fn auto_submit_pending(
        &self,
        ctx: &ExecutionContext,
        limit: u64,
    ) -> ServiceResult<JobReport> {
        let cutoff = ctx.now() - self.settings.auto_submit_delay;
        let domain = || {
            mrp_request::Entity::find()
                .filter(mrp_request::Column::State.eq(RequestState::New))
                .filter(mrp_request::Column::ProductOwnerId.is_not_null())
                .filter(mrp_request::Column::AutoSubmittedPo.eq(false))
                .filter(mrp_request::Column::CreatedAt.lte(cutoff))
        };

        let batch = self.batch(domain(), limit).await?;
        let mut report = JobReport::default();
        for request in batch {
            let result = self.auto_submit_one(ctx, &request).await;
            report.record("auto_submit", result, &request.name);
        }
        report.remaining = self.remaining(domain()).await?;

        counter!("mrp.jobs.processed", report.processed as u64, "job" => "auto_submit");
        info!(
            processed = report.processed,
            failed = report.failed,
            remaining = report.remaining,
            "Auto-submit sweep finished"
        );
        Ok(report)
    }

    async fn auto_submit_one(
        &self,
        ctx: &ExecutionContext,
        request: &mrp_request::Model,
    ) -> ServiceResult<()> {
        self.submit_to_product_owner(ctx, request.id).await?;
        self.write_request(
            &ctx.suppressed(),
            request.id,
            RequestChanges {
                auto_submitted_po: Some(true),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Creates one review activity per `pending_po` request for its product owner.
    #[instrument(skip(self, ctx))]
    pub async fn remind_product_owners(
        &self,
        ctx: &ExecutionContext,
        limit: u64,
    ) -> ServiceResult<JobReport> {
        let domain = || {
            mrp_request::Entity::find()
                .filter(mrp_request::Column::State.eq(RequestState::PendingPo))
                .filter(mrp_request::Column::ProductOwnerId.is_not_null())
                .filter(mrp_request::Column::NotifiedPo.eq(false))
        };

        let batch = self.batch(domain(), limit).await?;
        let mut report = JobReport::default();
        for request in batch {
            let result = self.remind_one(ctx, &request).await;
            report.record("remind", result, &request.name);
        }
        report.remaining = self.remaining(domain()).await?;

        counter!("mrp.jobs.processed", report.processed as u64, "job" => "remind");
        info!(
            processed = report.processed,
            failed = report.failed,
            remaining = report.remaining,
            "Product owner reminder sweep finished"
        );
        Ok(report)
    }

    async fn remind_one(
        &self,
        ctx: &ExecutionContext,
        request: &mrp_request::Model,
    ) -> ServiceResult<()> {
        let owner = request.product_owner_id.ok_or_else(|| {
            ServiceError::InternalError(format!("Request {} has no product owner", request.name))
        })?;
        self.notifier
            .schedule_activity(ActivityRequest {
                model: REQUEST_MODEL,
                res_id: request.id,
                activity_type: self.settings.reminder_activity_type.clone(),
                user_id: owner,
                summary: format!("Review Request: {}", request.name),
                note: Some(format!(
                    "You have a pending manufacturing request to review: {}",
                    request.name
                )),
                deadline: ctx.now().date_naive(),
                created_at: ctx.now(),
            })
            .await?;
        self.write_request(
            &ctx.suppressed(),
            request.id,
            RequestChanges {
                notified_po: Some(true),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Posts each admin one message listing the `pending_po` requests created since the
    /// start of yesterday (UTC). At most `limit` requests are listed per run.
    #[instrument(skip(self, ctx))]
    pub async fn notify_admins_of_daily_pending(
        &self,
        ctx: &ExecutionContext,
        limit: u64,
    ) -> ServiceResult<JobReport> {
        let yesterday = ctx.now().date_naive() - Duration::days(1);
        let since = Utc.from_utc_datetime(&yesterday.and_time(NaiveTime::default()));
        let domain = || {
            mrp_request::Entity::find()
                .filter(mrp_request::Column::State.eq(RequestState::PendingPo))
                .filter(mrp_request::Column::CreatedAt.gte(since))
                .filter(mrp_request::Column::AdminId.is_not_null())
        };

        let requests = self.batch(domain(), limit).await?;
        let listed = requests.len() as u64;

        let mut by_admin: BTreeMap<UserId, Vec<mrp_request::Model>> = BTreeMap::new();
        for request in requests {
            if let Some(admin_id) = request.admin_id {
                by_admin.entry(admin_id).or_default().push(request);
            }
        }

        let mut report = JobReport::default();
        for (admin_id, requests) in by_admin {
            let result = self.post_daily_summary(ctx, admin_id, &requests).await;
            report.record("summary", result, &format!("admin {}", admin_id));
        }
        report.remaining = self.remaining(domain()).await?.saturating_sub(listed);

        counter!("mrp.jobs.processed", report.processed as u64, "job" => "summary");
        info!(
            admins = report.processed,
            failed = report.failed,
            unlisted = report.remaining,
            "Daily pending summary sent"
        );
        Ok(report)
    }

    async fn post_daily_summary(
        &self,
        ctx: &ExecutionContext,
        admin_id: UserId,
        requests: &[mrp_request::Model],
    ) -> ServiceResult<()> {
        let mut body = format!("{}\n", DAILY_SUMMARY_HEADER);
        for request in requests {
            let product = references::product_name(&*self.db, request.product_id).await?;
            body.push_str(&format!("- {} ({})\n", request.name, product));
        }
        let message = OutgoingMessage::note(USER_MODEL, admin_id, body)
            .notify(admin_id)
            .by(ctx.actor())
            .at(ctx.now());
        self.notifier.post_message(message).await
    }

    /// Deletes up to `limit` rejected requests last modified more than `age` ago.
    #[instrument(skip(self, ctx))]
    pub async fn purge_old_rejected(
        &self,
        ctx: &ExecutionContext,
        age: Duration,
        limit: u64,
    ) -> ServiceResult<JobReport> {
        let cutoff = ctx.now() - age;
        let domain = || {
            mrp_request::Entity::find()
                .filter(mrp_request::Column::State.eq(RequestState::Rejected))
                .filter(mrp_request::Column::UpdatedAt.lt(cutoff))
        };

        let stale = self.batch(domain(), limit).await?;

        let mut report = JobReport::default();
        for request in stale {
            let name = request.name.clone();
            let result = self.purge_one(request).await;
            report.record("purge", result, &name);
        }
        report.remaining = self.remaining(domain()).await?;

        counter!("mrp.jobs.processed", report.processed as u64, "job" => "purge");
        info!(purged = report.processed, failed = report.failed, "Rejected requests purged");
        if report.processed > 0 {
            self.emit(Event::RequestsPurged(report.processed)).await;
        }
        Ok(report)
    }

    async fn purge_one(&self, request: mrp_request::Model) -> ServiceResult<()> {
        let db = &*self.db;
        mrp_production::Entity::update_many()
            .col_expr(
                mrp_production::Column::MrpRequestId,
                Expr::value(Option::<i32>::None),
            )
            .filter(mrp_production::Column::MrpRequestId.eq(request.id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        request.delete(db).await.map_err(ServiceError::db_error)?;
        Ok(())
    }

    async fn batch(
        &self,
        select: Select<mrp_request::Entity>,
        limit: u64,
    ) -> ServiceResult<Vec<mrp_request::Model>> {
        select
            .order_by_asc(mrp_request::Column::CreatedAt)
            .order_by_asc(mrp_request::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn remaining(&self, select: Select<mrp_request::Entity>) -> ServiceResult<u64> {
        select.count(&*self.db).await.map_err(ServiceError::db_error)
    }
}
