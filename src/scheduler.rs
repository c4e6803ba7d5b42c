//! Periodic driver for the workflow sweeps.

use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use strum::Display;
use tokio::signal;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::JobsConfig;
use crate::context::ExecutionContext;
use crate::errors::ServiceResult;
use crate::services::{JobReport, MrpWorkflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum JobKind {
    /// Submit aged `new` requests to their product owner
    AutoSubmit,
    /// Create review activities for product owners
    Remind,
    /// Send admins the daily pending summary
    Summary,
    /// Delete stale rejected requests
    Purge,
}

pub struct Scheduler {
    workflow: MrpWorkflow,
    config: JobsConfig,
    last_daily_run: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(workflow: MrpWorkflow, config: JobsConfig) -> Self {
        Self {
            workflow,
            config,
            last_daily_run: None,
        }
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.config.system_user_id)
    }

    pub async fn run_job(&self, kind: JobKind) -> ServiceResult<JobReport> {
        let ctx = self.context();
        let limit = self.config.batch_limit;
        let report = match kind {
            JobKind::AutoSubmit => self.workflow.auto_submit_pending(&ctx, limit).await?,
            JobKind::Remind => self.workflow.remind_product_owners(&ctx, limit).await?,
            JobKind::Summary => {
                self.workflow
                    .notify_admins_of_daily_pending(&ctx, limit)
                    .await?
            }
            JobKind::Purge => {
                self.workflow
                    .purge_old_rejected(&ctx, self.config.rejected_retention(), limit)
                    .await?
            }
        };
        info!(job = %kind, ?report, "Job finished");
        Ok(report)
    }

    /// One tick: the frequent sweeps every time, the daily ones on the first tick of a
    /// UTC day.
    pub async fn run_once(&mut self) {
        let mut jobs = vec![JobKind::AutoSubmit, JobKind::Remind];
        let today = Utc::now().date_naive();
        if self.last_daily_run != Some(today) {
            jobs.push(JobKind::Summary);
            jobs.push(JobKind::Purge);
            self.last_daily_run = Some(today);
        }
        let span = info_span!("scheduler_tick", run_id = %Uuid::new_v4());
        async {
            for kind in jobs {
                if let Err(e) = self.run_job(kind).await {
                    error!(job = %kind, "Scheduled job failed: {}", e);
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Ticks until ctrl-c.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        info!(
            tick_secs = self.config.tick_interval_secs,
            "Scheduler started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => self.run_once().await,
                _ = signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }
    }
}
